//! Task Manager RS binary entry point

use chrono::Utc;
use clap::{Parser, Subcommand};
use task_manager_rs::{config::Config, storage, GeoPoint, Task, TaskDraft, TaskManager};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "task-manager", about = "Record and review tasks stored on this device")]
struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct TaskFields {
    /// Task title
    #[arg(short, long)]
    title: String,

    /// Date, e.g. 2025-03-05 or 2025-03-05 14:30
    #[arg(short, long)]
    date: String,

    /// Location as lng,lat
    #[arg(short, long)]
    location: Option<GeoPoint>,

    /// Distance annotation
    #[arg(long)]
    distance: Option<String>,

    /// Category (defaults to Travail)
    #[arg(long)]
    category: Option<String>,
}

impl From<TaskFields> for TaskDraft {
    fn from(fields: TaskFields) -> Self {
        TaskDraft {
            title: fields.title,
            date: fields.date,
            location: fields.location,
            distance: fields.distance,
            category: fields.category,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Add a task
    Add(TaskFields),
    /// Replace every field of a task
    Edit {
        id: i64,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Delete a task
    Remove { id: i64 },
    /// List all tasks, optionally in one category
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Show recent and upcoming tasks
    Views,
    /// Show tasks grouped by category
    Categories,
    /// Delete every task and reset identifiers
    Clear,
}

fn print_task(task: &Task) {
    let location = task
        .location
        .map(|p| format!(" @ {}", p))
        .unwrap_or_default();
    let distance = task
        .distance
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default();
    println!(
        "{:>4}  {:<20} {:<30} [{}]{}{}",
        task.id, task.date, task.title, task.category, location, distance
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    config.validate()?;

    let backend = storage::open_backend(&config).await?;
    let mut manager = TaskManager::new(backend);
    manager.open().await?;
    info!(
        "Using {} storage with {} tasks",
        manager.backend_name(),
        manager.tasks().len()
    );

    match cli.command {
        Command::Add(fields) => {
            let task = manager.add(&fields.into()).await?;
            print_task(&task);
        }
        Command::Edit { id, fields } => {
            if manager.get(id).is_none() {
                return Err(format!("No task with id {}", id).into());
            }
            manager.edit(id, &fields.into()).await?;
            if let Some(task) = manager.get(id) {
                print_task(task);
            }
        }
        Command::Remove { id } => {
            manager.remove(id).await?;
            println!("Removed task {}", id);
        }
        Command::List { category } => {
            let tasks = match category {
                Some(category) => manager.in_category(&category),
                None => manager.tasks().to_vec(),
            };
            tasks.iter().for_each(print_task);
        }
        Command::Views => {
            let views = manager.views(Utc::now());
            println!("Tâches récentes");
            views.recent.iter().for_each(print_task);
            println!("Tâches à venir");
            views.upcoming.iter().for_each(print_task);
        }
        Command::Categories => {
            for group in manager.by_category() {
                println!("{} ({})", group.category, group.tasks.len());
                group.tasks.iter().for_each(print_task);
            }
        }
        Command::Clear => {
            manager.clear().await?;
            println!("All tasks deleted");
        }
    }

    manager.close().await;
    Ok(())
}
