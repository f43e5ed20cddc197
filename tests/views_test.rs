use chrono::{TimeZone, Utc};
use task_manager_rs::task::{Task, TaskDraft};
use task_manager_rs::views::{by_category, partition, recent, upcoming};

fn task(id: i64, date: &str, category: &str) -> Task {
    TaskDraft::new(format!("t{}", id), date)
        .with_category(category)
        .validate()
        .unwrap()
        .with_id(id)
}

fn ids(tasks: &[Task]) -> Vec<i64> {
    tasks.iter().map(|t| t.id).collect()
}

fn sample() -> Vec<Task> {
    vec![
        task(1, "2024-06-01", "Travail"),
        task(2, "2026-01-01", "Perso"),
        task(3, "2023-01-01", "Travail"),
        task(4, "2025-02-01", "Sport"),
        task(5, "2024-12-31 23:59", "Perso"),
    ]
}

#[test]
fn test_recent_sorted_most_recent_first() {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(ids(&recent(&sample(), now)), vec![5, 1, 3]);
}

#[test]
fn test_upcoming_sorted_soonest_first() {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(ids(&upcoming(&sample(), now)), vec![4, 2]);
}

#[test]
fn test_partition_is_disjoint_and_exhaustive() {
    let tasks = sample();
    for year in [2000, 2023, 2024, 2025, 2026, 2100] {
        let now = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        let views = partition(&tasks, now);

        let mut all = ids(&views.recent);
        all.extend(ids(&views.upcoming));
        all.sort();
        assert_eq!(all, vec![1, 2, 3, 4, 5], "now = {}", now);
    }
}

#[test]
fn test_equal_dates_keep_input_order() {
    let tasks = vec![
        task(10, "2020-05-05", "a"),
        task(11, "2030-05-05", "a"),
        task(12, "2020-05-05", "a"),
        task(13, "2030-05-05", "a"),
        task(14, "2020-05-05", "a"),
    ];
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    let views = partition(&tasks, now);
    assert_eq!(ids(&views.recent), vec![10, 12, 14]);
    assert_eq!(ids(&views.upcoming), vec![11, 13]);
}

#[test]
fn test_views_can_be_recomputed_for_other_instants() {
    let tasks = sample();
    let early = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

    assert!(recent(&tasks, early).is_empty());
    assert!(upcoming(&tasks, late).is_empty());
    assert_eq!(ids(&recent(&tasks, late)), vec![2, 4, 5, 1, 3]);
}

#[test]
fn test_by_category_first_seen_order() {
    let groups = by_category(&sample());

    let names: Vec<&str> = groups.iter().map(|g| g.category.as_str()).collect();
    assert_eq!(names, vec!["Travail", "Perso", "Sport"]);
    assert_eq!(ids(&groups[0].tasks), vec![1, 3]);
    assert_eq!(ids(&groups[1].tasks), vec![2, 5]);
    assert_eq!(ids(&groups[2].tasks), vec![4]);
}
