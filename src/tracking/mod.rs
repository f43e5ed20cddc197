//! Geolocation watch with periodic tracking notifications
//!
//! The position provider and the notification service are platform
//! collaborators, injected through [`PositionSource`] and [`Notifier`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Notification channel registered before tracking starts
pub const DEFAULT_CHANNEL: &str = "default";

/// Outcome of a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// A single position fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters
    pub accuracy: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// Fix at `latitude`/`longitude` taken now
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            altitude: None,
            heading: None,
            speed: None,
            timestamp: Utc::now(),
        }
    }
}

/// A local notification to display immediately
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Whole minutes since tracking started
    pub minutes_elapsed: Option<u64>,
    /// Latest known position at dispatch time
    pub position: Option<Position>,
}

/// Device geolocation provider
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Ask the user for location access
    async fn request_permission(&self) -> crate::Result<PermissionStatus>;

    /// Fetch one position fix
    async fn current_position(&self, high_accuracy: bool) -> crate::Result<Position>;
}

/// Local notification service
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the user for permission to show notifications
    async fn request_permission(&self) -> crate::Result<PermissionStatus>;

    /// Register a notification channel; platforms without channels ignore it
    async fn register_channel(&self, _channel: &str) -> crate::Result<()> {
        Ok(())
    }

    /// Show `notification` now
    async fn notify(&self, notification: Notification) -> crate::Result<()>;
}

/// Watch timing
#[derive(Debug, Clone)]
pub struct TrackingOptions {
    /// Preferred delay between fixes
    pub interval: Duration,
    /// Fixes are never requested more often than this
    pub fastest_interval: Duration,
    /// Delay between elapsed-time notifications
    pub notification_interval: Duration,
    pub high_accuracy: bool,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            fastest_interval: Duration::from_secs(2),
            notification_interval: Duration::from_secs(60),
            high_accuracy: true,
        }
    }
}

impl TrackingOptions {
    /// Delay actually used between position requests
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(self.fastest_interval)
    }
}

/// Notification sent once when tracking starts
pub fn started_notification() -> Notification {
    Notification {
        title: "Tracking commencé".to_string(),
        body: "Le suivi de votre position est lancé.".to_string(),
        minutes_elapsed: None,
        position: None,
    }
}

/// Periodic notification with elapsed time and last known position
pub fn elapsed_notification(minutes: u64, latest: Option<&Position>) -> Notification {
    let title = match minutes {
        0 => "Tracking démarré".to_string(),
        1 => "Tracking actif depuis 1 minute".to_string(),
        n => format!("Tracking actif depuis {} minutes", n),
    };
    let body = match latest {
        Some(p) => format!("Position : Lat {:.5}, Lon {:.5}", p.latitude, p.longitude),
        None => "Position non disponible".to_string(),
    };

    Notification {
        title,
        body,
        minutes_elapsed: Some(minutes),
        position: latest.cloned(),
    }
}

#[derive(Default)]
struct TrackingState {
    history: Vec<Position>,
    last_error: Option<String>,
}

/// Streams position fixes into a history and sends tracking notifications
pub struct LocationTracker {
    source: Arc<dyn PositionSource>,
    notifier: Arc<dyn Notifier>,
    options: TrackingOptions,
    state: Arc<RwLock<TrackingState>>,
    started_at: Option<DateTime<Utc>>,
    handles: Vec<JoinHandle<()>>,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl LocationTracker {
    /// Create a stopped tracker
    pub fn new(
        source: Arc<dyn PositionSource>,
        notifier: Arc<dyn Notifier>,
        options: TrackingOptions,
    ) -> Self {
        Self {
            source,
            notifier,
            options,
            state: Arc::new(RwLock::new(TrackingState::default())),
            started_at: None,
            handles: Vec::new(),
            shutdown_tx: None,
        }
    }

    /// Request permissions and start the watch and notification loops
    pub async fn start(&mut self) -> crate::Result<()> {
        if self.is_running() {
            return Err(crate::TaskManagerError::TrackingError(
                "Tracking already running".to_string(),
            ));
        }

        if self.source.request_permission().await? == PermissionStatus::Denied {
            let message = "Location access refused; enable it in the system settings".to_string();
            self.state.write().await.last_error = Some(message.clone());
            return Err(crate::TaskManagerError::PermissionDenied(message));
        }

        match self.notifier.request_permission().await {
            Ok(PermissionStatus::Granted) => {
                if let Err(e) = self.notifier.register_channel(DEFAULT_CHANNEL).await {
                    warn!("Failed to register notification channel: {}", e);
                }
            }
            Ok(PermissionStatus::Denied) => warn!("Notifications are not allowed"),
            Err(e) => warn!("Notification permission request failed: {}", e),
        }

        {
            let mut state = self.state.write().await;
            state.history.clear();
            state.last_error = None;
        }

        let started_at = Utc::now();
        self.started_at = Some(started_at);
        if let Err(e) = self.notifier.notify(started_notification()).await {
            warn!("Failed to send tracking notification: {}", e);
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        self.handles.push(tokio::spawn(watch_loop(
            Arc::clone(&self.source),
            Arc::clone(&self.state),
            self.options.clone(),
            shutdown_tx.subscribe(),
        )));
        self.handles.push(tokio::spawn(notification_loop(
            Arc::clone(&self.notifier),
            Arc::clone(&self.state),
            self.options.notification_interval,
            started_at,
            shutdown_tx.subscribe(),
        )));
        self.shutdown_tx = Some(shutdown_tx);

        info!(
            "Location tracking started (every {:?})",
            self.options.effective_interval()
        );
        Ok(())
    }

    /// Stop both loops and discard the collected history
    pub async fn stop(&mut self, timeout_duration: Duration) -> crate::Result<()> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        let handles: Vec<JoinHandle<()>> = self.handles.drain(..).collect();
        let joined = timeout(timeout_duration, async {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!("Tracking loop panicked: {}", e);
                }
            }
        })
        .await;

        self.started_at = None;
        {
            let mut state = self.state.write().await;
            state.history.clear();
            state.last_error = None;
        }

        match joined {
            Ok(()) => {
                info!("Location tracking stopped");
                Ok(())
            }
            Err(_) => Err(crate::TaskManagerError::TrackingError(
                "Shutdown timeout exceeded".to_string(),
            )),
        }
    }

    /// Whether the loops are running
    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    /// When the current session started
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Positions collected since `start`
    pub async fn history(&self) -> Vec<Position> {
        self.state.read().await.history.clone()
    }

    /// Most recent position
    pub async fn latest(&self) -> Option<Position> {
        self.state.read().await.history.last().cloned()
    }

    /// Last provider error, cleared by the next successful fix
    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }
}

async fn watch_loop(
    source: Arc<dyn PositionSource>,
    state: Arc<RwLock<TrackingState>>,
    options: TrackingOptions,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval(options.effective_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                match source.current_position(options.high_accuracy).await {
                    Ok(position) => {
                        debug!("Position fix {:.5}, {:.5}", position.latitude, position.longitude);
                        let mut state = state.write().await;
                        state.history.push(position);
                        state.last_error = None;
                    }
                    Err(e) => {
                        warn!("Position update failed: {}", e);
                        state.write().await.last_error = Some(e.to_string());
                    }
                }
            }
        }
    }
}

async fn notification_loop(
    notifier: Arc<dyn Notifier>,
    state: Arc<RwLock<TrackingState>>,
    every: Duration,
    started_at: DateTime<Utc>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                let minutes = (Utc::now() - started_at).num_minutes().max(0) as u64;
                let latest = state.read().await.history.last().cloned();
                let notification = elapsed_notification(minutes, latest.as_ref());

                if let Err(e) = notifier.notify(notification).await {
                    warn!("Failed to send tracking notification: {}", e);
                }
            }
        }
    }
}
