use std::time::Duration;
use task_manager_rs::config::{BackendKind, Config};

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.storage_backend, BackendKind::Auto);
    assert_eq!(config.database_path, "tasks.db");
    assert!(config.enable_mirror);
    assert_eq!(config.tracking_interval_ms, 5000);
    assert_eq!(config.tracking_fastest_interval_ms, 2000);
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.notification_interval_secs = 0;
    assert!(config.validate().is_err());

    let config = Config {
        kv_path: "  ".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_tracking_options() {
    let config = Config {
        tracking_interval_ms: 1000,
        ..Config::default()
    };
    let options = config.tracking_options();

    assert_eq!(options.interval, Duration::from_secs(1));
    assert_eq!(options.effective_interval(), Duration::from_secs(2));
    assert_eq!(options.notification_interval, Duration::from_secs(60));
}
