use task_manager_rs::TaskManagerError;

#[test]
fn test_error_types() {
    let err = TaskManagerError::StorageWrite("disk full".to_string());
    assert_eq!(err.to_string(), "Storage write failed: disk full");

    let err = TaskManagerError::PermissionDenied("location".to_string());
    assert_eq!(err.to_string(), "Permission denied: location");
}

#[test]
fn test_serde_errors_convert() {
    let parse: Result<Vec<i64>, _> = serde_json::from_str("[1,");
    let err: TaskManagerError = parse.unwrap_err().into();
    assert!(matches!(err, TaskManagerError::SerializationError(_)));
}
