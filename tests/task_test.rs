use task_manager_rs::task::{validate, GeoPoint, TaskDraft, DEFAULT_CATEGORY};
use task_manager_rs::TaskManagerError;

#[test]
fn test_validate_applies_defaults() {
    let task = validate(&TaskDraft::new("  Réunion  ", "2020-01-01")).unwrap();

    assert_eq!(task.title, "Réunion");
    assert_eq!(task.date, "2020-01-01");
    assert_eq!(task.category, DEFAULT_CATEGORY);
    assert!(task.location.is_none());
    assert!(task.distance.is_none());
}

#[test]
fn test_validate_keeps_optional_fields() {
    let draft = TaskDraft::new("Courses", "2025-03-05 18:00")
        .with_location(GeoPoint::new(2.35, 48.85))
        .with_distance("12")
        .with_category("Maison");
    let task = draft.validate().unwrap();

    assert_eq!(task.location, Some(GeoPoint::new(2.35, 48.85)));
    assert_eq!(task.distance.as_deref(), Some("12"));
    assert_eq!(task.category, "Maison");
}

#[test]
fn test_blank_optional_fields_count_as_unset() {
    let task = TaskDraft::new("Courses", "2025-03-05")
        .with_distance("  ")
        .with_category("")
        .validate()
        .unwrap();

    assert!(task.distance.is_none());
    assert_eq!(task.category, DEFAULT_CATEGORY);
}

#[test]
fn test_missing_title_or_date_rejected() {
    assert!(matches!(
        validate(&TaskDraft::new("   ", "2020-01-01")),
        Err(TaskManagerError::Validation(_))
    ));
    assert!(matches!(
        validate(&TaskDraft::new("Réunion", "")),
        Err(TaskManagerError::Validation(_))
    ));
    assert!(matches!(
        validate(&TaskDraft::new("Réunion", "Vendredi")),
        Err(TaskManagerError::Validation(_))
    ));
}

#[test]
fn test_out_of_range_location_rejected() {
    let draft = TaskDraft::new("Ailleurs", "2020-01-01").with_location(GeoPoint::new(200.0, 10.0));
    assert!(draft.validate().is_err());

    let draft = TaskDraft::new("Ailleurs", "2020-01-01").with_location(GeoPoint::new(10.0, -91.0));
    assert!(draft.validate().is_err());
}

#[test]
fn test_task_json_uses_storage_field_names() {
    let task = TaskDraft::new("Réunion", "2020-01-01")
        .with_location(GeoPoint::new(-74.5, 40.0))
        .validate()
        .unwrap()
        .with_id(7);

    let json = serde_json::to_value(&task).unwrap();
    assert_eq!(json["id"], 7);
    assert_eq!(json["task"], "Réunion");
    assert_eq!(json["location"]["lng"], -74.5);
    assert_eq!(json["location"]["lat"], 40.0);
    assert_eq!(json["category"], "Travail");
}
