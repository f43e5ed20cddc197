use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the storage backend
pub type TaskId = i64;

/// Category applied when the user leaves it blank
pub const DEFAULT_CATEGORY: &str = "Travail";

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// A longitude/latitude pair, as posted back by the map view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees
    #[serde(rename = "lng")]
    pub longitude: f64,

    /// Latitude in degrees
    #[serde(rename = "lat")]
    pub latitude: f64,
}

impl GeoPoint {
    /// Create a new point
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Check that both coordinates are finite and within range
    pub fn validate(&self) -> crate::Result<()> {
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(crate::TaskManagerError::Validation(format!(
                "Longitude out of range: {}",
                self.longitude
            )));
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(crate::TaskManagerError::Validation(format!(
                "Latitude out of range: {}",
                self.latitude
            )));
        }
        Ok(())
    }

    /// Encode as the JSON text stored in the `location` column
    pub fn encode(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.longitude, self.latitude)
    }
}

impl FromStr for GeoPoint {
    type Err = crate::TaskManagerError;

    /// Accepts either `{"lng":..,"lat":..}` or `lng,lat`; coordinates are range-checked
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('{') {
            let point: Self = serde_json::from_str(s).map_err(|e| {
                crate::TaskManagerError::Validation(format!("Invalid location '{}': {}", s, e))
            })?;
            point.validate()?;
            return Ok(point);
        }

        let (lng, lat) = s.split_once(',').ok_or_else(|| {
            crate::TaskManagerError::Validation(format!("Invalid location '{}', expected lng,lat", s))
        })?;
        let parse = |v: &str| {
            v.trim().parse::<f64>().map_err(|e| {
                crate::TaskManagerError::Validation(format!("Invalid coordinate '{}': {}", v, e))
            })
        };
        let point = Self::new(parse(lng)?, parse(lat)?);
        point.validate()?;
        Ok(point)
    }
}

/// Parse a task date into an instant
///
/// A bare calendar date is read as midnight UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A stored task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Backend-assigned identifier
    pub id: TaskId,

    /// Task label
    #[serde(rename = "task")]
    pub title: String,

    /// Completion or due date, as entered
    pub date: String,

    /// Optional coordinates picked on the map
    #[serde(default)]
    pub location: Option<GeoPoint>,

    /// Free-form distance annotation
    #[serde(default)]
    pub distance: Option<String>,

    /// Task category
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Task {
    /// Instant represented by `date`, if it parses
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        parse_date(&self.date)
    }

    /// Whether the task belongs to the recent (past) view relative to `now`
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.instant().map_or(true, |at| at <= now)
    }

    /// Replace every mutable field with the ones from `fields`
    pub fn apply(&mut self, fields: &NewTask) {
        self.title = fields.title.clone();
        self.date = fields.date.clone();
        self.location = fields.location;
        self.distance = fields.distance.clone();
        self.category = fields.category.clone();
    }
}

/// A validated task that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    /// Task label, trimmed and non-empty
    pub title: String,
    /// Date text, guaranteed to parse
    pub date: String,
    /// Optional coordinates
    pub location: Option<GeoPoint>,
    /// Optional distance annotation
    pub distance: Option<String>,
    /// Category with the default applied
    pub category: String,
}

impl NewTask {
    /// Attach the identifier assigned by the backend
    pub fn with_id(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            date: self.date,
            location: self.location,
            distance: self.distance,
            category: self.category,
        }
    }
}

/// Raw user input for a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub distance: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl TaskDraft {
    /// Create a draft with the two required fields
    pub fn new(title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: date.into(),
            ..Default::default()
        }
    }

    /// Set the location (chainable)
    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the distance annotation (chainable)
    pub fn with_distance(mut self, distance: impl Into<String>) -> Self {
        self.distance = Some(distance.into());
        self
    }

    /// Set the category (chainable)
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Validate this draft
    pub fn validate(&self) -> crate::Result<NewTask> {
        validate(self)
    }
}

/// Check a candidate task and normalize it for storage
pub fn validate(candidate: &TaskDraft) -> crate::Result<NewTask> {
    let title = candidate.title.trim();
    if title.is_empty() {
        return Err(crate::TaskManagerError::Validation(
            "Title is required".to_string(),
        ));
    }

    let date = candidate.date.trim();
    if date.is_empty() {
        return Err(crate::TaskManagerError::Validation(
            "Date is required".to_string(),
        ));
    }
    if parse_date(date).is_none() {
        return Err(crate::TaskManagerError::Validation(format!(
            "Unrecognized date: {}",
            date
        )));
    }

    if let Some(location) = &candidate.location {
        location.validate()?;
    }

    Ok(NewTask {
        title: title.to_string(),
        date: date.to_string(),
        location: candidate.location,
        distance: non_blank(candidate.distance.as_deref()),
        category: non_blank(candidate.category.as_deref()).unwrap_or_else(default_category),
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_plain_date_is_midnight_utc() {
        let parsed = parse_date("2020-01-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_variants() {
        assert!(parse_date("2025-03-05 14:30").is_some());
        assert!(parse_date("2025-03-05T14:30:00").is_some());
        assert!(parse_date("2025-03-05T14:30:00+02:00").is_some());
        assert!(parse_date("demain").is_none());
        assert!(parse_date("   ").is_none());
    }

    #[test]
    fn test_geo_point_from_str() {
        let p: GeoPoint = "2.3522, 48.8566".parse().unwrap();
        assert_eq!(p, GeoPoint::new(2.3522, 48.8566));

        let p: GeoPoint = r#"{"lng":-74.5,"lat":40.0}"#.parse().unwrap();
        assert_eq!(p, GeoPoint::new(-74.5, 40.0));

        assert!("nowhere".parse::<GeoPoint>().is_err());
    }

    #[test]
    fn test_geo_point_from_str_rejects_bad_input_as_validation() {
        for input in [
            r#"{"lng":999,"lat":0}"#,
            r#"{"lng":0,"lat":-91}"#,
            r#"{"lng":"est"}"#,
            "999,0",
            "0, 95.5",
        ] {
            let err = input.parse::<GeoPoint>().unwrap_err();
            assert!(
                matches!(err, crate::TaskManagerError::Validation(_)),
                "{}: {:?}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_unparseable_stored_date_counts_as_past() {
        let task = Task {
            id: 1,
            title: "legacy".into(),
            date: "bientôt".into(),
            location: None,
            distance: None,
            category: DEFAULT_CATEGORY.into(),
        };
        assert!(task.is_past(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()));
    }
}
