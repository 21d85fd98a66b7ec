//! Raw payload → [`EventRecord`].
//!
//! The transport never coerces types: a number where a string is expected is
//! a [`ValidationError`], not a best-effort conversion.

use crate::models::EventRecord;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Naive timestamp layouts accepted as UTC
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("event must be a JSON object")]
    NotAnObject,

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("event_id is not a valid UUID: {0}")]
    InvalidEventId(String),

    #[error("occurred_at is not a valid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl ValidationError {
    /// Name of the offending field, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::NotAnObject => None,
            Self::Missing(f) | Self::Empty(f) => Some(f),
            Self::WrongType { field, .. } => Some(field),
            Self::InvalidEventId(_) => Some("event_id"),
            Self::InvalidTimestamp(_) => Some("occurred_at"),
        }
    }
}

/// Validate and canonicalize one raw event.
pub fn normalize(raw: &Value) -> Result<EventRecord, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let event_id = parse_event_id(required_str(obj, "event_id")?)?;
    let occurred_at = parse_timestamp(required_str(obj, "occurred_at")?)?;
    let user_id = non_empty(obj, "user_id")?;
    let event_type = non_empty(obj, "event_type")?;
    let properties = match obj.get("properties") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(ValidationError::WrongType {
                field: "properties",
                expected: "JSON object",
            });
        }
    };

    Ok(EventRecord {
        event_id,
        occurred_at,
        user_id,
        event_type,
        properties,
    })
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::Missing(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ValidationError::WrongType {
            field,
            expected: "string",
        }),
    }
}

fn non_empty(obj: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = required_str(obj, field)?.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(trimmed.to_string())
}

fn parse_event_id(raw: &str) -> Result<Uuid, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("event_id"));
    }
    // Uuid's Display is lowercase hyphenated, which is the canonical form.
    Uuid::parse_str(trimmed).map_err(|_| ValidationError::InvalidEventId(raw.to_string()))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("occurred_at"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::InvalidTimestamp(raw.to_string()))
}
