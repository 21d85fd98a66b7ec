//! Event domain error types

use crate::models::IngestItemResult;
use crate::normalizer::ValidationError;
use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use chrono::NaiveDate;
use ingest_buffer::BufferError;
use serde_json::json;
use thiserror::Error;

/// Result type for event operations
pub type Result<T> = std::result::Result<T, EventError>;

/// The aggregation engine could not durably apply a batch.
///
/// Nothing from the batch was applied; retrying is safe.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("event log I/O error: {0}")]
    LogIo(#[from] std::io::Error),

    #[error("event log serialization error: {0}")]
    LogSerialization(#[from] serde_json::Error),

    #[error("event log unavailable: {0}")]
    LogUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("end_date {end} is before start_date {start}")]
pub struct InvalidRangeError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Event domain errors
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("All {} events were rejected", .0.len())]
    AllRejected(Vec<IngestItemResult>),

    #[error("{field} is not a valid YYYY-MM-DD date: {value}")]
    InvalidDate { field: &'static str, value: String },

    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),

    #[error("Date range of {days} days exceeds the maximum of {max}")]
    RangeTooLong { days: i64, max: u32 },

    #[error("Ingestion buffer full: requested {requested}, available {available}")]
    BufferFull { requested: usize, available: usize },

    #[error("Service is shutting down")]
    ShuttingDown,

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BufferError> for EventError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Full {
                requested,
                available,
            } => Self::BufferFull {
                requested,
                available,
            },
            BufferError::Closed => Self::ShuttingDown,
            other => Self::Internal(other.to_string()),
        }
    }
}

// Convert to axum_helpers::AppError for HTTP responses
impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::Validation(e) => AppError::Validation {
                details: e.field().map(|field| json!({ "field": field })),
                message: e.to_string(),
            },
            EventError::MalformedBody(message) => AppError::Validation {
                message,
                details: None,
            },
            EventError::AllRejected(items) => AppError::Validation {
                message: format!("All {} events were rejected", items.len()),
                details: serde_json::to_value(&items).ok(),
            },
            e @ EventError::InvalidDate { .. } => AppError::Validation {
                message: e.to_string(),
                details: None,
            },
            e @ (EventError::InvalidRange(_) | EventError::RangeTooLong { .. }) => {
                AppError::InvalidRange(e.to_string())
            }
            EventError::BufferFull {
                requested,
                available,
            } => AppError::TooManyRequests {
                message: format!(
                    "Ingestion buffer is full: {} events submitted, {} slots available",
                    requested, available
                ),
                details: Some(json!({ "requested": requested, "available": available })),
            },
            EventError::ShuttingDown => {
                AppError::ServiceUnavailable("Service is shutting down".to_string())
            }
            EventError::Ingest(e) => AppError::IngestFailed(e.to_string()),
            EventError::Internal(message) => AppError::InternalServerError(message),
        }
    }
}

impl IntoResponse for EventError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
