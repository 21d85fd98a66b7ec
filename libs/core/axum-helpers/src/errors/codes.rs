//! Type-safe error codes for API responses.
//!
//! Each code carries a client-facing identifier, an integer for logs and
//! dashboards, and a default message.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::BufferFull;
//! assert_eq!(code.as_str(), "BUFFER_FULL");
//! assert_eq!(code.code(), 1005);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standardized error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    /// Request payload failed validation
    ValidationError,

    /// Request body could not be extracted as JSON
    JsonExtraction,

    /// Query range or date parameters are invalid
    InvalidRange,

    /// Requested resource was not found
    NotFound,

    /// Ingestion capacity is exhausted; retry later
    BufferFull,

    // Server errors (1500-1999)
    /// An unexpected internal server error occurred
    InternalError,

    /// Service is shutting down or otherwise unavailable
    ServiceUnavailable,

    // Ingestion pipeline errors (2000-2999)
    /// The aggregation engine could not apply a batch
    IngestFailed,

    // I/O errors (4000s)
    IoError,

    // JSON errors (5000s)
    SerdeJsonError,
}

impl ErrorCode {
    /// SCREAMING_SNAKE_CASE identifier for clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::JsonExtraction => "JSON_EXTRACTION",
            Self::InvalidRange => "INVALID_RANGE",
            Self::NotFound => "NOT_FOUND",
            Self::BufferFull => "BUFFER_FULL",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::IngestFailed => "INGEST_FAILED",
            Self::IoError => "IO_ERROR",
            Self::SerdeJsonError => "SERDE_JSON_ERROR",
        }
    }

    /// Integer code used in structured logs.
    ///
    /// - 1000-1499: client errors
    /// - 1500-1999: server errors
    /// - 2000-2999: ingestion pipeline errors
    /// - 4000-4999: I/O errors
    /// - 5000-5999: serialization errors
    pub fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::JsonExtraction => 1002,
            Self::InvalidRange => 1003,
            Self::NotFound => 1004,
            Self::BufferFull => 1005,
            Self::InternalError => 1500,
            Self::ServiceUnavailable => 1503,
            Self::IngestFailed => 2001,
            Self::IoError => 4001,
            Self::SerdeJsonError => 5001,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::JsonExtraction => "Failed to parse request body",
            Self::InvalidRange => "Invalid date range",
            Self::NotFound => "Resource not found",
            Self::BufferFull => "Ingestion buffer is full, retry later",
            Self::InternalError => "An internal server error occurred",
            Self::ServiceUnavailable => "Service is temporarily unavailable",
            Self::IngestFailed => "Failed to apply events",
            Self::IoError => "I/O error occurred",
            Self::SerdeJsonError => "JSON serialization error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
