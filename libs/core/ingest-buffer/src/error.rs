//! Buffer error types and error categorization
//!
//! Sink errors are categorized to determine retry behavior:
//! - **Transient**: Temporary failures, retry with exponential backoff
//! - **Permanent**: Unrecoverable errors, dead-letter immediately

use std::time::Duration;
use thiserror::Error;

/// Category of error for determining retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure - retry with exponential backoff
    Transient,
    /// Unrecoverable error - dead-letter immediately
    Permanent,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
        }
    }

    /// Whether a failure in this category is worth another attempt
    pub fn should_retry(&self) -> bool {
        *self == ErrorCategory::Transient
    }

    /// Exponential backoff for the given retry number: `base * 2^retry`, capped at `max`
    pub fn backoff_delay(&self, base: Duration, max: Duration, retry_count: u32) -> Duration {
        if *self == ErrorCategory::Permanent {
            return Duration::ZERO;
        }

        let factor = 2u32.saturating_pow(retry_count);
        base.saturating_mul(factor).min(max)
    }
}

/// Buffer and delivery errors
#[derive(Error, Debug)]
pub enum BufferError {
    /// Not enough free slots for the whole batch; nothing was admitted
    #[error("Buffer full: requested {requested}, available {available}")]
    Full { requested: usize, available: usize },

    /// Buffer no longer admits items
    #[error("Buffer is closed")]
    Closed,

    /// The downstream sink rejected a batch
    #[error("Sink error: {message}")]
    Sink {
        message: String,
        category: ErrorCategory,
    },

    /// Dead-letter entry does not exist
    #[error("Dead-letter entry not found: {0}")]
    NotFound(String),
}

impl BufferError {
    /// Create a transient sink error
    pub fn transient(message: impl Into<String>) -> Self {
        BufferError::Sink {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// Create a permanent sink error
    pub fn permanent(message: impl Into<String>) -> Self {
        BufferError::Sink {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            BufferError::Full { .. } => ErrorCategory::Transient,
            BufferError::Closed => ErrorCategory::Permanent,
            BufferError::Sink { category, .. } => *category,
            BufferError::NotFound(_) => ErrorCategory::Permanent,
        }
    }

    /// Check if this error should trigger another attempt
    pub fn should_retry(&self, attempt: u32, max_attempts: u32) -> bool {
        self.category().should_retry() && attempt < max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(5_000);

        // 100ms, 200ms, 400ms, ... capped at 5s
        assert_eq!(
            ErrorCategory::Transient.backoff_delay(base, max, 0),
            Duration::from_millis(100)
        );
        assert_eq!(
            ErrorCategory::Transient.backoff_delay(base, max, 1),
            Duration::from_millis(200)
        );
        assert_eq!(
            ErrorCategory::Transient.backoff_delay(base, max, 2),
            Duration::from_millis(400)
        );
        assert_eq!(ErrorCategory::Transient.backoff_delay(base, max, 10), max);
        assert_eq!(ErrorCategory::Transient.backoff_delay(base, max, 64), max);

        assert_eq!(
            ErrorCategory::Permanent.backoff_delay(base, max, 0),
            Duration::ZERO
        );
    }

    #[test]
    fn test_should_retry() {
        let transient = BufferError::transient("disk busy");
        assert!(transient.should_retry(1, 3));
        assert!(transient.should_retry(2, 3));
        assert!(!transient.should_retry(3, 3));

        let permanent = BufferError::permanent("corrupt batch");
        assert!(!permanent.should_retry(1, 3));
    }

    #[test]
    fn test_full_error_message() {
        let err = BufferError::Full {
            requested: 10,
            available: 3,
        };
        assert_eq!(err.to_string(), "Buffer full: requested 10, available 3");
    }
}
