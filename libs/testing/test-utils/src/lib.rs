//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for the domain crates:
//! - `TestDataBuilder`: Deterministic event payload generation
//! - `assertions`: Custom assertion helpers
//!
//! # Usage
//!
//! ```rust
//! use test_utils::TestDataBuilder;
//!
//! let builder = TestDataBuilder::from_test_name("my_test");
//!
//! let user = builder.user_id(1);
//! let payload = builder.event(0, &user, "2024-03-01T10:00:00Z");
//! assert_eq!(payload["user_id"], user.as_str());
//! ```

use chrono::{NaiveDate, NaiveTime};
use serde_json::{Value, json};
use uuid::Uuid;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by deriving every id from a seed.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// This is the recommended way to create a builder for consistent test data.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_ingest_batch");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Deterministic event id; distinct `n` give distinct ids
    pub fn event_id(&self, n: u64) -> Uuid {
        Uuid::from_u64_pair(self.seed, n)
    }

    /// Deterministic user id
    pub fn user_id(&self, n: u64) -> String {
        format!("user-{}-{}", self.seed % 100_000, n)
    }

    /// Generate a unique name for testing
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("my_test");
    /// let name = builder.name("events", "log");
    /// assert!(name.starts_with("test-events-"));
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// A well-formed raw event payload
    pub fn event(&self, n: u64, user_id: &str, occurred_at: &str) -> Value {
        json!({
            "event_id": self.event_id(n).to_string(),
            "occurred_at": occurred_at,
            "user_id": user_id,
            "event_type": "page_view",
            "properties": { "seq": n },
        })
    }

    /// `count` payloads for distinct users on one day
    pub fn distinct_users_on(&self, day: NaiveDate, count: u64) -> Vec<Value> {
        (0..count)
            .map(|n| {
                let at = day.and_time(noon()).and_utc().to_rfc3339();
                self.event(n, &self.user_id(n), &at)
            })
            .collect()
    }
}

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Parse a `YYYY-MM-DD` literal in tests
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|e| panic!("invalid test date {}: {}", s, e))
}

/// Test assertion helpers
pub mod assertions {
    use serde_json::Value;

    /// Assert the `date`/`count` pairs of a DAU response body
    pub fn assert_dau_counts(body: &Value, expected: &[(&str, u64)]) {
        let points = body
            .as_array()
            .unwrap_or_else(|| panic!("expected a JSON array, got {}", body));
        let actual: Vec<(String, u64)> = points
            .iter()
            .map(|p| {
                (
                    p["date"].as_str().unwrap_or_default().to_string(),
                    p["count"].as_u64().unwrap_or(u64::MAX),
                )
            })
            .collect();
        let expected: Vec<(String, u64)> = expected
            .iter()
            .map(|(d, c)| (d.to_string(), *c))
            .collect();
        assert_eq!(actual, expected, "DAU series mismatch");
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
