//! DAU query coordinator

use crate::engine::AggregationEngine;
use crate::error::{EventError, Result};
use crate::models::DauPoint;
use crate::presence::{ExactPresence, PresenceSet};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::instrument;

pub const DEFAULT_MAX_RANGE_DAYS: u32 = 366;

/// Translates `YYYY-MM-DD` range requests into engine lookups.
pub struct QueryCoordinator<S: PresenceSet = ExactPresence> {
    engine: Arc<AggregationEngine<S>>,
    max_range_days: u32,
}

impl<S: PresenceSet> QueryCoordinator<S> {
    pub fn new(engine: Arc<AggregationEngine<S>>) -> Self {
        Self {
            engine,
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
        }
    }

    pub fn with_max_range_days(mut self, days: u32) -> Self {
        self.max_range_days = days.max(1);
        self
    }

    #[instrument(skip(self))]
    pub fn get_dau(&self, start_date: &str, end_date: Option<&str>) -> Result<Vec<DauPoint>> {
        let start = parse_date("start_date", start_date)?;
        let end = end_date.map(|d| parse_date("end_date", d)).transpose()?;

        if let Some(end) = end {
            let days = (end - start).num_days() + 1;
            if days > i64::from(self.max_range_days) {
                return Err(EventError::RangeTooLong {
                    days,
                    max: self.max_range_days,
                });
            }
        }

        Ok(self.engine.query_dau(start, end)?)
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| EventError::InvalidDate {
        field,
        value: value.to_string(),
    })
}
