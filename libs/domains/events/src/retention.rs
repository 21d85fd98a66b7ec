//! Background retention: seen-id eviction and event log compaction

use crate::engine::AggregationEngine;
use crate::error::IngestError;
use crate::models::RetentionReport;
use crate::presence::PresenceSet;
use chrono::{Days, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// First day inside a `retention_days` window ending at `today`.
pub fn retention_cutoff(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Periodically forgets seen ids older than the retention window and
/// compacts the event log behind them.
pub struct RetentionSweeper<S: PresenceSet> {
    engine: Arc<AggregationEngine<S>>,
    retention_days: u32,
    interval: Duration,
}

impl<S: PresenceSet> RetentionSweeper<S> {
    pub fn new(engine: Arc<AggregationEngine<S>>, retention_days: u32, interval: Duration) -> Self {
        Self {
            engine,
            retention_days,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// First day whose ids are kept, relative to `today`.
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        retention_cutoff(today, self.retention_days)
    }

    /// Run one pass against the current UTC date.
    pub async fn sweep(&self) -> Result<RetentionReport, IngestError> {
        let cutoff = self.cutoff(Utc::now().date_naive());
        let report = self.engine.compact_before(cutoff).await?;
        debug!(
            %cutoff,
            evicted = report.evicted_ids,
            compacted = report.compacted_records,
            "Retention sweep complete"
        );
        Ok(report)
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            retention_days = self.retention_days,
            interval_secs = self.interval.as_secs(),
            "Retention sweeper started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        warn!(error = %e, "Retention sweep failed, retrying next tick");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Retention sweeper stopped");
    }
}
