//! Periodic deletion of old notification records.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio_util::sync::CancellationToken;
use voyage_core::error::CoreError;
use voyage_db::{NotificationStore, StoreResult};

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Default record lifetime in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 90;

/// Accepted record lifetimes in days.
pub const RETENTION_DAYS_RANGE: RangeInclusive<i64> = 1..=3650;

/// Check a configured lifetime against [`RETENTION_DAYS_RANGE`].
pub fn validate_retention_days(days: i64) -> Result<TimeDelta, CoreError> {
    if !RETENTION_DAYS_RANGE.contains(&days) {
        return Err(CoreError::Validation(format!(
            "retention must be between {} and {} days, got {days}",
            RETENTION_DAYS_RANGE.start(),
            RETENTION_DAYS_RANGE.end()
        )));
    }
    TimeDelta::try_days(days)
        .ok_or_else(|| CoreError::Validation(format!("retention of {days} days overflows")))
}

/// Background service deleting records older than the retention window.
pub struct RetentionSweeper {
    notifications: Arc<dyn NotificationStore>,
    retention: TimeDelta,
}

impl RetentionSweeper {
    /// Fails when `retention_days` is outside [`RETENTION_DAYS_RANGE`].
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        retention_days: i64,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            notifications,
            retention: validate_retention_days(retention_days)?,
        })
    }

    /// Run the sweep loop until `cancel` fires. The first sweep runs
    /// immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Retention sweeper cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        tracing::error!(error = %e, "Retention sweep failed");
                    }
                }
            }
        }
    }

    /// Delete every record created before `now - retention`.
    pub async fn sweep_once(&self) -> StoreResult<u64> {
        let cutoff = Utc::now()
            .checked_sub_signed(self.retention)
            .ok_or_else(|| CoreError::Validation("retention cutoff out of range".into()))?;
        let deleted = self.notifications.delete_older_than(cutoff).await?;
        if deleted > 0 {
            tracing::info!(deleted, %cutoff, "Retention sweep removed notifications");
        }
        Ok(deleted)
    }
}
