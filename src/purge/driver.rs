use super::models::{ExpirationQuery, PurgeOutcome, DEFAULT_RETENTION_DAYS};
use super::RecordStore;
use crate::server::metrics;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("Failed to query expired records: {0}")]
    Query(String),

    #[error("Failed to delete expired records: {0}")]
    Delete(String),
}

/// Runs one bounded purge pass against a [`RecordStore`].
pub struct PurgeDriver {
    store: Arc<dyn RecordStore>,
    retention: Duration,
}

impl PurgeDriver {
    pub fn new(store: Arc<dyn RecordStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    pub fn with_default_retention(store: Arc<dyn RecordStore>) -> Self {
        Self::new(store, Duration::days(DEFAULT_RETENTION_DAYS as i64))
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn run(&self) -> PurgeOutcome {
        self.run_at(Utc::now())
    }

    /// Purges with `now` as the reference clock. Never fails: errors are
    /// logged and reported as [`PurgeOutcome::Failed`].
    pub fn run_at(&self, now: DateTime<Utc>) -> PurgeOutcome {
        let outcome = match self.purge_once(ExpirationQuery::at(now, self.retention)) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Expired record purge failed: {}", e);
                PurgeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        metrics::record_purge_run(outcome.label());
        outcome
    }

    fn purge_once(&self, query: ExpirationQuery) -> Result<PurgeOutcome, PurgeError> {
        debug!(
            "Querying records older than {} (limit {})",
            query.cutoff, query.limit
        );
        let expired = self
            .store
            .query_expired(&query)
            .map_err(|e| PurgeError::Query(format!("{:#}", e)))?;

        if expired.is_empty() {
            debug!("No expired records");
            return Ok(PurgeOutcome::NothingToDo);
        }

        let more_remaining = expired.len() >= query.limit;
        let count = self
            .store
            .delete_batch(&expired)
            .map_err(|e| PurgeError::Delete(format!("{:#}", e)))?;
        metrics::record_purge_deleted(count);

        if more_remaining {
            info!(
                "Deleted {} expired records, batch limit reached; more will be removed on the next run",
                count
            );
        } else {
            info!("Deleted {} expired records", count);
        }

        Ok(PurgeOutcome::Deleted {
            count,
            more_remaining,
        })
    }
}
