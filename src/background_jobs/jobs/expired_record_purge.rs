//! Scheduled bounded purge of expired records.
//!
//! Each run removes at most one batch; a backlog larger than the batch limit
//! drains over consecutive runs. Runs daily unless an interval is configured.

use crate::background_jobs::{BackgroundJob, JobContext, JobError, JobSchedule, ShutdownBehavior};
use crate::config::PurgeSettings;
use crate::purge::{PurgeDriver, PurgeOutcome, RecordStore};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub struct ExpiredRecordPurgeJob {
    driver: PurgeDriver,
    schedule: JobSchedule,
    last_outcome: Mutex<Option<PurgeOutcome>>,
}

impl ExpiredRecordPurgeJob {
    pub fn new(driver: PurgeDriver, schedule: JobSchedule) -> Self {
        Self {
            driver,
            schedule,
            last_outcome: Mutex::new(None),
        }
    }

    pub fn from_settings(store: Arc<dyn RecordStore>, settings: &PurgeSettings) -> Self {
        let retention = chrono::Duration::days(settings.retention_days as i64);
        let schedule = match settings.interval {
            Some(interval) => JobSchedule::Interval(interval),
            None => JobSchedule::Daily {
                at: settings.run_at,
                utc_offset: settings.utc_offset,
            },
        };
        Self::new(PurgeDriver::new(store, retention), schedule)
    }

    pub fn last_outcome(&self) -> Option<PurgeOutcome> {
        self.last_outcome.lock().ok().and_then(|guard| guard.clone())
    }
}

impl BackgroundJob for ExpiredRecordPurgeJob {
    fn id(&self) -> &'static str {
        "expired_record_purge"
    }

    fn name(&self) -> &'static str {
        "Expired Record Purge"
    }

    fn description(&self) -> &'static str {
        "Delete one bounded batch of records older than the retention window"
    }

    fn schedule(&self) -> JobSchedule {
        self.schedule.clone()
    }

    // A started batch delete is a single transaction; let it commit.
    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::WaitForCompletion
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        info!(
            "Purging records older than {} days",
            self.driver.retention().num_days()
        );
        let outcome = self.driver.run();

        if let Ok(mut last) = self.last_outcome.lock() {
            *last = Some(outcome.clone());
        }

        match outcome {
            PurgeOutcome::Failed { reason } => Err(JobError::ExecutionFailed(reason)),
            PurgeOutcome::Deleted {
                more_remaining: true,
                count,
            } => {
                warn!(
                    "Purge backlog exceeds one batch ({} deleted); remaining records wait for the next run",
                    count
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purge::{SqliteRecordStore, PURGE_BATCH_LIMIT};
    use chrono::{FixedOffset, NaiveTime, Utc};
    use tokio_util::sync::CancellationToken;

    fn ctx() -> JobContext {
        JobContext::new(CancellationToken::new(), "manual")
    }

    fn store_with_expired(count: usize) -> Arc<SqliteRecordStore> {
        let store = SqliteRecordStore::in_memory().unwrap();
        let old = (Utc::now() - chrono::Duration::days(90)).timestamp();
        let rows: Vec<(String, i64)> = (0..count).map(|i| (format!("r{}", i), old)).collect();
        store.insert_records(&rows).unwrap();
        Arc::new(store)
    }

    #[test]
    fn schedule_follows_settings() {
        let settings = PurgeSettings {
            run_at: NaiveTime::from_hms_opt(4, 45, 0).unwrap(),
            utc_offset: FixedOffset::east_opt(3600).unwrap(),
            ..Default::default()
        };
        let job = ExpiredRecordPurgeJob::from_settings(store_with_expired(0), &settings);

        assert_eq!(job.id(), "expired_record_purge");
        assert_eq!(
            job.schedule(),
            JobSchedule::Daily {
                at: settings.run_at,
                utc_offset: settings.utc_offset
            }
        );
        assert_eq!(job.shutdown_behavior(), ShutdownBehavior::WaitForCompletion);
    }

    #[test]
    fn interval_setting_replaces_daily_schedule() {
        let settings = PurgeSettings {
            interval: Some(std::time::Duration::from_secs(900)),
            ..Default::default()
        };
        let job = ExpiredRecordPurgeJob::from_settings(store_with_expired(0), &settings);

        assert_eq!(
            job.schedule(),
            JobSchedule::Interval(std::time::Duration::from_secs(900))
        );
    }

    #[test]
    fn execute_records_outcome() {
        let store = store_with_expired(PURGE_BATCH_LIMIT + 20);
        let job = ExpiredRecordPurgeJob::from_settings(store.clone(), &PurgeSettings::default());

        job.execute(&ctx()).unwrap();
        assert_eq!(
            job.last_outcome(),
            Some(PurgeOutcome::Deleted {
                count: PURGE_BATCH_LIMIT,
                more_remaining: true
            })
        );

        job.execute(&ctx()).unwrap();
        assert_eq!(store.count_records().unwrap(), 0);
        assert_eq!(job.last_outcome().unwrap().label(), "complete");
    }

    #[test]
    fn cancelled_before_start() {
        let store = store_with_expired(3);
        let job = ExpiredRecordPurgeJob::from_settings(store.clone(), &PurgeSettings::default());
        let token = CancellationToken::new();
        token.cancel();

        let result = job.execute(&JobContext::new(token, "schedule"));
        assert!(matches!(result, Err(JobError::Cancelled)));
        assert_eq!(store.count_records().unwrap(), 3);
        assert!(job.last_outcome().is_none());
    }
}
