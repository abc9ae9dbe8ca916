use super::context::JobContext;
use chrono::{DateTime, Days, FixedOffset, NaiveTime, Offset, Utc};
use std::time::Duration;

/// Schedule for when a job should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSchedule {
    /// Run at fixed intervals, the first time right after startup.
    Interval(Duration),
    /// Run once a day at `at`, wall-clock time in `utc_offset`.
    Daily {
        at: NaiveTime,
        utc_offset: FixedOffset,
    },
}

impl JobSchedule {
    pub fn daily_utc(at: NaiveTime) -> Self {
        JobSchedule::Daily {
            at,
            utc_offset: Utc.fix(),
        }
    }

    /// First run time for a job registered at `now`.
    pub fn first_run(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            JobSchedule::Interval(_) => now,
            JobSchedule::Daily { .. } => self.next_run_after(now),
        }
    }

    /// Next run time strictly after `after`.
    pub fn next_run_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            JobSchedule::Interval(interval) => {
                after + chrono::Duration::from_std(*interval).unwrap_or(chrono::Duration::zero())
            }
            JobSchedule::Daily { at, utc_offset } => {
                let local = after.with_timezone(utc_offset).naive_local();
                let today = local.date().and_time(*at);
                let candidate = if today > local {
                    today
                } else {
                    today.checked_add_days(Days::new(1)).unwrap_or(today)
                };
                DateTime::<Utc>::from_naive_utc_and_offset(candidate - *utc_offset, Utc)
            }
        }
    }
}

/// How a job should be handled during server shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownBehavior {
    /// Job can be cancelled immediately
    #[default]
    Cancellable,
    /// Wait for job to complete before shutdown
    WaitForCompletion,
}

/// Errors that can occur during job execution.
#[derive(Debug)]
pub enum JobError {
    NotFound,
    AlreadyRunning,
    ExecutionFailed(String),
    Cancelled,
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::NotFound => write!(f, "Job not found"),
            JobError::AlreadyRunning => write!(f, "Job is already running"),
            JobError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            JobError::Cancelled => write!(f, "Job was cancelled"),
        }
    }
}

impl std::error::Error for JobError {}

/// Trait for background jobs.
///
/// Jobs are executed synchronously in a blocking context.
pub trait BackgroundJob: Send + Sync {
    /// Unique identifier for this job.
    fn id(&self) -> &'static str;

    /// Human-readable name for this job.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn schedule(&self) -> JobSchedule;

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    /// Execute the job.
    ///
    /// Called from `spawn_blocking`. Long operations should check
    /// `ctx.is_cancelled()` and return `JobError::Cancelled` when set.
    fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
