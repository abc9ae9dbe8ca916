//! Background job scheduling and execution.
//!
//! Jobs run on a fixed interval or once a day at a wall-clock time, and can
//! also be triggered by hand through the admin API.

mod context;
mod handle;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use handle::{JobInfo, JobRunInfo, JobScheduleInfo, SchedulerHandle};
pub use job::{BackgroundJob, JobError, JobSchedule, ShutdownBehavior};
pub use scheduler::{create_scheduler, JobScheduler};
