use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Maximum number of deletes the store accepts in one atomic batch.
pub const PURGE_BATCH_LIMIT: usize = 500;

pub const DEFAULT_RETENTION_DAYS: u64 = 30;

/// Identifier of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RecordRef(pub String);

impl RecordRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One bounded page of expired records: everything strictly older than
/// `cutoff` (unix seconds), capped at `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationQuery {
    pub cutoff: i64,
    pub limit: usize,
}

impl ExpirationQuery {
    pub fn at(now: DateTime<Utc>, retention: Duration) -> Self {
        Self {
            cutoff: (now - retention).timestamp(),
            limit: PURGE_BATCH_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PurgeOutcome {
    NothingToDo,
    Deleted { count: usize, more_remaining: bool },
    Failed { reason: String },
}

impl PurgeOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PurgeOutcome::NothingToDo => "nothing_to_do",
            PurgeOutcome::Deleted {
                more_remaining: true,
                ..
            } => "partial",
            PurgeOutcome::Deleted { .. } => "complete",
            PurgeOutcome::Failed { .. } => "failed",
        }
    }
}
