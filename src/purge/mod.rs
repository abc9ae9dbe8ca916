//! Bounded retention purge.
//!
//! Each run deletes at most [`PURGE_BATCH_LIMIT`] expired records in one
//! atomic batch and reports whether more are likely left. Convergence comes
//! from running again on the next schedule, never from looping inside a run.

mod driver;
mod models;
mod schema;
mod sqlite_record_store;

pub use driver::{PurgeDriver, PurgeError};
pub use models::{
    ExpirationQuery, PurgeOutcome, RecordRef, DEFAULT_RETENTION_DAYS, PURGE_BATCH_LIMIT,
};
pub use schema::RECORDS_VERSIONED_SCHEMAS;
pub use sqlite_record_store::SqliteRecordStore;

use anyhow::Result;

/// Store holding timestamped records subject to retention.
pub trait RecordStore: Send + Sync {
    /// Records whose timestamp is strictly older than `query.cutoff`, at most
    /// `query.limit` of them, in no particular order.
    fn query_expired(&self, query: &ExpirationQuery) -> Result<Vec<RecordRef>>;

    /// Deletes all given records or none of them. Returns the number of rows
    /// removed; ids that no longer exist are not an error.
    fn delete_batch(&self, records: &[RecordRef]) -> Result<usize>;
}
