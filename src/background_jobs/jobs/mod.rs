//! Concrete `BackgroundJob` implementations.

pub mod expired_record_purge;

pub use expired_record_purge::ExpiredRecordPurgeJob;
