//! Shared constants for end-to-end tests

/// Per-request timeout of the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// How long to wait for the server to answer on `/`
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// How long to wait for a triggered job to finish
pub const JOB_WAIT_TIMEOUT_MS: u64 = 5000;

/// Addresses with this prefix are rejected by the test transport as unregistered
pub const UNREGISTERED_PREFIX: &str = "gone-";

/// Addresses with this prefix get a transient failure from the test transport
pub const UNAVAILABLE_PREFIX: &str = "busy-";

pub const PURGE_JOB_ID: &str = "expired_record_purge";
