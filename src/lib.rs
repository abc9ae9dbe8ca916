//! Push notification fan-out and retention purge server.
//!
//! The library exposes the modules so the binaries and end-to-end tests can
//! assemble the server from the same parts.

pub mod background_jobs;
pub mod config;
pub mod directory;
pub mod fanout;
pub mod purge;
pub mod server;
pub mod sqlite_persistence;
pub mod transport;

pub use directory::{RecipientDirectory, SqliteRecipientDirectory};
pub use fanout::{FanOutDispatcher, FanOutError, FanOutReport, NotifyRequest};
pub use purge::{PurgeDriver, PurgeOutcome, RecordStore, SqliteRecordStore};
pub use server::{make_app, run_server, RequestsLoggingLevel};
pub use transport::{HttpPushTransport, LoggingTransport, PushTransport};
