//! Recipient directory.
//!
//! The directory owns recipient addresses and their opt-in flag. The fan-out
//! core only reads from it, and hands back the addresses it classified as
//! permanently undeliverable.

mod schema;
mod sqlite_directory;

pub use schema::DIRECTORY_VERSIONED_SCHEMAS;
pub use sqlite_directory::{FlaggedAddress, SqliteRecipientDirectory};

use crate::fanout::{Recipient, RecipientFailure};
use anyhow::Result;

pub trait RecipientDirectory: Send + Sync {
    /// Every recipient currently in the directory, eligible or not.
    fn list_recipients(&self) -> Result<Vec<Recipient>>;

    /// Records addresses that failed permanently. Returns how many were newly
    /// flagged.
    fn flag_for_removal(&self, failures: &[RecipientFailure]) -> Result<usize>;
}
