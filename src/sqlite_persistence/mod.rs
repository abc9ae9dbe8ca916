//! Small helpers shared by the SQLite-backed stores: declarative table
//! definitions, schema versioning through `PRAGMA user_version`, and the
//! open-or-migrate routine every store runs at startup.

mod versioned_schema;

pub use versioned_schema::{
    open_versioned_db, prepare_versioned_db, Column, SqlType, Table, VersionedSchema,
};

/// Offset added to the schema version stored in `PRAGMA user_version`, so a
/// database created by some other tool (version 0) is never mistaken for ours.
pub const BASE_DB_VERSION: usize = 70000;

/// Column default producing the current unix time in seconds.
pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";
