//! SQLite schema definitions for the record store database.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema};

/// Records subject to retention; `created_at` is unix seconds
const RECORDS_TABLE_V1: Table = Table {
    name: "records",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true),
        sqlite_column!("payload", SqlType::Text),
        sqlite_column!("created_at", SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_records_created_at", "created_at")],
};

pub const RECORDS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[RECORDS_TABLE_V1],
    migration: None,
}];
