//! SQLite schema definitions for the recipient directory database.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

/// Recipients table - one row per registered device address
const RECIPIENTS_TABLE_V1: Table = Table {
    name: "recipients",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("address", SqlType::Text),
        sqlite_column!("notify_opt_in", SqlType::Integer, non_null = true),
        sqlite_column!(
            "created_at",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_recipients_opt_in", "notify_opt_in")],
};

/// Addresses the provider reported as permanently invalid
const FLAGGED_ADDRESSES_TABLE_V1: Table = Table {
    name: "flagged_addresses",
    columns: &[
        sqlite_column!("address", SqlType::Text, is_primary_key = true),
        sqlite_column!("error_code", SqlType::Text, non_null = true),
        sqlite_column!("error_message", SqlType::Text),
        sqlite_column!(
            "flagged_at",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

pub const DIRECTORY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[RECIPIENTS_TABLE_V1, FLAGGED_ADDRESSES_TABLE_V1],
    migration: None,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_v1_schema_creates_successfully() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = &DIRECTORY_VERSIONED_SCHEMAS[0];
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
    }

    #[test]
    fn test_created_at_defaults_to_now() {
        let conn = Connection::open_in_memory().unwrap();
        DIRECTORY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO recipients (address, notify_opt_in) VALUES ('tok', 1)",
            [],
        )
        .unwrap();
        let created_at: i64 = conn
            .query_row("SELECT created_at FROM recipients", [], |r| r.get(0))
            .unwrap();
        assert!(created_at > 1_600_000_000);
    }
}
