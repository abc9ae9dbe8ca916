use super::schema::DIRECTORY_VERSIONED_SCHEMAS;
use super::RecipientDirectory;
use crate::fanout::{Recipient, RecipientFailure};
use crate::sqlite_persistence::{open_versioned_db, prepare_versioned_db};
use anyhow::{anyhow, Result};
use rusqlite::{params, types::Value, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct SqliteRecipientDirectory {
    conn: Arc<Mutex<Connection>>,
}

/// A flagged address as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedAddress {
    pub address: String,
    pub error_code: String,
    pub flagged_at: i64,
}

impl SqliteRecipientDirectory {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), DIRECTORY_VERSIONED_SCHEMAS, "directory")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        prepare_versioned_db(&mut conn, DIRECTORY_VERSIONED_SCHEMAS, "directory", true)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Directory connection mutex poisoned"))
    }

    pub fn add_recipient(&self, address: &str, opt_in: bool) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO recipients (address, notify_opt_in) VALUES (?1, ?2)",
            params![address, opt_in],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Bulk insert in a single transaction.
    pub fn add_recipients<S: AsRef<str>>(&self, addresses: &[S], opt_in: bool) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO recipients (address, notify_opt_in) VALUES (?1, ?2)")?;
            for address in addresses {
                stmt.execute(params![address.as_ref(), opt_in])?;
            }
        }
        tx.commit()?;
        Ok(addresses.len())
    }

    pub fn set_opt_in(&self, address: &str, opt_in: bool) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute(
            "UPDATE recipients SET notify_opt_in = ?1 WHERE address = ?2",
            params![opt_in, address],
        )?)
    }

    pub fn count_recipients(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipients", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    pub fn get_flagged_addresses(&self) -> Result<Vec<FlaggedAddress>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT address, error_code, flagged_at FROM flagged_addresses ORDER BY flagged_at, address",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FlaggedAddress {
                    address: row.get(0)?,
                    error_code: row.get(1)?,
                    flagged_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Only text addresses are usable. NULL and blob values surface as an empty
/// address so the recipient is treated as ineligible. Numbers written to the
/// column are converted to text by its affinity.
fn address_from_value(value: Value) -> String {
    match value {
        Value::Text(s) => s,
        _ => String::new(),
    }
}

impl RecipientDirectory for SqliteRecipientDirectory {
    fn list_recipients(&self) -> Result<Vec<Recipient>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT address, notify_opt_in FROM recipients ORDER BY id")?;
        let recipients = stmt
            .query_map([], |row| {
                let address: Value = row.get(0)?;
                let opt_in: Option<i64> = row.get(1)?;
                Ok(Recipient {
                    address: address_from_value(address),
                    eligible: opt_in == Some(1),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Loaded {} recipients from directory", recipients.len());
        Ok(recipients)
    }

    fn flag_for_removal(&self, failures: &[RecipientFailure]) -> Result<usize> {
        if failures.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO flagged_addresses (address, error_code, error_message)
                 VALUES (?1, ?2, ?3)",
            )?;
            for failure in failures {
                inserted += stmt.execute(params![
                    failure.address,
                    failure.error_code,
                    failure.error_message
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }
}
