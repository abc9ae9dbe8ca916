use super::models::{ExpirationQuery, RecordRef, PURGE_BATCH_LIMIT};
use super::schema::RECORDS_VERSIONED_SCHEMAS;
use super::RecordStore;
use crate::sqlite_persistence::{open_versioned_db, prepare_versioned_db};
use anyhow::{anyhow, bail, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), RECORDS_VERSIONED_SCHEMAS, "records")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        prepare_versioned_db(&mut conn, RECORDS_VERSIONED_SCHEMAS, "records", true)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Record store connection mutex poisoned"))
    }

    pub fn insert_record(&self, id: &str, payload: Option<&str>, created_at: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO records (id, payload, created_at) VALUES (?1, ?2, ?3)",
            params![id, payload, created_at],
        )?;
        Ok(())
    }

    /// Inserts `(id, created_at)` pairs in one transaction.
    pub fn insert_records(&self, records: &[(String, i64)]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO records (id, payload, created_at) VALUES (?1, NULL, ?2)")?;
            for (id, created_at) in records {
                stmt.execute(params![id, created_at])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn count_records(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    pub fn count_older_than(&self, cutoff: i64) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE created_at < ?1",
            params![cutoff],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }
}

impl RecordStore for SqliteRecordStore {
    fn query_expired(&self, query: &ExpirationQuery) -> Result<Vec<RecordRef>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM records WHERE created_at < ?1 LIMIT ?2")?;
        let ids = stmt
            .query_map(params![query.cutoff, query.limit as i64], |row| {
                Ok(RecordRef(row.get(0)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn delete_batch(&self, records: &[RecordRef]) -> Result<usize> {
        if records.len() > PURGE_BATCH_LIMIT {
            bail!(
                "Batch of {} deletes exceeds the limit of {}",
                records.len(),
                PURGE_BATCH_LIMIT
            );
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM records WHERE id = ?1")?;
            for record in records {
                deleted += stmt.execute(params![record.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(records: &[(&str, i64)]) -> SqliteRecordStore {
        let store = SqliteRecordStore::in_memory().unwrap();
        for (id, created_at) in records {
            store.insert_record(id, None, *created_at).unwrap();
        }
        store
    }

    #[test]
    fn query_uses_strict_cutoff_and_limit() {
        let store = store_with(&[("a", 100), ("b", 199), ("c", 200), ("d", 300)]);

        let mut ids = store
            .query_expired(&ExpirationQuery {
                cutoff: 200,
                limit: 10,
            })
            .unwrap();
        ids.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(ids, vec![RecordRef("a".into()), RecordRef("b".into())]);

        let capped = store
            .query_expired(&ExpirationQuery {
                cutoff: 1000,
                limit: 3,
            })
            .unwrap();
        assert_eq!(capped.len(), 3);
    }

    #[test]
    fn delete_batch_removes_given_records() {
        let store = store_with(&[("a", 1), ("b", 2), ("c", 3)]);
        let deleted = store
            .delete_batch(&[RecordRef("a".into()), RecordRef("c".into())])
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count_records().unwrap(), 1);
    }

    #[test]
    fn deleting_missing_ids_is_not_an_error() {
        let store = store_with(&[("a", 1)]);
        let deleted = store
            .delete_batch(&[RecordRef("a".into()), RecordRef("gone".into())])
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[test]
    fn delete_batch_is_all_or_nothing() {
        let store = store_with(&[("a", 1), ("b", 2), ("locked", 3)]);
        {
            let conn = store.lock().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER refuse_locked BEFORE DELETE ON records
                 WHEN old.id = 'locked'
                 BEGIN SELECT RAISE(ABORT, 'record is locked'); END;",
            )
            .unwrap();
        }

        let result = store.delete_batch(&[
            RecordRef("a".into()),
            RecordRef("locked".into()),
            RecordRef("b".into()),
        ]);

        assert!(result.is_err());
        assert_eq!(store.count_records().unwrap(), 3);
    }

    #[test]
    fn rejects_batches_over_the_limit() {
        let store = store_with(&[]);
        let batch: Vec<RecordRef> = (0..=PURGE_BATCH_LIMIT)
            .map(|i| RecordRef(format!("r{}", i)))
            .collect();
        assert!(store.delete_batch(&batch).is_err());
    }

    #[test]
    fn reopens_existing_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.db");
        {
            let store = SqliteRecordStore::new(&path).unwrap();
            store
                .insert_records(&[("x".to_string(), 5), ("y".to_string(), 6)])
                .unwrap();
        }
        let store = SqliteRecordStore::new(&path).unwrap();
        assert_eq!(store.count_older_than(6).unwrap(), 1);
    }
}
