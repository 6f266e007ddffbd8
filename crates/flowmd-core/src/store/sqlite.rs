//! SQLite-backed key/value store.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::{KeyValueStore, StoreResult, SCHEMA};

/// Key/value store over a single SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open store at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM kv_entries WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.conn.execute("DELETE FROM kv_entries WHERE key = ?", [key])?;
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_entries ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initialized() {
        let store = SqliteStore::open_in_memory().unwrap();
        let tables: Vec<String> = store
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert!(tables.contains(&"kv_entries".to_string()));
    }

    #[test]
    fn test_put_get_overwrite_remove() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("manual_notes_1").unwrap(), None);

        store.put("manual_notes_1", "\"first\"").unwrap();
        store.put("manual_notes_1", "\"second\"").unwrap();
        assert_eq!(store.get("manual_notes_1").unwrap().as_deref(), Some("\"second\""));
        assert_eq!(store.keys().unwrap(), vec!["manual_notes_1"]);

        store.remove("manual_notes_1").unwrap();
        assert_eq!(store.get("manual_notes_1").unwrap(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowmd.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.put("view_state", "{}").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("view_state").unwrap().as_deref(), Some("{}"));
    }
}
