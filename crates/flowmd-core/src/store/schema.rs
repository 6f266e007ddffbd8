//! SQLite schema definition.

/// Key/value schema backing the session store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Key/value entries
-- ============================================================================

CREATE TABLE IF NOT EXISTS kv_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,                         -- JSON envelope {schema_version, saved_at, data}
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_kv_entries_updated_at ON kv_entries(updated_at);
"#;
