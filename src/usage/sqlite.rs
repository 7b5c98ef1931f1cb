//! SQLite ledger store.

use super::{LedgerStore, UsageEntry};
use crate::error::{Result, SophiaError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const HISTORY_KEY: &str = "history";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS kv (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
"#;

/// Stores the ledger as one JSON value in a key-value table.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    location: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite usage store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            location: Some(path.to_path_buf()),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: None,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SophiaError::Usage("SQLite connection lock poisoned".into()))
    }
}

impl LedgerStore for SqliteStore {
    fn load(&self) -> Result<Option<Vec<UsageEntry>>> {
        let conn = self.lock()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![HISTORY_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, entries: &[UsageEntry]) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![HISTORY_KEY, json, chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        debug!("Stored {} usage entries", entries.len());
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.location {
            Some(path) => format!("{} (sqlite)", path.display()),
            None => ":memory: (sqlite)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str) -> UsageEntry {
        UsageEntry {
            id: id.to_string(),
            timestamp: Utc::now(),
            video_title: "Title".to_string(),
            video_url: "https://youtu.be/abc12345678".to_string(),
            transcription_provider: "Groq Whisper".to_string(),
            summary_provider: "claude-haiku-4-5".to_string(),
            audio_duration_seconds: 30.0,
            tokens_used: 42,
            cost_usd: 0.0002,
        }
    }

    #[test]
    fn test_in_memory_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.load().unwrap().is_none());

        store.save(&[entry("a")]).unwrap();
        store.save(&[entry("b"), entry("a")]).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "b");
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.db");

        SqliteStore::new(&path).unwrap().save(&[entry("kept")]).unwrap();

        let reopened = SqliteStore::new(&path).unwrap();
        assert_eq!(reopened.load().unwrap().unwrap()[0].id, "kept");
        assert!(reopened.describe().ends_with("(sqlite)"));
    }
}
