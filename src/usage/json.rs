//! JSON file ledger store.

use super::{LedgerStore, UsageEntry};
use crate::error::{Result, SophiaError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct UsageFile {
    #[serde(default)]
    history: Vec<UsageEntry>,
}

/// Stores the ledger as `{"history": [...]}` in a JSON file.
///
/// Writes go to a temporary file in the same directory which then replaces
/// the target, so a crash never leaves a half-written file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<UsageEntry>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let file: UsageFile = serde_json::from_str(&content)?;
        Ok(Some(file.history))
    }

    fn save(&self, entries: &[UsageEntry]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(
            &mut tmp,
            &UsageFile {
                history: entries.to_vec(),
            },
        )?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| SophiaError::Usage(format!("Could not replace {}: {}", self.path.display(), e.error)))?;

        debug!("Wrote {} usage entries to {:?}", entries.len(), self.path);
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
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
            summary_provider: "claude-sonnet-4-6".to_string(),
            audio_duration_seconds: 60.0,
            tokens_used: 100,
            cost_usd: 0.001,
        }
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("usage.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_writes_history_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/usage.json");
        let store = JsonFileStore::new(&path);

        store.save(&[entry("a"), entry("b")]).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["history"].as_array().unwrap().len(), 2);
        assert_eq!(raw["history"][0]["id"], "a");

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded[1].id, "b");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(JsonFileStore::new(&path).load().is_err());
    }

    #[test]
    fn test_file_without_history_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(JsonFileStore::new(&path).load().unwrap(), Some(Vec::new()));
    }
}
