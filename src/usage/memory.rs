//! In-memory ledger store for testing.

use super::{LedgerStore, UsageEntry};
use crate::error::{Result, SophiaError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Keeps the "persisted" sequence in memory.
///
/// Saves can be made to fail on demand to exercise error paths.
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Option<Vec<UsageEntry>>>,
    fail_saves: AtomicBool,
    save_count: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with previously persisted entries.
    pub fn with_entries(entries: Vec<UsageEntry>) -> Self {
        Self {
            saved: Mutex::new(Some(entries)),
            ..Self::default()
        }
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// What a fresh load would return.
    pub fn snapshot(&self) -> Option<Vec<UsageEntry>> {
        self.saved.lock().ok().and_then(|saved| saved.clone())
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<UsageEntry>>> {
        let saved = self
            .saved
            .lock()
            .map_err(|_| SophiaError::Usage("memory store lock poisoned".into()))?;
        Ok(saved.clone())
    }

    fn save(&self, entries: &[UsageEntry]) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SophiaError::Usage("simulated write failure".into()));
        }
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| SophiaError::Usage("memory store lock poisoned".into()))?;
        *saved = Some(entries.to_vec());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
