//! The bounded usage ledger.

use super::{JsonFileStore, LedgerStore, SqliteStore, UsageEntry};
use crate::config::{Settings, UsageBackend};
use crate::error::{Result, SophiaError};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// Default cap on stored entries.
pub const MAX_ENTRIES: usize = 200;

/// Most-recent-first history of completed runs, capped in size.
///
/// Mutations hold the lock across the store write and only replace the
/// in-memory sequence once the write succeeded, so memory never runs ahead
/// of what a restart would load.
pub struct UsageLedger {
    store: Arc<dyn LedgerStore>,
    entries: Mutex<Vec<UsageEntry>>,
    max_entries: usize,
}

impl UsageLedger {
    /// Open a ledger over `store`, loading whatever it holds.
    pub fn open(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_capacity(store, MAX_ENTRIES)
    }

    pub fn with_capacity(store: Arc<dyn LedgerStore>, max_entries: usize) -> Self {
        let ledger = Self {
            store,
            entries: Mutex::new(Vec::new()),
            max_entries: max_entries.max(1),
        };
        ledger.load();
        ledger
    }

    /// Open the backend configured in `[usage]`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let path = settings.usage_path();
        let store: Arc<dyn LedgerStore> = match settings.usage.backend {
            UsageBackend::Json => Arc::new(JsonFileStore::new(path)),
            UsageBackend::Sqlite => Arc::new(SqliteStore::new(&path)?),
        };
        Ok(Self::with_capacity(store, settings.usage.max_entries))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<UsageEntry>> {
        // Entries are only ever replaced wholesale; a poisoned lock still guards a whole Vec.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reload from the store. Missing or unreadable state yields an empty ledger.
    pub fn load(&self) -> Vec<UsageEntry> {
        let mut loaded = match self.store.load() {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Usage history at {} unreadable, starting empty: {}", self.store.describe(), e);
                Vec::new()
            }
        };
        loaded.truncate(self.max_entries);

        let mut entries = self.lock();
        *entries = loaded;
        entries.clone()
    }

    /// Current entries, most recent first.
    pub fn entries(&self) -> Vec<UsageEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Where the ledger is persisted.
    pub fn location(&self) -> String {
        self.store.describe()
    }

    /// Prepend an entry and persist, evicting the oldest beyond the cap.
    ///
    /// Returns `false` if the write failed; the failure is logged and the
    /// in-memory ledger is left unchanged.
    pub fn append(&self, entry: UsageEntry) -> bool {
        let mut entries = self.lock();

        let mut next = Vec::with_capacity(self.max_entries);
        next.push(entry);
        next.extend(entries.iter().take(self.max_entries - 1).cloned());

        match self.store.save(&next) {
            Ok(()) => {
                *entries = next;
                true
            }
            Err(e) => {
                warn!("Could not record usage in {}: {}", self.store.describe(), e);
                false
            }
        }
    }

    /// Empty the ledger and persist.
    pub fn clear(&self) -> Result<()> {
        let mut entries = self.lock();
        self.store
            .save(&[])
            .map_err(|e| SophiaError::Usage(format!("Could not clear usage history: {}", e)))?;
        entries.clear();
        info!("Cleared usage history");
        Ok(())
    }
}
