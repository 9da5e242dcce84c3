//! Repository wrapper that keeps the library usable when storage fails

use romkeep_api::RomRecord;
use romkeep_util::RomFile;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::{RomStore, SqliteStore};

/// Durable per-game statistics.
///
/// Storage errors are logged and degrade to "no data": reads come back
/// empty and writes are dropped. The library stays interactive, just stale.
#[derive(Clone)]
pub struct RomRepository {
    store: Option<Arc<dyn RomStore>>,
}

impl RomRepository {
    pub fn new(store: Arc<dyn RomStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A repository with no backing store
    pub fn unavailable() -> Self {
        Self { store: None }
    }

    /// Open the SQLite store at `path`, degrading if it cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match SqliteStore::open(path) {
            Ok(store) => {
                info!(db_path = %path.display(), "Store initialized");
                Self::new(Arc::new(store))
            }
            Err(e) => {
                error!(db_path = %path.display(), error = %e, "Failed to open store, library data unavailable");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.store.as_ref().is_some_and(|s| s.is_healthy())
    }

    pub fn load(&self, file: &RomFile) -> Option<RomRecord> {
        let store = self.store.as_ref()?;
        match store.load(file) {
            Ok(record) => record,
            Err(e) => {
                error!(file = %file, error = %e, "Failed to load record");
                None
            }
        }
    }

    pub fn load_all(&self) -> Vec<RomRecord> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        match store.load_all() {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to load library");
                Vec::new()
            }
        }
    }

    pub fn save(&self, record: &RomRecord) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(record) {
            error!(file = %record.file, error = %e, "Failed to save record");
        }
    }

    pub fn remove(&self, file: &RomFile) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.remove(file) {
            error!(file = %file, error = %e, "Failed to remove record");
        }
    }

    pub fn is_external_change_pending(&self) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.is_external_change_pending() {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "Failed to check store for changes");
                false
            }
        }
    }
}

impl std::fmt::Debug for RomRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RomRepository")
            .field("available", &self.store.is_some())
            .finish()
    }
}
