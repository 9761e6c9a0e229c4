//! Local key-value storage for the checkout form, keyed by owner.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use crate::{error::DraftStorageResult, models::OrderDraft};

/// Synchronous by contract: implementations may block briefly.
pub trait DraftStorage: Send + Sync {
    /// Returns the stored draft, or the default draft when nothing was saved.
    fn load(&self, owner_id: &str) -> DraftStorageResult<OrderDraft>;
    fn save(&self, owner_id: &str, draft: &OrderDraft) -> DraftStorageResult<()>;
    /// Drops the owner's draft; called by the logout flow.
    fn reset(&self, owner_id: &str) -> DraftStorageResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryDraftStorage {
    drafts: Mutex<HashMap<String, OrderDraft>>,
}

impl InMemoryDraftStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStorage for InMemoryDraftStorage {
    fn load(&self, owner_id: &str) -> DraftStorageResult<OrderDraft> {
        let drafts = self.drafts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(drafts.get(owner_id).cloned().unwrap_or_default())
    }

    fn save(&self, owner_id: &str, draft: &OrderDraft) -> DraftStorageResult<()> {
        let mut drafts = self.drafts.lock().unwrap_or_else(PoisonError::into_inner);
        drafts.insert(owner_id.to_string(), draft.clone());
        Ok(())
    }

    fn reset(&self, owner_id: &str) -> DraftStorageResult<()> {
        let mut drafts = self.drafts.lock().unwrap_or_else(PoisonError::into_inner);
        drafts.remove(owner_id);
        Ok(())
    }
}

/// All owners' drafts in one JSON document, rewritten on every save so the
/// form survives a process restart.
///
/// Every call does blocking file I/O on the calling thread: one read, and on
/// save one small write plus a rename. The checkout coordinator calls it from
/// its synchronous field setters, which run on the UI thread. Async callers
/// that must not block a runtime worker wrap the call in
/// `tokio::task::spawn_blocking`.
#[derive(Debug)]
pub struct JsonFileDraftStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileDraftStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> DraftStorageResult<HashMap<String, OrderDraft>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_all(&self, drafts: &HashMap<String, OrderDraft>) -> DraftStorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        // atomic replace
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(drafts)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DraftStorage for JsonFileDraftStorage {
    fn load(&self, owner_id: &str) -> DraftStorageResult<OrderDraft> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(owner_id).unwrap_or_default())
    }

    fn save(&self, owner_id: &str, draft: &OrderDraft) -> DraftStorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut drafts = self.read_all()?;
        drafts.insert(owner_id.to_string(), draft.clone());
        self.write_all(&drafts)
    }

    fn reset(&self, owner_id: &str) -> DraftStorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut drafts = self.read_all()?;
        if drafts.remove(owner_id).is_some() {
            self.write_all(&drafts)?;
        }
        Ok(())
    }
}
