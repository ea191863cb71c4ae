// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Active-mount store: in-memory map plus on-disk persistence.
//!
//! All mutating operations hold one coarse lock and rewrite the state file
//! before returning, so the file always reflects a consistent snapshot.
//! Writes go to a temp file in the same directory, are fsynced, and renamed
//! over the canonical path.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use super::ActiveMount;

/// Version of the persisted state format.
const FORMAT_VERSION: u32 = 1;

/// Errors surfaced by the mount store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// State file could not be read or written.
    #[error("state file IO error: {0}")]
    Io(#[from] std::io::Error),

    /// State file could not be (de)serialized.
    #[error("state file serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A mount with this entry id is already present.
    #[error("entry '{0}' is already mounted")]
    AlreadyMounted(String),

    /// Another mount already uses this prefix.
    #[error("prefix '{0}' is already in use")]
    PrefixInUse(String),

    /// The state file carries a version this build does not understand.
    #[error("unsupported state file version {0}")]
    UnsupportedVersion(u32),
}

/// Versioned on-disk envelope for the active-mount set.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedMounts {
    version: u32,
    mounts: Vec<ActiveMount>,
}

#[derive(Default)]
struct Inner {
    mounts: BTreeMap<String, ActiveMount>,
    by_prefix: HashMap<String, String>,
    /// Prefixes claimed by in-flight activations, keyed to their entry id.
    reserved: HashMap<String, String>,
}

/// In-memory map from entry id to mount record, with a secondary prefix
/// index and synchronous persistence on every mutation.
pub struct MountStore {
    inner: Mutex<Inner>,
    path: PathBuf,
    entry_locks: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MountStore {
    /// Create a store persisting to `path`. The file is not read here; use
    /// [`load_persisted`](Self::load_persisted) to fetch records for replay.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            path: path.into(),
            entry_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Path of the canonical state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-entry lock serializing activate/deactivate for one entry id.
    pub fn entry_lock(&self, entry_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.entry_locks.lock();
        Arc::clone(
            locks
                .entry(entry_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Read the persisted mount records without populating the live map.
    ///
    /// Replay re-activates each record from scratch; the live map only ever
    /// holds mounts whose children are actually running.
    pub fn load_persisted(&self) -> Result<Vec<ActiveMount>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Self::decode(&contents)
    }

    /// Decode a serialized snapshot.
    pub fn decode(serialized: &str) -> Result<Vec<ActiveMount>, StoreError> {
        let envelope: PersistedMounts = serde_json::from_str(serialized)?;
        if envelope.version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope.mounts)
    }

    /// Claim a prefix for an in-flight activation.
    ///
    /// Fails if the prefix belongs to an active mount or is reserved by a
    /// different entry's activation, so uniqueness holds at every observable
    /// moment — not just at insert time.
    pub async fn reserve_prefix(&self, prefix: &str, entry_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.by_prefix.contains_key(prefix) {
            return Err(StoreError::PrefixInUse(prefix.to_string()));
        }
        match inner.reserved.get(prefix) {
            Some(owner) if owner != entry_id => {
                Err(StoreError::PrefixInUse(prefix.to_string()))
            }
            _ => {
                inner
                    .reserved
                    .insert(prefix.to_string(), entry_id.to_string());
                Ok(())
            }
        }
    }

    /// Release a reservation after a failed activation.
    pub async fn release_prefix(&self, prefix: &str, entry_id: &str) {
        let mut inner = self.inner.lock().await;
        if inner.reserved.get(prefix).is_some_and(|owner| owner == entry_id) {
            inner.reserved.remove(prefix);
        }
    }

    /// Insert a mount, enforcing entry-id and prefix uniqueness, and persist.
    ///
    /// A reservation held by the same entry is consumed; one held by another
    /// entry rejects the insert.
    pub async fn add(&self, mount: ActiveMount) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.mounts.contains_key(&mount.entry_id) {
            return Err(StoreError::AlreadyMounted(mount.entry_id));
        }
        if inner.by_prefix.contains_key(&mount.prefix) {
            return Err(StoreError::PrefixInUse(mount.prefix));
        }
        if inner
            .reserved
            .get(&mount.prefix)
            .is_some_and(|owner| *owner != mount.entry_id)
        {
            return Err(StoreError::PrefixInUse(mount.prefix));
        }
        inner.reserved.remove(&mount.prefix);
        let entry_id = mount.entry_id.clone();
        let prefix = mount.prefix.clone();
        inner.by_prefix.insert(prefix.clone(), entry_id.clone());
        inner.mounts.insert(entry_id.clone(), mount);
        if let Err(err) = self.persist_locked(&inner) {
            inner.mounts.remove(&entry_id);
            inner.by_prefix.remove(&prefix);
            return Err(err);
        }
        Ok(())
    }

    /// Remove a mount by entry id and persist. Returns the removed record.
    pub async fn remove(&self, entry_id: &str) -> Result<Option<ActiveMount>, StoreError> {
        let mut inner = self.inner.lock().await;
        let removed = inner.mounts.remove(entry_id);
        if let Some(ref mount) = removed {
            inner.by_prefix.remove(&mount.prefix);
            self.persist_locked(&inner)?;
        }
        Ok(removed)
    }

    /// Look up a mount by entry id.
    pub async fn get(&self, entry_id: &str) -> Option<ActiveMount> {
        self.inner.lock().await.mounts.get(entry_id).cloned()
    }

    /// Look up a mount by prefix.
    pub async fn get_by_prefix(&self, prefix: &str) -> Option<ActiveMount> {
        let inner = self.inner.lock().await;
        let entry_id = inner.by_prefix.get(prefix)?;
        inner.mounts.get(entry_id).cloned()
    }

    /// All mounts in entry-id order.
    pub async fn list(&self) -> Vec<ActiveMount> {
        self.inner.lock().await.mounts.values().cloned().collect()
    }

    /// Number of active mounts.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.mounts.len()
    }

    /// Whether the store holds no mounts.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.mounts.is_empty()
    }

    /// Merge environment overrides into a mount and persist.
    ///
    /// The running child is unaffected; changes apply on the next activate.
    pub async fn update_environment(
        &self,
        entry_id: &str,
        environment: BTreeMap<String, String>,
    ) -> Result<Option<ActiveMount>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(mount) = inner.mounts.get_mut(entry_id) else {
            return Ok(None);
        };
        mount.environment.extend(environment);
        let updated = mount.clone();
        self.persist_locked(&inner)?;
        Ok(Some(updated))
    }

    /// Serialize the current state as the persisted envelope.
    pub async fn snapshot(&self) -> Result<String, StoreError> {
        let inner = self.inner.lock().await;
        Self::encode(&inner)
    }

    /// Rewrite the state file from the current in-memory state.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let inner = self.inner.lock().await;
        self.persist_locked(&inner)
    }

    fn persist_locked(&self, inner: &Inner) -> Result<(), StoreError> {
        let contents = Self::encode(inner)?;
        write_atomic(&self.path, &contents)?;
        info!(mounts = inner.mounts.len(), path = %self.path.display(), "persisted active mounts");
        Ok(())
    }

    fn encode(inner: &Inner) -> Result<String, StoreError> {
        let envelope = PersistedMounts {
            version: FORMAT_VERSION,
            mounts: inner.mounts.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }
}

/// Write `contents` to `path` atomically: temp file in the same directory,
/// fsync, rename over the canonical path.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)?;
    }
    let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
