// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog registry: entry map, cache persistence, and per-source status.
//!
//! Entries are readable by many and mutated only by the catalog refresher;
//! writes take the single write lock and rewrite the cache file atomically.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::entry::{RegistryEntry, SourceType};
use super::search::{self, SearchQuery};
use crate::mounts::store::write_atomic;

/// Version of the persisted cache format.
const CACHE_VERSION: u32 = 1;

/// Errors surfaced by the catalog registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Cache file could not be read or written.
    #[error("cache IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache file could not be (de)serialized.
    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Refresh state of one catalog source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceRefreshStatus {
    /// Source identifier.
    pub source_type: SourceType,
    /// Last successful refresh.
    pub last_refresh: Option<DateTime<Utc>>,
    /// Last refresh attempt, successful or not.
    pub last_attempt: Option<DateTime<Utc>>,
    /// Entries produced by the last successful refresh.
    pub entry_count: usize,
    /// Current state.
    pub state: SourceState,
    /// Last error, if any.
    pub error_message: Option<String>,
}

impl SourceRefreshStatus {
    /// Fresh status for a source that has never been refreshed.
    pub fn unknown(source_type: SourceType) -> Self {
        Self {
            source_type,
            last_refresh: None,
            last_attempt: None,
            entry_count: 0,
            state: SourceState::Unknown,
            error_message: None,
        }
    }
}

/// Coarse state of a catalog source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    /// Never refreshed.
    Unknown,
    /// A refresh is in flight.
    Refreshing,
    /// Last refresh succeeded.
    Ok,
    /// Last refresh failed.
    Error,
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            SourceState::Unknown => "unknown",
            SourceState::Refreshing => "refreshing",
            SourceState::Ok => "ok",
            SourceState::Error => "error",
        };
        f.write_str(tag)
    }
}

/// Aggregate registry statistics.
#[derive(Clone, Debug)]
pub struct RegistryStatus {
    /// Total number of catalog entries.
    pub total_entries: usize,
    /// Per-source refresh status.
    pub sources: Vec<SourceRefreshStatus>,
    /// Most recent refresh attempt across all sources.
    pub last_refresh_attempt: Option<DateTime<Utc>>,
    /// Cache file location.
    pub cache_path: PathBuf,
}

/// Versioned on-disk envelope for the entry cache.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntries {
    version: u32,
    updated_at: DateTime<Utc>,
    entries: Vec<RegistryEntry>,
}

/// Central catalog of MCP server candidates.
pub struct Registry {
    entries: RwLock<BTreeMap<String, RegistryEntry>>,
    status: RwLock<HashMap<SourceType, SourceRefreshStatus>>,
    cache_path: PathBuf,
}

impl Registry {
    /// Create a registry persisting its cache to `cache_path`, loading any
    /// existing cache leniently (bad records are logged and skipped).
    pub fn open(cache_path: impl Into<PathBuf>) -> Self {
        let cache_path = cache_path.into();
        let mut entries = BTreeMap::new();

        match Self::read_cache(&cache_path) {
            Ok(Some(cached)) => {
                for entry in cached {
                    match entry.normalized() {
                        Ok(entry) => {
                            entries.insert(entry.id.clone(), entry);
                        }
                        Err(err) => warn!(error = %err, "skipping invalid cached entry"),
                    }
                }
                info!(count = entries.len(), "loaded registry cache");
            }
            Ok(None) => info!("no registry cache found"),
            Err(err) => warn!(error = %err, "failed to load registry cache"),
        }

        Self {
            entries: RwLock::new(entries),
            status: RwLock::new(HashMap::new()),
            cache_path,
        }
    }

    fn read_cache(path: &Path) -> Result<Option<Vec<RegistryEntry>>, RegistryError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let envelope: PersistedEntries = serde_json::from_str(&contents)?;
        if envelope.version != CACHE_VERSION {
            warn!(version = envelope.version, "ignoring cache with unsupported version");
            return Ok(None);
        }
        Ok(Some(envelope.entries))
    }

    /// Cache file location.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Add or replace one entry (normalized on intake) and persist.
    pub async fn upsert(&self, entry: RegistryEntry) -> Result<(), RegistryError> {
        self.bulk_upsert(vec![entry]).await;
        Ok(())
    }

    /// Add or replace many entries; invalid records are logged and skipped.
    /// Persists once. Returns the number of entries accepted.
    pub async fn bulk_upsert(&self, entries: Vec<RegistryEntry>) -> usize {
        let mut accepted = 0;
        {
            let mut map = self.entries.write().await;
            for entry in entries {
                match entry.normalized() {
                    Ok(entry) => {
                        map.insert(entry.id.clone(), entry);
                        accepted += 1;
                    }
                    Err(err) => warn!(error = %err, "rejecting catalog entry"),
                }
            }
            if let Err(err) = self.persist_locked(&map) {
                warn!(error = %err, "failed to persist registry cache");
            }
        }
        accepted
    }

    /// Look up an entry by id.
    pub async fn get(&self, entry_id: &str) -> Option<RegistryEntry> {
        self.entries.read().await.get(entry_id).cloned()
    }

    /// List up to `limit` entries in id order.
    pub async fn list(&self, limit: usize) -> Vec<RegistryEntry> {
        self.entries
            .read()
            .await
            .values()
            .take(limit)
            .cloned()
            .collect()
    }

    /// All entries from one source.
    pub async fn by_source(&self, source: SourceType) -> Vec<RegistryEntry> {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.source == source)
            .cloned()
            .collect()
    }

    /// Number of entries in the catalog.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the catalog is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Search the catalog with filters and weighted scoring.
    pub async fn search(&self, query: &SearchQuery) -> Vec<RegistryEntry> {
        let entries = self.entries.read().await;
        search::search(entries.values(), query)
    }

    /// Status of one source.
    pub async fn source_status(&self, source: SourceType) -> Option<SourceRefreshStatus> {
        self.status.read().await.get(&source).cloned()
    }

    /// Record the status of a source.
    pub async fn set_source_status(&self, status: SourceRefreshStatus) {
        self.status
            .write()
            .await
            .insert(status.source_type, status);
    }

    /// Aggregate statistics.
    pub async fn status(&self) -> RegistryStatus {
        let total_entries = self.entries.read().await.len();
        let status = self.status.read().await;
        let mut sources: Vec<SourceRefreshStatus> = status.values().cloned().collect();
        sources.sort_by_key(|s| s.source_type.to_string());
        let last_refresh_attempt = sources.iter().filter_map(|s| s.last_attempt).max();
        RegistryStatus {
            total_entries,
            sources,
            last_refresh_attempt,
            cache_path: self.cache_path.clone(),
        }
    }

    fn persist_locked(
        &self,
        entries: &BTreeMap<String, RegistryEntry>,
    ) -> Result<(), RegistryError> {
        let envelope = PersistedEntries {
            version: CACHE_VERSION,
            updated_at: Utc::now(),
            entries: entries.values().cloned().collect(),
        };
        let contents = serde_json::to_string_pretty(&envelope)?;
        write_atomic(&self.cache_path, &contents)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
