// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration.
//!
//! Defaults, overridden by `MCPHUB_*` environment variables, overridden in
//! turn by CLI flags (applied in `main`).

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::env;
use crate::mcp::SessionTimeouts;

/// What to do with a mount whose child transport has died.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum TransportDeathPolicy {
    /// Surface `TransportClosed` per call; the mount stays active.
    #[default]
    Surface,
    /// Additionally schedule a deactivate when a call observes the dead
    /// transport. There is no background health probe either way.
    Unmount,
}

impl TransportDeathPolicy {
    /// Parse the configuration tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "surface" => Some(TransportDeathPolicy::Surface),
            "unmount" => Some(TransportDeathPolicy::Unmount),
            _ => None,
        }
    }
}

/// Assembled runtime configuration.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Directory holding the entry cache and the active-mount state file.
    pub cache_dir: PathBuf,
    /// Container engine binary.
    pub engine: String,
    /// Per-operation session deadlines.
    pub timeouts: SessionTimeouts,
    /// Grace period before a child is force-terminated.
    pub teardown_grace: Duration,
    /// How often the refresh scheduler wakes.
    pub refresh_wake: Duration,
    /// Per-source minimum interval between refreshes.
    pub refresh_min_interval: Duration,
    /// Dead-transport policy.
    pub on_transport_closed: TransportDeathPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mcphub");
        Self {
            cache_dir,
            engine: "podman".to_string(),
            timeouts: SessionTimeouts::default(),
            teardown_grace: Duration::from_secs(5),
            refresh_wake: Duration::from_secs(6 * 3600),
            refresh_min_interval: Duration::from_secs(24 * 3600),
            on_transport_closed: TransportDeathPolicy::Surface,
        }
    }
}

impl HubConfig {
    /// Defaults with `MCPHUB_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = env::cache_dir() {
            config.cache_dir = dir;
        }
        if let Some(engine) = env::engine() {
            config.engine = engine;
        }
        if let Some(ms) = env::init_timeout_ms() {
            config.timeouts.initialize = Duration::from_millis(ms);
        }
        if let Some(ms) = env::list_timeout_ms() {
            config.timeouts.list = Duration::from_millis(ms);
        }
        if let Some(ms) = env::call_timeout_ms() {
            config.timeouts.call = Duration::from_millis(ms);
        }
        if let Some(ms) = env::teardown_grace_ms() {
            config.teardown_grace = Duration::from_millis(ms);
        }
        if let Some(hours) = env::refresh_wake_hours() {
            config.refresh_wake = Duration::from_secs(hours * 3600);
        }
        if let Some(hours) = env::refresh_min_hours() {
            config.refresh_min_interval = Duration::from_secs(hours * 3600);
        }
        if let Some(tag) = env::on_transport_closed() {
            if let Some(policy) = TransportDeathPolicy::parse(&tag) {
                config.on_transport_closed = policy;
            }
        }
        config
    }

    /// Location of the active-mount state file.
    pub fn mounts_path(&self) -> PathBuf {
        self.cache_dir.join("active_mounts.json")
    }

    /// Location of the entry cache.
    pub fn entries_path(&self) -> PathBuf {
        self.cache_dir.join("registry_entries.json")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
