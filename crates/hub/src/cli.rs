// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{HubConfig, TransportDeathPolicy};

/// Aggregating MCP registry and runtime proxy
#[derive(Parser, Clone, Debug)]
#[command(name = "mcphub", version, about = "Aggregating MCP registry and runtime proxy")]
pub struct Cli {
    /// Cache directory (entry cache and active-mount state)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Container engine binary
    #[arg(long)]
    pub engine: Option<String>,

    /// Tool call deadline in milliseconds
    #[arg(long, value_name = "MS")]
    pub call_timeout_ms: Option<u64>,

    /// How often the refresh scheduler wakes, in hours
    #[arg(long, value_name = "HOURS")]
    pub refresh_wake_hours: Option<u64>,

    /// Per-source minimum refresh interval, in hours
    #[arg(long, value_name = "HOURS")]
    pub refresh_min_hours: Option<u64>,

    /// What to do with a mount whose child transport died
    #[arg(long, value_enum)]
    pub on_transport_closed: Option<TransportDeathPolicy>,

    /// Skip replaying persisted mounts on startup
    #[arg(long)]
    pub no_replay: bool,

    /// Log filter (overrides RUST_LOG)
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

impl Cli {
    /// Layer CLI overrides over an assembled config.
    pub fn apply(&self, config: &mut HubConfig) {
        if let Some(ref dir) = self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(ref engine) = self.engine {
            config.engine = engine.clone();
        }
        if let Some(ms) = self.call_timeout_ms {
            config.timeouts.call = std::time::Duration::from_millis(ms);
        }
        if let Some(hours) = self.refresh_wake_hours {
            config.refresh_wake = std::time::Duration::from_secs(hours * 3600);
        }
        if let Some(hours) = self.refresh_min_hours {
            config.refresh_min_interval = std::time::Duration::from_secs(hours * 3600);
        }
        if let Some(policy) = self.on_transport_closed {
            config.on_transport_closed = policy;
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
