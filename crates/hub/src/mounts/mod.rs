// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Active mounts: the bookkeeping side of a running child MCP server.

pub mod clients;
pub mod orchestrator;
pub mod store;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mcp::ChildHandle;

pub use clients::ClientManager;
pub use orchestrator::{ActivateRequest, MountError, Orchestrator};
pub use store::{MountStore, StoreError};

/// A currently mounted child MCP server.
///
/// Created when an entry is activated. The live handle is excluded from
/// persistence; replay re-spawns the child and re-runs discovery rather than
/// trusting persisted surfaces.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActiveMount {
    /// Registry entry id, unique across active mounts.
    pub entry_id: String,
    /// Display name copied from the entry.
    pub name: String,
    /// Namespace token, unique across active mounts; every registered tool
    /// is named `mcp_<prefix>_<tool>`.
    pub prefix: String,
    /// Handle of the running child. `None` only on records loaded from disk.
    #[serde(skip)]
    pub handle: Option<ChildHandle>,
    /// Environment passed to the child. Mutations take effect only after
    /// the mount is torn down and recreated.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Discovered tool short-names, in discovery order.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Discovered resource identifiers (display only; not routed).
    #[serde(default)]
    pub resources: Vec<String>,
    /// Discovered prompt names (display only; not routed).
    #[serde(default)]
    pub prompts: Vec<String>,
    /// When the server was activated.
    pub mounted_at: DateTime<Utc>,
}

/// Derive the default prefix from an entry id: the last `/`-separated
/// segment with `-` replaced by `_`.
pub fn derive_prefix(entry_id: &str) -> String {
    entry_id
        .rsplit('/')
        .next()
        .unwrap_or(entry_id)
        .replace('-', "_")
}

/// Full registered name for one of a mount's tools.
pub fn full_tool_name(prefix: &str, tool: &str) -> String {
    format!("mcp_{prefix}_{tool}")
}
