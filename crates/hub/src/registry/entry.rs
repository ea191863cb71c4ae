// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized catalog records for MCP server candidates.
//!
//! Entries are produced by upstream catalog sources, validated and
//! normalized on intake, and read-only everywhere else.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Characters permitted in an entry id (after lowercasing).
const ID_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz0123456789-_/";

/// Errors raised when normalizing an entry on intake.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    /// The id is empty.
    #[error("entry id cannot be empty")]
    EmptyId,

    /// The id contains characters outside the slug charset.
    #[error("entry id must contain only lowercase alphanumerics, '-', '_' and '/': {0}")]
    InvalidId(String),

    /// The container image reference fails the basic shape check.
    #[error("invalid container image reference: {0}")]
    InvalidImage(String),
}

/// Origin of a catalog record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    /// Docker's MCP catalog.
    Docker,
    /// mcpservers.org community catalog.
    Mcpservers,
    /// The official MCP registry.
    McpOfficial,
    /// Awesome-list style catalogs.
    Awesome,
    /// Locally added entries.
    Custom,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            SourceType::Docker => "docker",
            SourceType::Mcpservers => "mcpservers",
            SourceType::McpOfficial => "mcp-official",
            SourceType::Awesome => "awesome",
            SourceType::Custom => "custom",
        };
        f.write_str(tag)
    }
}

impl SourceType {
    /// Parse the wire tag back into a source type.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "docker" => Some(SourceType::Docker),
            "mcpservers" => Some(SourceType::Mcpservers),
            "mcp-official" => Some(SourceType::McpOfficial),
            "awesome" => Some(SourceType::Awesome),
            "custom" => Some(SourceType::Custom),
            _ => None,
        }
    }
}

/// How an entry's server is launched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LaunchMethod {
    /// Containerized, run through the engine.
    Podman,
    /// Direct command with stdio pipes.
    StdioProxy,
    /// Remote HTTP transport. Declared but not implemented; activation
    /// fails with a launch error.
    RemoteHttp,
    /// Launch method could not be determined from the catalog.
    #[default]
    Unknown,
}

/// Command configuration for stdio-proxy entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCommand {
    /// Executable to run (e.g. `npx`, `python`).
    pub command: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables for the server process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Normalized MCP server catalog entry.
///
/// Immutable once in the registry; only the catalog refresher replaces
/// entries, and it does so wholesale.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Stable slug identifier, unique across the registry.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Origin catalog.
    pub source: SourceType,
    /// Source code repository URL.
    #[serde(default)]
    pub repo_url: Option<String>,
    /// Container image reference (e.g. `docker.io/mcp/postgres`).
    #[serde(default)]
    pub container_image: Option<String>,
    /// Functional categories, ordered.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Searchable tags, ordered, deduplicated on intake.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Official status.
    #[serde(default)]
    pub official: bool,
    /// Featured status.
    #[serde(default)]
    pub featured: bool,
    /// Whether API credentials are needed.
    #[serde(default)]
    pub requires_api_key: bool,
    /// Preferred launch method.
    #[serde(default)]
    pub launch_method: LaunchMethod,
    /// Command configuration for stdio-proxy entries.
    #[serde(default)]
    pub server_command: Option<ServerCommand>,
    /// Last metadata update timestamp.
    #[serde(default = "Utc::now")]
    pub last_refreshed: DateTime<Utc>,
    /// Original source metadata, kept for debugging.
    #[serde(default)]
    pub raw_metadata: BTreeMap<String, Value>,
}

impl RegistryEntry {
    /// Validate and normalize an entry on intake: lowercase the id, enforce
    /// the slug charset, sanity-check the image reference, and deduplicate
    /// tags preserving first occurrence order.
    pub fn normalized(mut self) -> Result<Self, EntryError> {
        if self.id.is_empty() {
            return Err(EntryError::EmptyId);
        }
        self.id = self.id.to_lowercase();
        if !self.id.chars().all(|c| ID_CHARSET.contains(c)) {
            return Err(EntryError::InvalidId(self.id));
        }

        if let Some(ref image) = self.container_image {
            // Minimal shape check: a usable reference carries a registry
            // path or a tag separator.
            if !image.contains('/') && !image.contains(':') {
                return Err(EntryError::InvalidImage(image.clone()));
            }
        }

        let mut seen = std::collections::HashSet::new();
        self.tags.retain(|tag| seen.insert(tag.clone()));

        Ok(self)
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
