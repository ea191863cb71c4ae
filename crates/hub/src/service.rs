// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! High-level registry operations, rendered for a text tool surface.
//!
//! These are the operations an embedding MCP server exposes as its static
//! tools: search the catalog, activate and deactivate servers, inspect and
//! reconfigure active mounts, and drive refreshes.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::mounts::{ActivateRequest, MountError, Orchestrator, StoreError};
use crate::registry::{RefreshScheduler, Registry, SearchQuery, SourceType};

/// Environment variable prefixes accepted by `config_set`.
pub const ALLOWED_ENV_PREFIXES: &[&str] = &[
    "API_KEY", "API_TOKEN", "AUTH_", "DATABASE_", "DB_", "GITHUB_", "OPENAI_", "ANTHROPIC_",
    "AWS_", "AZURE_", "GCP_", "SLACK_", "DISCORD_", "NOTION_", "MCP_",
];

/// Errors surfaced by the service facade.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// An environment key falls outside the allowlist.
    #[error("environment variable '{0}' is not allowlisted")]
    EnvNotAllowed(String),

    /// Activation/deactivation failed.
    #[error(transparent)]
    Mount(#[from] MountError),

    /// State persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Facade over the registry, orchestrator, and refresh scheduler.
pub struct RegistryService {
    registry: Arc<Registry>,
    orchestrator: Arc<Orchestrator>,
    scheduler: Arc<RefreshScheduler>,
}

impl RegistryService {
    /// Wire the facade over its subsystems.
    pub fn new(
        registry: Arc<Registry>,
        orchestrator: Arc<Orchestrator>,
        scheduler: Arc<RefreshScheduler>,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            scheduler,
        }
    }

    /// Search the catalog; renders a markdown result list.
    pub async fn find(&self, query: SearchQuery) -> String {
        let text = query.query.clone();
        let results = self.registry.search(&query).await;
        if results.is_empty() {
            return format!("No servers found matching query: {text}");
        }

        let mut out = format!("# Found {} matching servers\n", results.len());
        for (i, entry) in results.iter().enumerate() {
            let _ = write!(out, "\n## {}. {}\n", i + 1, entry.name);
            let _ = writeln!(out, "**ID:** `{}`", entry.id);
            let _ = writeln!(out, "**Source:** {}", entry.source);
            let _ = writeln!(out, "**Description:** {}", entry.description);
            if !entry.categories.is_empty() {
                let _ = writeln!(out, "**Categories:** {}", entry.categories.join(", "));
            }
            if !entry.tags.is_empty() {
                let shown: Vec<&str> =
                    entry.tags.iter().take(5).map(String::as_str).collect();
                let _ = writeln!(out, "**Tags:** {}", shown.join(", "));
            }
            let flags = entry_flags(entry);
            if !flags.is_empty() {
                let _ = writeln!(out, "**Flags:** {}", flags.join(", "));
            }
            if let Some(ref repo) = entry.repo_url {
                let _ = writeln!(out, "**Repository:** {repo}");
            }
            if let Some(ref image) = entry.container_image {
                let _ = writeln!(out, "**Image:** {image}");
            }
        }
        out
    }

    /// List catalog entries, optionally filtered by source.
    pub async fn list(&self, source: Option<SourceType>, limit: usize) -> String {
        let limit = limit.clamp(1, 200);
        let entries = match source {
            Some(source) => self.registry.by_source(source).await,
            None => self.registry.list(limit).await,
        };

        let mut out = format!("# Registry listing ({} servers)\n", entries.len());
        for entry in entries.iter().take(limit) {
            let flags = entry_flags(entry);
            let flag_str = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            let description: String = entry.description.chars().take(100).collect();
            let _ = writeln!(
                out,
                "- **{}** (`{}`){flag_str} - {description}",
                entry.name, entry.id
            );
        }
        if entries.len() > limit {
            let _ = writeln!(out, "\n*({} more servers available)*", entries.len() - limit);
        }
        out
    }

    /// Activate a server; renders a confirmation with activation details.
    pub async fn add(&self, request: ActivateRequest) -> Result<String, ServiceError> {
        let mount = self.orchestrator.activate(request).await?;
        let handle = mount
            .handle
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        Ok(format!(
            "Successfully activated: {}\n\n\
             **Handle:** {handle}\n\
             **Prefix:** {}\n\
             **Tools:** {}\n\n\
             Tools are exposed as `mcp_{}_<tool>`.\n\
             Use `config_set` to stage environment variables for the next restart.",
            mount.name,
            mount.prefix,
            mount.tools.len(),
            mount.prefix,
        ))
    }

    /// Deactivate a server.
    pub async fn remove(&self, entry_id: &str) -> Result<String, ServiceError> {
        let mount = self.orchestrator.deactivate(entry_id).await?;
        Ok(format!("Successfully deactivated: {}", mount.name))
    }

    /// Render all active mounts.
    pub async fn active(&self) -> String {
        let mounts = self.orchestrator.store().list().await;
        if mounts.is_empty() {
            return "No active servers.".to_string();
        }

        let mut out = format!("# Active servers ({})\n", mounts.len());
        for mount in mounts {
            let _ = write!(out, "\n## {}\n", mount.name);
            let _ = writeln!(out, "**ID:** `{}`", mount.entry_id);
            let _ = writeln!(out, "**Prefix:** `{}`", mount.prefix);
            if let Some(ref handle) = mount.handle {
                let _ = writeln!(out, "**Handle:** {handle}");
            }
            if !mount.environment.is_empty() {
                let keys: Vec<&str> = mount.environment.keys().map(String::as_str).collect();
                let _ = writeln!(out, "**Environment:** {}", keys.join(", "));
            }
            if !mount.tools.is_empty() {
                let _ = writeln!(out, "**Tools:** {} available", mount.tools.len());
            }
            let _ = writeln!(
                out,
                "**Mounted at:** {}",
                mount.mounted_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        out
    }

    /// Stage environment variables for an active mount.
    ///
    /// Only allowlisted key prefixes are accepted. Changes are persisted but
    /// take effect on the next activate; the running child is untouched.
    pub async fn config_set(
        &self,
        entry_id: &str,
        environment: BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        validate_environment_keys(&environment)?;

        let updated = self
            .orchestrator
            .store()
            .update_environment(entry_id, environment.clone())
            .await?
            .ok_or_else(|| MountError::EntryNotFound(entry_id.to_string()))?;

        let keys: Vec<&str> = environment.keys().map(String::as_str).collect();
        Ok(format!(
            "Configuration updated for {}\n\n\
             **Environment variables set:** {}\n\n\
             Changes take effect on the next restart: use `remove` followed by `add`.",
            updated.name,
            keys.join(", "),
        ))
    }

    /// Force-refresh one source or all of them.
    pub async fn refresh(&self, source: Option<SourceType>, override_interval: bool) -> String {
        let sources: Vec<SourceType> = match source {
            Some(source) => vec![source],
            None => vec![
                SourceType::Docker,
                SourceType::Mcpservers,
                SourceType::McpOfficial,
            ],
        };

        let mut out = "# Refresh results\n\n".to_string();
        for source in sources {
            let refreshed = self.scheduler.force_refresh(source, override_interval).await;
            let status = if refreshed { "Success" } else { "Skipped or failed" };
            let _ = writeln!(out, "- {source}: {status}");
        }
        out
    }

    /// Render registry status and statistics.
    pub async fn status(&self) -> String {
        let status = self.registry.status().await;
        let active = self.orchestrator.store().len().await;

        let mut out = "# Registry status\n\n".to_string();
        let _ = writeln!(out, "**Total entries:** {}", status.total_entries);
        let _ = writeln!(out, "**Active mounts:** {active}");
        let _ = writeln!(out, "**Cache file:** {}", status.cache_path.display());
        if let Some(last) = status.last_refresh_attempt {
            let _ = writeln!(out, "**Last refresh:** {}", last.format("%Y-%m-%d %H:%M:%S"));
        }

        if !status.sources.is_empty() {
            let _ = writeln!(out, "\n## Sources");
            for source in status.sources {
                let _ = write!(out, "\n### {}\n", source.source_type);
                let _ = writeln!(out, "**Entries:** {}", source.entry_count);
                let _ = writeln!(out, "**Status:** {}", source.state);
                if let Some(last) = source.last_refresh {
                    let _ = writeln!(out, "**Last refresh:** {}", last.to_rfc3339());
                }
                if let Some(ref message) = source.error_message {
                    let _ = writeln!(out, "**Error:** {message}");
                }
            }
        }
        out
    }
}

/// Check every key against the allowlisted prefixes.
pub fn validate_environment_keys(
    environment: &BTreeMap<String, String>,
) -> Result<(), ServiceError> {
    for key in environment.keys() {
        let upper = key.to_uppercase();
        if !ALLOWED_ENV_PREFIXES
            .iter()
            .any(|prefix| upper.starts_with(prefix))
        {
            return Err(ServiceError::EnvNotAllowed(key.clone()));
        }
    }
    Ok(())
}

fn entry_flags(entry: &crate::registry::RegistryEntry) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if entry.official {
        flags.push("Official");
    }
    if entry.featured {
        flags.push("Featured");
    }
    if entry.requires_api_key {
        flags.push("Requires API Key");
    }
    flags
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
