// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Activation and deactivation of mounts.
//!
//! The orchestrator composes launcher, session, translator, dynamic registry,
//! store and client manager into the end-to-end mount flows. Every failure
//! edge is recovered locally: a failed activation leaves no session, no
//! registered tools, no store record, and no running child.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{derive_prefix, ActiveMount, ClientManager, MountStore};
use crate::config::{HubConfig, TransportDeathPolicy};
use crate::mcp::{
    LaunchSpec, Launcher, McpSession, SessionError, SessionTimeouts, SpawnedChild,
};
use crate::registry::{LaunchMethod, Registry};
use crate::tools::{translate, DynamicToolRegistry, ToolInvocable, ToolSurface};

/// Errors surfaced by activation and deactivation.
///
/// Everything up to and including registration rollback is recovered
/// locally: the caller gets a clean failure and system state is as if the
/// operation never started.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    /// Unknown entry id.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// The entry is already mounted.
    #[error("entry already active: {0}")]
    AlreadyActive(String),

    /// Requested or derived prefix collides with an active mount.
    #[error("prefix '{0}' is already in use")]
    PrefixConflict(String),

    /// Container engine error or command spawn error.
    #[error("launch failed for {entry}: {reason}")]
    LaunchFailed {
        /// Entry being activated.
        entry: String,
        /// One-line cause.
        reason: String,
    },

    /// The child rejected the `initialize` handshake.
    #[error("initialize failed for {entry}: {reason}")]
    InitFailed {
        /// Entry being activated.
        entry: String,
        /// One-line cause.
        reason: String,
    },

    /// A deadline elapsed during activation.
    #[error("timed out during {phase} for {entry}")]
    Timeout {
        /// Entry being activated.
        entry: String,
        /// Activation phase that timed out.
        phase: &'static str,
    },

    /// `tools/list` failed (resources/prompts failures are not fatal).
    #[error("tool discovery failed for {entry}: {reason}")]
    DiscoveryFailed {
        /// Entry being activated.
        entry: String,
        /// One-line cause.
        reason: String,
    },

    /// The aggregator refused a registration; partial registrations were
    /// rolled back.
    #[error("tool registration failed for {entry}: {reason}")]
    RegistrationFailed {
        /// Entry being activated.
        entry: String,
        /// One-line cause.
        reason: String,
    },

    /// State persistence failed.
    #[error("state persistence failed: {0}")]
    Store(#[from] super::StoreError),
}

/// Inputs to an activation.
#[derive(Clone, Debug, Default)]
pub struct ActivateRequest {
    /// Entry to activate.
    pub entry_id: String,
    /// Namespace prefix; derived from the entry id when absent.
    pub prefix: Option<String>,
    /// Environment overrides layered over the entry's own environment.
    pub environment: BTreeMap<String, String>,
    /// Launch-method override for ambiguous entries.
    pub launch_method: Option<LaunchMethod>,
}

impl ActivateRequest {
    /// Activate an entry with defaults everywhere.
    pub fn entry(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            ..Self::default()
        }
    }
}

/// Composes the mount subsystems into activate/deactivate/replay flows.
pub struct Orchestrator {
    registry: Arc<Registry>,
    store: Arc<MountStore>,
    clients: Arc<ClientManager>,
    tools: Arc<DynamicToolRegistry>,
    launcher: Launcher,
    timeouts: SessionTimeouts,
    teardown_grace: Duration,
    death_policy: TransportDeathPolicy,
    death_tx: mpsc::UnboundedSender<String>,
    death_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl Orchestrator {
    /// Wire the orchestrator over its collaborators.
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<MountStore>,
        clients: Arc<ClientManager>,
        tools: Arc<DynamicToolRegistry>,
        config: &HubConfig,
    ) -> Arc<Self> {
        let (death_tx, death_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            registry,
            store,
            clients,
            tools,
            launcher: Launcher::new(config.engine.clone()),
            timeouts: config.timeouts,
            teardown_grace: config.teardown_grace,
            death_policy: config.on_transport_closed,
            death_tx,
            death_rx: parking_lot::Mutex::new(Some(death_rx)),
        })
    }

    /// The active-mount store.
    pub fn store(&self) -> &Arc<MountStore> {
        &self.store
    }

    /// The client manager.
    pub fn clients(&self) -> &Arc<ClientManager> {
        &self.clients
    }

    /// Activate an entry end-to-end: spawn, handshake, discover, translate,
    /// register, persist, notify.
    pub async fn activate(&self, request: ActivateRequest) -> Result<ActiveMount, MountError> {
        let entry_id = request.entry_id.clone();
        let entry = self
            .registry
            .get(&entry_id)
            .await
            .ok_or_else(|| MountError::EntryNotFound(entry_id.clone()))?;

        // Serialize activate/deactivate per entry id.
        let lock = self.store.entry_lock(&entry_id);
        let _guard = lock.lock().await;

        if self.store.get(&entry_id).await.is_some() {
            return Err(MountError::AlreadyActive(entry_id));
        }

        let prefix = request
            .prefix
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| derive_prefix(&entry_id));

        // Claim the prefix up front so a concurrent activation deriving the
        // same prefix fails here, not at registration time.
        self.store
            .reserve_prefix(&prefix, &entry_id)
            .await
            .map_err(|_| MountError::PrefixConflict(prefix.clone()))?;

        let result = self
            .activate_reserved(&entry, &request, &entry_id, &prefix)
            .await;
        if result.is_err() {
            self.store.release_prefix(&prefix, &entry_id).await;
        }
        result
    }

    /// Activation steps that run under a held prefix reservation.
    async fn activate_reserved(
        &self,
        entry: &crate::registry::RegistryEntry,
        request: &ActivateRequest,
        entry_id: &str,
        prefix: &str,
    ) -> Result<ActiveMount, MountError> {
        // Entry environment overlaid with caller-specified values.
        let mut environment = entry
            .server_command
            .as_ref()
            .map(|cmd| cmd.env.clone())
            .unwrap_or_default();
        environment.extend(request.environment.clone());

        let method = request.launch_method.unwrap_or(entry.launch_method);
        let spec = self.launch_spec(entry_id, entry, method, prefix).await?;

        let (child, stdin, stdout) =
            self.launcher
                .spawn(&spec, &environment)
                .await
                .map_err(|err| MountError::LaunchFailed {
                    entry: entry_id.to_string(),
                    reason: err.to_string(),
                })?;
        let handle = child.handle().clone();
        let session = McpSession::new(stdin, stdout, entry_id.to_string(), self.timeouts);

        if let Err(err) = session.initialize().await {
            self.abandon(session, child).await;
            return Err(match err {
                SessionError::Timeout(_) => MountError::Timeout {
                    entry: entry_id.to_string(),
                    phase: "initialize",
                },
                other => MountError::InitFailed {
                    entry: entry_id.to_string(),
                    reason: other.to_string(),
                },
            });
        }

        let tool_defs = match session.list_tools().await {
            Ok(defs) => defs,
            Err(err) => {
                self.abandon(session, child).await;
                return Err(match err {
                    SessionError::Timeout(_) => MountError::Timeout {
                        entry: entry_id.to_string(),
                        phase: "tools/list",
                    },
                    other => MountError::DiscoveryFailed {
                        entry: entry_id.to_string(),
                        reason: other.to_string(),
                    },
                });
            }
        };

        // Resources and prompts are best-effort bookkeeping.
        let resources = match session.list_resources().await {
            Ok(resources) => resources
                .iter()
                .map(|r| r.identifier().to_string())
                .collect(),
            Err(err) => {
                warn!(entry = %entry_id, error = %err, "resources/list failed; treating as empty");
                Vec::new()
            }
        };
        let prompts = match session.list_prompts().await {
            Ok(prompts) => prompts.into_iter().map(|p| p.name).collect(),
            Err(err) => {
                warn!(entry = %entry_id, error = %err, "prompts/list failed; treating as empty");
                Vec::new()
            }
        };

        // Translate; partial surfaces are acceptable.
        let mut surfaces: Vec<ToolSurface> = Vec::with_capacity(tool_defs.len());
        for def in &tool_defs {
            match translate(def) {
                Ok(surface) => surfaces.push(surface),
                Err(err) => {
                    warn!(entry = %entry_id, tool = %def.name, error = %err, "skipping untranslatable tool");
                }
            }
        }
        let tool_names: Vec<String> = surfaces.iter().map(|s| s.tool_name.clone()).collect();

        let death_reports = (self.death_policy == TransportDeathPolicy::Unmount)
            .then(|| self.death_tx.clone());
        let registrations = surfaces
            .into_iter()
            .map(|surface| {
                ToolInvocable::registration(
                    entry_id,
                    prefix,
                    surface,
                    handle.clone(),
                    Arc::clone(&self.clients),
                    self.timeouts.call,
                    death_reports.clone(),
                )
            })
            .collect();

        if let Err(err) = self.tools.register_mount(&handle, registrations).await {
            self.abandon(session, child).await;
            return Err(MountError::RegistrationFailed {
                entry: entry_id.to_string(),
                reason: err.to_string(),
            });
        }

        let mount = ActiveMount {
            entry_id: entry_id.to_string(),
            name: entry.name.clone(),
            prefix: prefix.to_string(),
            handle: Some(handle.clone()),
            environment,
            tools: tool_names,
            resources,
            prompts,
            mounted_at: Utc::now(),
        };

        if let Err(err) = self.store.add(mount.clone()).await {
            // Lost a cross-entry prefix race, or persistence failed.
            self.tools.unregister_mount(&handle).await;
            self.abandon(session, child).await;
            return Err(match err {
                super::StoreError::PrefixInUse(prefix) => MountError::PrefixConflict(prefix),
                super::StoreError::AlreadyMounted(id) => MountError::AlreadyActive(id),
                other => MountError::Store(other),
            });
        }

        self.clients.insert(session, child).await;
        self.tools.request_list_changed().await;

        info!(entry = %entry_id, prefix = %prefix, tools = mount.tools.len(), "mounted server");
        Ok(mount)
    }

    /// Deactivate a mount: unregister its tools, close the session, reap the
    /// child, drop the record, persist, notify.
    pub async fn deactivate(&self, entry_id: &str) -> Result<ActiveMount, MountError> {
        let lock = self.store.entry_lock(entry_id);
        let _guard = lock.lock().await;

        let mount = self
            .store
            .get(entry_id)
            .await
            .ok_or_else(|| MountError::EntryNotFound(entry_id.to_string()))?;

        if let Some(handle) = &mount.handle {
            self.tools.unregister_mount(handle).await;
            self.clients.remove(handle, self.teardown_grace).await;
        }

        self.store.remove(entry_id).await?;
        self.tools.request_list_changed().await;

        info!(entry = %entry_id, "unmounted server");
        Ok(mount)
    }

    /// Replay the persisted mount set on startup.
    ///
    /// Each record re-runs the full activate flow with its stored prefix and
    /// environment; records that fail replay are pruned from the persisted
    /// set. Returns the number of mounts restored.
    pub async fn replay(&self) -> usize {
        let persisted = match self.store.load_persisted() {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "failed to load persisted mounts; starting empty");
                Vec::new()
            }
        };

        let mut restored = 0;
        for record in persisted {
            let request = ActivateRequest {
                entry_id: record.entry_id.clone(),
                prefix: Some(record.prefix.clone()),
                environment: record.environment.clone(),
                launch_method: None,
            };
            match self.activate(request).await {
                Ok(_) => restored += 1,
                Err(err) => {
                    warn!(entry = %record.entry_id, error = %err, "dropping mount that failed replay");
                }
            }
        }

        // Rewrite the file so pruned mounts disappear from disk.
        if let Err(err) = self.store.persist().await {
            warn!(error = %err, "failed to persist mounts after replay");
        }
        restored
    }

    /// When the dead-transport policy is `unmount`, spawn the task that
    /// deactivates mounts whose calls observed a closed transport.
    pub fn spawn_unmount_reaper(self: &Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if self.death_policy != TransportDeathPolicy::Unmount {
            return None;
        }
        let mut rx = self.death_rx.lock().take()?;
        let orchestrator = Arc::clone(self);
        Some(tokio::spawn(async move {
            while let Some(entry_id) = rx.recv().await {
                match orchestrator.deactivate(&entry_id).await {
                    Ok(_) => info!(entry = %entry_id, "unmounted dead server"),
                    Err(MountError::EntryNotFound(_)) => {}
                    Err(err) => warn!(entry = %entry_id, error = %err, "failed to unmount dead server"),
                }
            }
        }))
    }

    /// Stop every running child without touching the persisted set, so a
    /// restart replays the same mounts.
    pub async fn shutdown(&self) {
        for mount in self.store.list().await {
            if let Some(handle) = &mount.handle {
                self.tools.unregister_mount(handle).await;
                self.clients.remove(handle, self.teardown_grace).await;
            }
        }
    }

    async fn launch_spec(
        &self,
        entry_id: &str,
        entry: &crate::registry::RegistryEntry,
        method: LaunchMethod,
        prefix: &str,
    ) -> Result<LaunchSpec, MountError> {
        match method {
            LaunchMethod::Podman => {
                let image = entry.container_image.clone().ok_or_else(|| {
                    MountError::LaunchFailed {
                        entry: entry_id.to_string(),
                        reason: "entry has no container image".to_string(),
                    }
                })?;
                self.launcher
                    .pull(&image)
                    .await
                    .map_err(|err| MountError::LaunchFailed {
                        entry: entry_id.to_string(),
                        reason: err.to_string(),
                    })?;
                Ok(LaunchSpec::Container {
                    image,
                    name: format!("mcp-registry-{prefix}"),
                })
            }
            LaunchMethod::StdioProxy => {
                let command = entry.server_command.clone().ok_or_else(|| {
                    MountError::LaunchFailed {
                        entry: entry_id.to_string(),
                        reason: "entry has no server command".to_string(),
                    }
                })?;
                Ok(LaunchSpec::Command {
                    command: command.command,
                    args: command.args,
                })
            }
            LaunchMethod::RemoteHttp => Err(MountError::LaunchFailed {
                entry: entry_id.to_string(),
                reason: "remote-http transport is not implemented".to_string(),
            }),
            LaunchMethod::Unknown => Err(MountError::LaunchFailed {
                entry: entry_id.to_string(),
                reason: "entry does not declare a launch method".to_string(),
            }),
        }
    }

    /// Tear down a session + child pair that never reached the store.
    async fn abandon(&self, session: Arc<McpSession>, child: SpawnedChild) {
        session.close().await;
        child.teardown(self.teardown_grace).await;
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
