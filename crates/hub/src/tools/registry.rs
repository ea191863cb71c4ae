// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic tool registry over the aggregator's MCP surface.
//!
//! The aggregator framework itself is a collaborator; the hub consumes three
//! operations from it (add, remove, list-changed) through the [`Aggregator`]
//! trait. The registry keeps a side-table from mount handle to registered
//! names so deactivation removes exactly what activation added.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::warn;

use super::schema::ParamSpec;
use crate::mcp::ChildHandle;

/// Errors returned by the consumed aggregator surface.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// A tool with this name is already registered. Registration never
    /// silently overwrites.
    #[error("tool '{0}' is already registered")]
    DuplicateName(String),

    /// The aggregator refused the operation for some other reason.
    #[error("aggregator refused operation: {0}")]
    Rejected(String),
}

/// Errors surfaced while invoking a routed tool.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The mount's session is no longer registered with the client manager.
    #[error("no live session for {0}")]
    SessionGone(String),

    /// The underlying session call failed.
    #[error(transparent)]
    Session(#[from] crate::mcp::SessionError),
}

/// Executor closure of a registered tool: kwargs in, text out.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke the tool with kwargs matching its parameter surface.
    async fn invoke(&self, kwargs: Map<String, Value>) -> Result<String, InvokeError>;
}

/// Everything the aggregator needs to expose one routed tool.
pub struct ToolRegistration {
    /// Full name, `mcp_<prefix>_<tool>`.
    pub full_name: String,
    /// Description copied from the tool definition.
    pub description: String,
    /// Parameter descriptors for the aggregator surface.
    pub params: Vec<ParamSpec>,
    /// Executor invoked on calls.
    pub invoker: Arc<dyn ToolInvoker>,
}

impl std::fmt::Debug for ToolRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistration")
            .field("full_name", &self.full_name)
            .field("params", &self.params.len())
            .finish_non_exhaustive()
    }
}

/// The consumed aggregator surface.
///
/// `send_tool_list_changed` is a request, not a guarantee: implementations
/// silently skip emission when no client request context is active.
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Register a tool on the aggregator's own MCP surface.
    async fn add_tool(&self, registration: ToolRegistration) -> Result<(), AggregatorError>;

    /// Remove a previously registered tool.
    async fn remove_tool(&self, full_name: &str) -> Result<(), AggregatorError>;

    /// Ask the aggregator to notify its client that the tool set changed.
    async fn send_tool_list_changed(&self);
}

/// Error from a failed bulk registration (the failing name is reported; all
/// names registered before it have already been rolled back).
#[derive(Debug, thiserror::Error)]
#[error("registration of '{name}' failed: {source}")]
pub struct RegistrationError {
    /// The name whose registration failed.
    pub name: String,
    /// The aggregator's refusal.
    #[source]
    pub source: AggregatorError,
}

/// Tracks which full names each mount has registered.
pub struct DynamicToolRegistry {
    aggregator: Arc<dyn Aggregator>,
    by_mount: Mutex<HashMap<ChildHandle, Vec<String>>>,
}

impl DynamicToolRegistry {
    /// Create a registry over the given aggregator surface.
    pub fn new(aggregator: Arc<dyn Aggregator>) -> Self {
        Self {
            aggregator,
            by_mount: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying aggregator surface.
    pub fn aggregator(&self) -> &Arc<dyn Aggregator> {
        &self.aggregator
    }

    /// Register a mount's tools, all or nothing.
    ///
    /// On any failure the names registered so far are unregistered again and
    /// the error is returned; the side-table is only updated on full success.
    pub async fn register_mount(
        &self,
        handle: &ChildHandle,
        registrations: Vec<ToolRegistration>,
    ) -> Result<Vec<String>, RegistrationError> {
        let mut registered: Vec<String> = Vec::with_capacity(registrations.len());

        for registration in registrations {
            let name = registration.full_name.clone();
            if let Err(source) = self.aggregator.add_tool(registration).await {
                for prior in &registered {
                    if let Err(err) = self.aggregator.remove_tool(prior).await {
                        warn!(tool = %prior, error = %err, "rollback unregister failed");
                    }
                }
                return Err(RegistrationError { name, source });
            }
            registered.push(name);
        }

        self.by_mount
            .lock()
            .await
            .insert(handle.clone(), registered.clone());
        Ok(registered)
    }

    /// Unregister everything a mount registered. Individual failures are
    /// logged and skipped; returns the names that were removed from the
    /// side-table.
    pub async fn unregister_mount(&self, handle: &ChildHandle) -> Vec<String> {
        let names = self
            .by_mount
            .lock()
            .await
            .remove(handle)
            .unwrap_or_default();
        for name in &names {
            if let Err(err) = self.aggregator.remove_tool(name).await {
                warn!(tool = %name, error = %err, "unregister failed");
            }
        }
        names
    }

    /// Names currently registered for a mount.
    pub async fn names_for(&self, handle: &ChildHandle) -> Vec<String> {
        self.by_mount
            .lock()
            .await
            .get(handle)
            .cloned()
            .unwrap_or_default()
    }

    /// Request a `notifications/tools/list_changed` emission.
    pub async fn request_list_changed(&self) {
        self.aggregator.send_tool_list_changed().await;
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
