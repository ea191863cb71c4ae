// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The per-tool callable registered on the aggregator.
//!
//! An invocable holds no state beyond its parameter metadata and the handle
//! of the session it executes through. It is created at activation and
//! removed at deactivation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::debug;

use super::registry::{InvokeError, ToolInvoker, ToolRegistration};
use super::schema::{build_arguments, ToolSurface};
use crate::mcp::{ChildHandle, SessionError};
use crate::mounts::{full_tool_name, ClientManager};

/// Executor for one routed tool.
pub struct ToolInvocable {
    entry_id: String,
    tool_name: String,
    surface: ToolSurface,
    handle: ChildHandle,
    clients: Arc<ClientManager>,
    call_timeout: Duration,
    /// When the transport-death policy is `unmount`, a call observing a
    /// closed transport reports its entry id here for lazy deactivation.
    death_reports: Option<mpsc::UnboundedSender<String>>,
}

impl ToolInvocable {
    /// Build the registration for one translated tool of a mount.
    pub fn registration(
        entry_id: &str,
        prefix: &str,
        surface: ToolSurface,
        handle: ChildHandle,
        clients: Arc<ClientManager>,
        call_timeout: Duration,
        death_reports: Option<mpsc::UnboundedSender<String>>,
    ) -> ToolRegistration {
        let full_name = full_tool_name(prefix, &surface.tool_name);
        let description = surface.description.clone();
        let params = surface.params.clone();
        let invocable = Self {
            entry_id: entry_id.to_string(),
            tool_name: surface.tool_name.clone(),
            surface,
            handle,
            clients,
            call_timeout,
            death_reports,
        };
        ToolRegistration {
            full_name,
            description,
            params,
            invoker: Arc::new(invocable),
        }
    }
}

#[async_trait]
impl ToolInvoker for ToolInvocable {
    async fn invoke(&self, kwargs: Map<String, Value>) -> Result<String, InvokeError> {
        let arguments = build_arguments(&self.surface.params, &kwargs);

        let session = self
            .clients
            .session(&self.handle)
            .await
            .ok_or_else(|| InvokeError::SessionGone(self.handle.to_string()))?;

        match session
            .call_tool_with_timeout(&self.tool_name, arguments, self.call_timeout)
            .await
        {
            Ok(result) => Ok(result.into_text()),
            Err(err) => {
                if matches!(err, SessionError::TransportClosed) {
                    if let Some(reports) = &self.death_reports {
                        debug!(entry = %self.entry_id, "reporting dead transport for unmount");
                        let _ = reports.send(self.entry_id.clone());
                    }
                }
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
#[path = "invocable_tests.rs"]
mod tests;
