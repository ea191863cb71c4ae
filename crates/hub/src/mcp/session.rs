// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! MCP client session over a child's stdio pipes.
//!
//! A session owns one child's stdin and stdout. A single background reader
//! task drains stdout and completes waiters from a pending-response map;
//! writers share stdin behind a lock. Multiple concurrent calls on the same
//! session are allowed and correlated by id. Lifecycle:
//! *created → initialized → closed*.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::framing::{FrameReader, FrameWriter};
use super::protocol::{
    CallToolParams, CallToolResult, InboundFrame, InitializeParams, InitializeResult, PromptInfo,
    PromptsListResult, ResourceInfo, ResourcesListResult, RpcNotification, RpcRequest, ToolInfo,
    ToolsListResult,
};

/// Per-operation deadlines for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    /// Deadline for the `initialize` handshake.
    pub initialize: Duration,
    /// Deadline for each `*/list` discovery call.
    pub list: Duration,
    /// Default deadline for `tools/call`.
    pub call: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            initialize: Duration::from_secs(30),
            list: Duration::from_secs(30),
            call: Duration::from_secs(15),
        }
    }
}

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Child EOF or write failure; the session is dead.
    #[error("transport closed")]
    TransportClosed,

    /// A deadline elapsed; the session itself continues.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The child answered with a JSON-RPC error.
    #[error("server error {code}: {message}")]
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Human-readable message from the child.
        message: String,
        /// Additional error data.
        data: Option<Value>,
    },

    /// The child's result did not match the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Operation requires `initialize` to have completed.
    #[error("session not initialized")]
    NotInitialized,

    /// `initialize` was called twice.
    #[error("session already initialized")]
    AlreadyInitialized,
}

type PendingMap = Arc<parking_lot::Mutex<HashMap<u64, oneshot::Sender<super::protocol::RpcResponse>>>>;

/// Stateful JSON-RPC client wrapped around one child's pipes.
///
/// Single-owner: a session belongs to exactly one mount and is never shared
/// across mounts.
pub struct McpSession {
    label: String,
    writer: Mutex<Option<FrameWriter<ChildStdin>>>,
    pending: PendingMap,
    next_id: AtomicU64,
    closed: Arc<AtomicBool>,
    initialized: AtomicBool,
    reader: parking_lot::Mutex<Option<JoinHandle<()>>>,
    server: parking_lot::Mutex<Option<InitializeResult>>,
    timeouts: SessionTimeouts,
}

impl McpSession {
    /// Create a session over a child's pipes and start its reader task.
    pub fn new(
        stdin: ChildStdin,
        stdout: ChildStdout,
        label: impl Into<String>,
        timeouts: SessionTimeouts,
    ) -> Arc<Self> {
        let label = label.into();
        let pending: PendingMap = Arc::new(parking_lot::Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let reader_task = tokio::spawn(reader_loop(
            FrameReader::new(stdout, label.clone()),
            Arc::clone(&pending),
            Arc::clone(&closed),
            label.clone(),
        ));

        Arc::new(Self {
            label,
            writer: Mutex::new(Some(FrameWriter::new(stdin))),
            pending,
            next_id: AtomicU64::new(1),
            closed,
            initialized: AtomicBool::new(false),
            reader: parking_lot::Mutex::new(Some(reader_task)),
            server: parking_lot::Mutex::new(None),
            timeouts,
        })
    }

    /// Whether the session has been marked closed (EOF, write failure, or
    /// an explicit `close`).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether the `initialize` handshake has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Server info and capabilities captured during `initialize`.
    pub fn server_info(&self) -> Option<InitializeResult> {
        self.server.lock().clone()
    }

    /// Perform the MCP handshake: send `initialize`, await the response
    /// (bounded by the initialize deadline), then fire the
    /// `notifications/initialized` notification.
    pub async fn initialize(&self) -> Result<InitializeResult, SessionError> {
        if self.is_initialized() {
            return Err(SessionError::AlreadyInitialized);
        }

        let params = serde_json::to_value(InitializeParams::default())
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;
        let result = self
            .request("initialize", Some(params), self.timeouts.initialize)
            .await?;

        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;

        *self.server.lock() = Some(init.clone());
        self.initialized.store(true, Ordering::Release);

        self.notify("notifications/initialized", None).await?;

        Ok(init)
    }

    /// Discover tools via `tools/list`.
    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>, SessionError> {
        self.require_initialized()?;
        let result = self.request("tools/list", None, self.timeouts.list).await?;
        let listed: ToolsListResult = serde_json::from_value(result)
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;
        Ok(listed.tools)
    }

    /// Discover resources via `resources/list`.
    pub async fn list_resources(&self) -> Result<Vec<ResourceInfo>, SessionError> {
        self.require_initialized()?;
        let result = self
            .request("resources/list", None, self.timeouts.list)
            .await?;
        let listed: ResourcesListResult = serde_json::from_value(result)
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;
        Ok(listed.resources)
    }

    /// Discover prompts via `prompts/list`.
    pub async fn list_prompts(&self) -> Result<Vec<PromptInfo>, SessionError> {
        self.require_initialized()?;
        let result = self
            .request("prompts/list", None, self.timeouts.list)
            .await?;
        let listed: PromptsListResult = serde_json::from_value(result)
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;
        Ok(listed.prompts)
    }

    /// Invoke a tool on the child using the default call deadline.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, Value>,
    ) -> Result<CallToolResult, SessionError> {
        self.call_tool_with_timeout(name, arguments, self.timeouts.call)
            .await
    }

    /// Invoke a tool on the child with an explicit deadline.
    pub async fn call_tool_with_timeout(
        &self,
        name: &str,
        arguments: serde_json::Map<String, Value>,
        deadline: Duration,
    ) -> Result<CallToolResult, SessionError> {
        self.require_initialized()?;
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let params = serde_json::to_value(params)
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;
        let result = self.request("tools/call", Some(params), deadline).await?;
        serde_json::from_value(result).map_err(|e| SessionError::InvalidResponse(e.to_string()))
    }

    /// Close the session: mark it closed, release stdin (EOF to the child),
    /// and stop the reader task. Pending waiters fail with
    /// [`SessionError::TransportClosed`].
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);

        if let Some(writer) = self.writer.lock().await.take() {
            writer.close().await;
        }

        let handle = self.reader.lock().take();
        if let Some(handle) = handle {
            let abort = handle.abort_handle();
            if timeout(Duration::from_secs(1), handle).await.is_err() {
                abort.abort();
            }
        }

        self.pending.lock().clear();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_initialized(&self) -> Result<(), SessionError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(SessionError::NotInitialized)
        }
    }

    /// Send a request and await its correlated response within `deadline`.
    ///
    /// On timeout the waiter is removed and the session continues — unless
    /// the deadline was caused by EOF, in which case the closed state wins.
    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        deadline: Duration,
    ) -> Result<Value, SessionError> {
        if self.is_closed() {
            return Err(SessionError::TransportClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let frame = RpcRequest::new(id, method, params);
        {
            let mut guard = self.writer.lock().await;
            let writer = match guard.as_mut() {
                Some(writer) => writer,
                None => {
                    self.pending.lock().remove(&id);
                    return Err(SessionError::TransportClosed);
                }
            };
            if let Err(err) = writer.write_request(&frame).await {
                warn!(server = %self.label, method, error = %err, "write failed; closing session");
                self.pending.lock().remove(&id);
                self.closed.store(true, Ordering::Release);
                return Err(SessionError::TransportClosed);
            }
        }

        match timeout(deadline, rx).await {
            Ok(Ok(response)) => response.into_result().map_err(|err| SessionError::Remote {
                code: err.code,
                message: err.message,
                data: err.data,
            }),
            // Waiter dropped: the reader exited on EOF or a fatal read error.
            Ok(Err(_)) => Err(SessionError::TransportClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                if self.is_closed() {
                    Err(SessionError::TransportClosed)
                } else {
                    Err(SessionError::Timeout(deadline))
                }
            }
        }
    }

    /// Send a notification (no response expected).
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::TransportClosed);
        }
        let frame = RpcNotification::new(method, params);
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(SessionError::TransportClosed)?;
        if let Err(err) = writer.write_notification(&frame).await {
            warn!(server = %self.label, method, error = %err, "write failed; closing session");
            self.closed.store(true, Ordering::Release);
            return Err(SessionError::TransportClosed);
        }
        Ok(())
    }
}

/// Reader task: drains the child's stdout and completes waiters.
///
/// Responses with an unknown id are discarded with a warning; notifications
/// are ignored in this release. On EOF or a fatal read error the session is
/// marked closed and all pending waiters are failed.
async fn reader_loop(
    mut reader: FrameReader<ChildStdout>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    label: String,
) {
    loop {
        match reader.read_frame().await {
            Ok(Some(InboundFrame::Response(response))) => {
                let waiter = pending.lock().remove(&response.id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => {
                        warn!(server = %label, id = response.id, "response for unknown request id");
                    }
                }
            }
            Ok(Some(InboundFrame::Notification { method, .. })) => {
                debug!(server = %label, method, "ignoring server notification");
            }
            Ok(None) => {
                debug!(server = %label, "child stdout reached EOF");
                break;
            }
            Err(err) => {
                warn!(server = %label, error = %err, "reader failed");
                break;
            }
        }
    }

    closed.store(true, Ordering::Release);
    pending.lock().clear();
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
