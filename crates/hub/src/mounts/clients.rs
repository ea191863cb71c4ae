// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client manager: maps each mount's child handle to its live session and
//! process pair.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::mcp::{ChildHandle, McpSession, SpawnedChild};

struct MountClient {
    session: Arc<McpSession>,
    child: SpawnedChild,
}

/// Registry of live session + child pairs, keyed by child handle.
///
/// Stdin/stdout of a child are owned by exactly one session; the manager
/// only tracks the pair so routing and eviction have a single place to look.
#[derive(Default)]
pub struct ClientManager {
    inner: Mutex<HashMap<ChildHandle, MountClient>>,
}

impl ClientManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session + child pair under the child's handle.
    pub async fn insert(&self, session: Arc<McpSession>, child: SpawnedChild) {
        let handle = child.handle().clone();
        self.inner
            .lock()
            .await
            .insert(handle, MountClient { session, child });
    }

    /// Look up the session for a handle.
    pub async fn session(&self, handle: &ChildHandle) -> Option<Arc<McpSession>> {
        self.inner
            .lock()
            .await
            .get(handle)
            .map(|client| Arc::clone(&client.session))
    }

    /// Remove and tear down the pair for a handle: close the session (which
    /// releases the child's stdin) and reap the child within `grace`.
    ///
    /// Removing an unknown handle is a no-op; returns whether anything was
    /// removed.
    pub async fn remove(&self, handle: &ChildHandle, grace: Duration) -> bool {
        let client = self.inner.lock().await.remove(handle);
        match client {
            Some(client) => {
                client.session.close().await;
                client.child.teardown(grace).await;
                true
            }
            None => {
                debug!(handle = %handle, "remove for unknown handle");
                false
            }
        }
    }

    /// Tear down every registered pair (shutdown path).
    pub async fn drain(&self, grace: Duration) {
        let clients: Vec<(ChildHandle, MountClient)> =
            self.inner.lock().await.drain().collect();
        for (handle, client) in clients {
            debug!(handle = %handle, "draining client");
            client.session.close().await;
            client.child.teardown(grace).await;
        }
    }

    /// Number of registered pairs.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether no pairs are registered.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
#[path = "clients_tests.rs"]
mod tests;
