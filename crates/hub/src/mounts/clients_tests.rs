// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::mcp::{LaunchSpec, Launcher, McpSession, SessionTimeouts};

async fn spawn_pair() -> (Arc<McpSession>, SpawnedChild) {
    let launcher = Launcher::new("podman");
    let spec = LaunchSpec::Command {
        command: "cat".into(),
        args: vec![],
    };
    let (child, stdin, stdout) = launcher.spawn(&spec, &BTreeMap::new()).await.unwrap();
    let session = McpSession::new(stdin, stdout, "test", SessionTimeouts::default());
    (session, child)
}

#[tokio::test]
async fn insert_and_lookup_by_handle() {
    let manager = ClientManager::new();
    let (session, child) = spawn_pair().await;
    let handle = child.handle().clone();

    manager.insert(session, child).await;
    assert_eq!(manager.len().await, 1);
    assert!(manager.session(&handle).await.is_some());
}

#[tokio::test]
async fn remove_closes_session_and_reaps_child() {
    let manager = ClientManager::new();
    let (session, child) = spawn_pair().await;
    let handle = child.handle().clone();
    let session_ref = Arc::clone(&session);
    manager.insert(session, child).await;

    // cat exits when its stdin closes, so removal stays within the grace.
    let removed = manager.remove(&handle, Duration::from_secs(2)).await;
    assert!(removed);
    assert!(session_ref.is_closed());
    assert!(manager.is_empty().await);
    assert!(manager.session(&handle).await.is_none());
}

#[tokio::test]
async fn remove_unknown_handle_is_a_noop() {
    let manager = ClientManager::new();
    let removed = manager
        .remove(
            &ChildHandle::Container {
                name: "nope".into(),
            },
            Duration::from_millis(100),
        )
        .await;
    assert!(!removed);
}

#[tokio::test]
async fn drain_tears_down_everything() {
    let manager = ClientManager::new();
    let (session_a, child_a) = spawn_pair().await;
    let (session_b, child_b) = spawn_pair().await;
    manager.insert(session_a, child_a).await;
    manager.insert(session_b, child_b).await;
    assert_eq!(manager.len().await, 2);

    manager.drain(Duration::from_secs(2)).await;
    assert!(manager.is_empty().await);
}
