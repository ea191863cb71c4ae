// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! mcphub binary entry point.
//!
//! Runs the registry service standalone: loads configuration, replays
//! persisted mounts, starts the background refresh scheduler, and serves
//! until interrupted. Catalog sources and the client-facing MCP surface are
//! collaborators supplied by an embedding host; standalone runs use a
//! surface that tracks registrations and drops notifications (there is no
//! connected client to notify).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mcphub::tools::{Aggregator, AggregatorError, ToolRegistration};
use mcphub::{
    Cli, ClientManager, DynamicToolRegistry, HubConfig, MountStore, Orchestrator,
    RefreshScheduler, Registry,
};

/// Aggregator surface for standalone runs: registrations are tracked so the
/// duplicate-name contract holds, list-changed requests are skipped.
#[derive(Default)]
struct StandaloneSurface {
    tools: parking_lot::Mutex<HashMap<String, ToolRegistration>>,
}

#[async_trait]
impl Aggregator for StandaloneSurface {
    async fn add_tool(&self, registration: ToolRegistration) -> Result<(), AggregatorError> {
        let mut tools = self.tools.lock();
        if tools.contains_key(&registration.full_name) {
            return Err(AggregatorError::DuplicateName(registration.full_name));
        }
        debug!(tool = %registration.full_name, "registered tool");
        tools.insert(registration.full_name.clone(), registration);
        Ok(())
    }

    async fn remove_tool(&self, full_name: &str) -> Result<(), AggregatorError> {
        let mut tools = self.tools.lock();
        match tools.remove(full_name) {
            Some(_) => Ok(()),
            None => Err(AggregatorError::Rejected(format!(
                "tool '{full_name}' is not registered"
            ))),
        }
    }

    async fn send_tool_list_changed(&self) {
        // No client request context in standalone mode; emission is skipped.
        debug!("tools/list_changed requested (no connected client)");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = cli
        .log_filter
        .clone()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = HubConfig::from_env();
    cli.apply(&mut config);
    std::fs::create_dir_all(&config.cache_dir)?;
    info!(cache_dir = %config.cache_dir.display(), engine = %config.engine, "starting mcphub");

    let registry = Arc::new(Registry::open(config.entries_path()));
    let store = Arc::new(MountStore::new(config.mounts_path()));
    let clients = Arc::new(ClientManager::new());
    let surface = Arc::new(StandaloneSurface::default());
    let tools = Arc::new(DynamicToolRegistry::new(surface));
    let orchestrator = Orchestrator::new(
        Arc::clone(&registry),
        store,
        clients,
        tools,
        &config,
    );

    let _reaper = orchestrator.spawn_unmount_reaper();

    if cli.no_replay {
        info!("skipping mount replay (--no-replay)");
    } else {
        let restored = orchestrator.replay().await;
        info!(restored, "replayed persisted mounts");
    }

    // Catalog sources are collaborators; an embedding host registers its
    // scrapers here. Standalone runs only serve what is already cached.
    let scheduler = RefreshScheduler::new(
        Arc::clone(&registry),
        Vec::new(),
        config.refresh_wake,
        config.refresh_min_interval,
    );
    scheduler.start();

    info!(entries = registry.len().await, "mcphub ready");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    scheduler.stop().await;
    orchestrator.shutdown().await;

    Ok(())
}
