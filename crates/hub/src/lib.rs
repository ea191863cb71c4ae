// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! mcphub — aggregating MCP registry and runtime proxy.
//!
//! Discovers MCP server candidates from upstream catalogs, maintains a
//! searchable registry, and on demand launches chosen servers as child
//! processes, speaks MCP to them over stdio, and re-exposes their tools as
//! namespaced callables on an embedding aggregator's MCP surface.

pub mod cli;
pub mod config;
pub mod env;
pub mod mcp;
pub mod mounts;
pub mod registry;
pub mod service;
pub mod tools;

pub use cli::Cli;
pub use config::{HubConfig, TransportDeathPolicy};
pub use mcp::{ChildHandle, LaunchError, McpSession, SessionError, SessionTimeouts};
pub use mounts::{
    ActivateRequest, ActiveMount, ClientManager, MountError, MountStore, Orchestrator,
};
pub use registry::{
    CatalogSource, LaunchMethod, RefreshScheduler, Registry, RegistryEntry, SearchQuery,
    ServerCommand, SourceType,
};
pub use service::{RegistryService, ServiceError};
pub use tools::{Aggregator, AggregatorError, DynamicToolRegistry, ToolInvoker, ToolRegistration};
