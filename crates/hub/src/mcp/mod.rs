// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! MCP client plumbing: wire types, stdio framing, sessions, and the child
//! launcher.

pub mod framing;
pub mod launcher;
pub mod protocol;
pub mod session;

pub use framing::{FrameReader, FrameWriter, FramingError};
pub use launcher::{ChildHandle, LaunchError, LaunchSpec, Launcher, SpawnedChild};
pub use protocol::{
    CallToolResult, ContentBlock, InboundFrame, InitializeResult, PromptInfo, ResourceInfo,
    RpcError, RpcNotification, RpcRequest, RpcResponse, ServerInfo, ToolInfo, PROTOCOL_VERSION,
};
pub use session::{McpSession, SessionError, SessionTimeouts};
