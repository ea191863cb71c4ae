// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 and MCP wire types for talking to child servers.
//!
//! The hub acts as the MCP *client* of every mounted child. Messages are
//! UTF-8 JSON objects, one per line. Outbound traffic is requests and
//! notifications; inbound traffic is responses (correlated by id) and
//! notifications (ignored in this release).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol version the hub speaks to its children.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

// =============================================================================
// JSON-RPC frames
// =============================================================================

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: &'static str,
    /// Request identifier, monotone per session.
    pub id: u64,
    /// Method name to invoke.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize)]
pub struct RpcNotification {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: &'static str,
    /// Method name.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcNotification {
    /// Create a new JSON-RPC notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// Response identifier (matches the request id).
    pub id: u64,
    /// Result value on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error object on failure.
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Extract either the result or the error.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Additional error data.
    #[serde(default)]
    pub data: Option<Value>,
}

/// An inbound frame read from a child's stdout.
///
/// Classification: a frame with an `id` is a response; a frame with a
/// `method` and no `id` is a notification from the child.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// Response to one of our requests.
    Response(RpcResponse),
    /// Server-initiated notification.
    Notification { method: String, params: Option<Value> },
}

impl InboundFrame {
    /// Classify a parsed JSON object as response or notification.
    ///
    /// Returns `None` for objects that are neither (no `id`, no `method`).
    pub fn classify(value: Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.contains_key("id") {
            let response: RpcResponse = serde_json::from_value(value.clone()).ok()?;
            return Some(InboundFrame::Response(response));
        }
        let method = obj.get("method")?.as_str()?.to_string();
        let params = obj.get("params").cloned();
        Some(InboundFrame::Notification { method, params })
    }
}

// =============================================================================
// Initialization
// =============================================================================

/// Client information sent during initialization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "mcphub".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Client capabilities sent during initialization.
///
/// The hub advertises the tools capability and nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct ClientCapabilities {
    /// Tools capability marker (empty object on the wire).
    pub tools: Value,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self {
            tools: Value::Object(serde_json::Map::new()),
        }
    }
}

/// Initialize request parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version the client supports.
    pub protocol_version: String,
    /// Client capabilities.
    pub capabilities: ClientCapabilities,
    /// Client information.
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo::default(),
        }
    }
}

/// Server information from the initialize response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version (optional).
    #[serde(default)]
    pub version: Option<String>,
}

/// Initialize response result.
///
/// Server capabilities are retained but not interpreted in this release.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version the server supports.
    pub protocol_version: String,
    /// Raw server capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Server information.
    pub server_info: ServerInfo,
}

// =============================================================================
// Discovery
// =============================================================================

/// Tool definition from `tools/list`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Tool name, unique within its server.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema for tool input.
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// Response from `tools/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsListResult {
    /// Tools available on the server.
    pub tools: Vec<ToolInfo>,
}

/// Resource definition from `resources/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceInfo {
    /// Resource URI.
    pub uri: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl ResourceInfo {
    /// Display identifier: the name when present, else the URI.
    pub fn identifier(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uri)
    }
}

/// Response from `resources/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourcesListResult {
    /// Resources available on the server.
    #[serde(default)]
    pub resources: Vec<ResourceInfo>,
}

/// Prompt definition from `prompts/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptInfo {
    /// Prompt name.
    pub name: String,
}

/// Response from `prompts/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptsListResult {
    /// Prompts available on the server.
    #[serde(default)]
    pub prompts: Vec<PromptInfo>,
}

// =============================================================================
// Tool execution
// =============================================================================

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Serialize)]
pub struct CallToolParams {
    /// Tool name to invoke (un-prefixed, as the child knows it).
    pub name: String,
    /// Arguments matching the tool's input schema.
    pub arguments: serde_json::Map<String, Value>,
}

/// Content block in a tool response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Plain text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Base64-encoded image.
    Image {
        /// Base64-encoded image data.
        data: String,
        /// MIME type of the image.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Resource reference.
    Resource {
        /// Resource URI.
        uri: String,
        /// Optional text content of the resource.
        #[serde(default)]
        text: Option<String>,
    },
}

impl ContentBlock {
    /// Extract text content if this is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Response from `tools/call`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content blocks returned by the tool.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Whether the tool execution resulted in an error.
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Textual content of the first result entry if present, else the raw
    /// result serialized as JSON.
    pub fn into_text(self) -> String {
        match self.content.first().and_then(ContentBlock::as_text) {
            Some(text) => text.to_string(),
            None => serde_json::to_string(&self.content).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
