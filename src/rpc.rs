//! JSON-RPC 2.0 envelope and the MCP parameter types the probe sends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value of the `jsonrpc` field on every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Key whose presence marks a line as a protocol message.
pub const PROTOCOL_MARKER: &str = "jsonrpc";

/// MCP protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Handshake request method.
pub const METHOD_INITIALIZE: &str = "initialize";

/// Notification sent once the `initialize` response has been read.
pub const METHOD_INITIALIZED: &str = "notifications/initialized";

/// Tool invocation request method.
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Outbound JSON-RPC message (request or notification).
///
/// A request carries an `id`; a notification does not. Absent fields are
/// omitted from the wire form rather than written as `null`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: String,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request identifier; `None` for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl Message {
    /// Build a message; `id` decides between request and notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>, id: Option<u64>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Build a request with identifier `id`.
    #[must_use]
    pub fn request(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self::new(method, params, Some(id))
    }

    /// Build a notification (no identifier, no response expected).
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self::new(method, params, None)
    }

    /// Whether this message is a notification.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// `initialize` request parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol revision the client speaks.
    pub protocol_version: String,
    /// Client capabilities; the probe advertises none.
    pub capabilities: Value,
    /// Client identity.
    pub client_info: ClientInfo,
}

/// `clientInfo` block of the `initialize` request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

/// `tools/call` request parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CallToolParams {
    /// Remote tool name.
    pub name: String,
    /// Tool arguments object.
    pub arguments: Value,
}

/// Whether `value` carries the protocol marker.
///
/// Only JSON objects qualify; arrays, strings, and scalars never do.
#[must_use]
pub fn has_protocol_marker(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|object| object.contains_key(PROTOCOL_MARKER))
}
