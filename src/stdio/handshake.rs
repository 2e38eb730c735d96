//! MCP initialization handshake and tool invocation.
//!
//! The probe enacts the minimal MCP client sequence over a
//! [`ServerProcess`]:
//!
//! 1. **`initialize`** — request carrying `protocolVersion`, an empty
//!    `capabilities` object, and `clientInfo`; the response is read.
//! 2. **`notify_initialized`** — `notifications/initialized`, fire and
//!    forget; nothing is read.
//! 3. **`call_tool`** — `tools/call` request naming one tool; the response
//!    is read and returned.
//!
//! Responses are returned as raw JSON. An error-shaped response is not
//! treated as a failure here.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{ClientConfig, ToolConfig};
use crate::rpc::{
    CallToolParams, ClientInfo, InitializeParams, Message, METHOD_INITIALIZE,
    METHOD_INITIALIZED, METHOD_TOOLS_CALL,
};
use crate::stdio::spawner::ServerProcess;
use crate::{AppError, Result};

/// Send an `initialize` request and read its response.
///
/// ```json
/// {
///   "jsonrpc": "2.0",
///   "method": "initialize",
///   "params": {
///     "protocolVersion": "2024-11-05",
///     "capabilities": {},
///     "clientInfo": { "name": "Test", "version": "1" }
///   },
///   "id": 1
/// }
/// ```
///
/// # Errors
///
/// Returns `AppError::Protocol` if the parameters cannot be serialised, and
/// propagates send/receive failures from [`ServerProcess`].
pub async fn initialize(
    server: &mut ServerProcess,
    client: &ClientConfig,
) -> Result<Option<Value>> {
    let params = InitializeParams {
        protocol_version: client.protocol_version.clone(),
        capabilities: json!({}),
        client_info: ClientInfo {
            name: client.name.clone(),
            version: client.version.clone(),
        },
    };

    let id = server.next_request_id();
    let request = Message::request(id, METHOD_INITIALIZE, Some(to_params(&params)?));
    server.send_message(&request).await?;
    debug!(
        id,
        protocol_version = client.protocol_version.as_str(),
        "handshake: initialize sent"
    );

    let response = server.receive().await?;
    match &response {
        Some(value) => {
            let server_info = value
                .pointer("/result/serverInfo")
                .cloned()
                .unwrap_or_default();
            info!(%server_info, "handshake: initialize response received");
        }
        None => info!("handshake: server closed stdout before initialize response"),
    }
    Ok(response)
}

/// Send the `notifications/initialized` notification.
///
/// No identifier is attached and no response is awaited.
///
/// # Errors
///
/// Propagates send failures from [`ServerProcess::send_message`].
pub async fn notify_initialized(server: &mut ServerProcess) -> Result<()> {
    server
        .send_message(&Message::notification(METHOD_INITIALIZED, None))
        .await?;
    debug!("handshake: initialized notification sent");
    Ok(())
}

/// Send a `tools/call` request and read its response.
///
/// # Errors
///
/// Returns `AppError::Protocol` if the parameters cannot be serialised, and
/// propagates send/receive failures from [`ServerProcess`].
pub async fn call_tool(server: &mut ServerProcess, tool: &ToolConfig) -> Result<Option<Value>> {
    let params = CallToolParams {
        name: tool.name.clone(),
        arguments: tool.arguments.clone(),
    };

    let id = server.next_request_id();
    let request = Message::request(id, METHOD_TOOLS_CALL, Some(to_params(&params)?));
    server.send_message(&request).await?;
    debug!(id, tool = tool.name.as_str(), "tools/call sent");

    let response = server.receive().await?;
    info!(
        tool = tool.name.as_str(),
        received = response.is_some(),
        is_error = response.as_ref().is_some_and(|v| v.get("error").is_some()),
        "tools/call finished"
    );
    Ok(response)
}

fn to_params<T: serde::Serialize>(params: &T) -> Result<Value> {
    serde_json::to_value(params)
        .map_err(|e| AppError::Protocol(format!("failed to serialise params: {e}")))
}
