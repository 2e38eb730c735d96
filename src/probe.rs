//! End-to-end probe: launch, handshake, one tool call, print, shut down.

use std::io::Write;

use serde_json::Value;
use tracing::{info, info_span, warn, Instrument};

use crate::config::ProbeConfig;
use crate::stdio::handshake;
use crate::stdio::spawner::ServerProcess;
use crate::{AppError, Result};

/// Run the handshake and the configured tool call on a started server.
///
/// The `initialize` response is read and discarded. Returns the
/// `tools/call` response, or `None` if the server closed stdout first.
///
/// # Errors
///
/// Propagates send, receive, and timeout failures.
pub async fn run_sequence(
    server: &mut ServerProcess,
    config: &ProbeConfig,
) -> Result<Option<Value>> {
    handshake::initialize(server, &config.client).await?;
    handshake::notify_initialized(server).await?;
    handshake::call_tool(server, &config.tool).await
}

/// Pretty-print a response with two-space indentation.
///
/// A missing response renders as `null`.
///
/// # Errors
///
/// Returns `AppError::Protocol` if the value cannot be serialised.
pub fn render_response(response: Option<&Value>) -> Result<String> {
    serde_json::to_string_pretty(&response)
        .map_err(|e| AppError::Protocol(format!("failed to render response: {e}")))
}

/// Launch the configured server, run the sequence, and write the rendered
/// tool response followed by a newline to `out`.
///
/// The server is shut down whether or not the sequence succeeds; the
/// sequence error takes precedence over a shutdown error.
///
/// # Errors
///
/// - `AppError::Launch` if the server cannot be started.
/// - Any error from [`run_sequence`], [`render_response`], or the shutdown.
/// - `AppError::Io` if writing to `out` fails.
pub async fn run(config: &ProbeConfig, out: &mut impl Write) -> Result<()> {
    let span = info_span!(
        "probe",
        command = config.server.command.as_str(),
        tool = config.tool.name.as_str()
    );
    run_in_span(config, out).instrument(span).await
}

async fn run_in_span(config: &ProbeConfig, out: &mut impl Write) -> Result<()> {
    let mut server =
        ServerProcess::start(&config.server)?.with_receive_timeout(config.receive_timeout());

    let outcome = run_sequence(&mut server, config)
        .await
        .and_then(|response| print_response(response.as_ref(), out));

    let shutdown = server.shutdown();
    if let Err(ref err) = shutdown {
        warn!(%err, "server shutdown failed");
    }

    outcome?;
    shutdown?;
    info!("probe complete");
    Ok(())
}

fn print_response(response: Option<&Value>, out: &mut impl Write) -> Result<()> {
    let rendered = render_response(response)?;
    writeln!(out, "{rendered}")
        .and_then(|()| out.flush())
        .map_err(|e| AppError::Io(format!("failed to write response: {e}")))
}
