#![forbid(unsafe_code)]

//! `mcp-probe` — launch an MCP server, handshake, call one tool, print the
//! response.
//!
//! The response goes to stdout; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use mcp_probe::config::{ProbeConfig, ProbeOverrides};
use mcp_probe::{probe, AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "mcp-probe",
    about = "Smoke-test an MCP server over stdio",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tool to invoke after the handshake.
    #[arg(long)]
    tool: Option<String>,

    /// Tool arguments as a JSON object.
    #[arg(long, value_parser = parse_json_object)]
    arguments: Option<Value>,

    /// `clientInfo.name` sent in `initialize`.
    #[arg(long)]
    client_name: Option<String>,

    /// `clientInfo.version` sent in `initialize`.
    #[arg(long)]
    client_version: Option<String>,

    /// `protocolVersion` sent in `initialize`.
    #[arg(long)]
    protocol_version: Option<String>,

    /// Seconds to wait for each response; 0 waits forever.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Longest server output line accepted, in bytes.
    #[arg(long)]
    max_line_bytes: Option<usize>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Server command line, e.g. `-- uvx my-mcp-server --stdio`.
    #[arg(last = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl Cli {
    fn into_config(self) -> Result<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::load_from_path(path)?,
            None => ProbeConfig::default(),
        };

        config.apply(ProbeOverrides {
            command: self.command,
            tool: self.tool,
            arguments: self.arguments,
            client_name: self.client_name,
            client_version: self.client_version,
            protocol_version: self.protocol_version,
            receive_timeout_seconds: self.timeout_secs,
            max_line_bytes: self.max_line_bytes,
        })?;

        Ok(config)
    }
}

fn parse_json_object(raw: &str) -> std::result::Result<Value, String> {
    let value: Value = serde_json::from_str(raw).map_err(|err| format!("invalid JSON: {err}"))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err("arguments must be a JSON object".into())
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    let config = args.into_config()?;
    info!(
        command = config.server.command.as_str(),
        tool = config.tool.name.as_str(),
        "mcp-probe starting"
    );

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(async {
            let mut stdout = std::io::stdout().lock();
            probe::run(&config, &mut stdout).await
        })
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
