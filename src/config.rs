//! Probe configuration parsing, validation, and command-line overrides.
//!
//! Every field has a default, so an empty TOML document (or no config file
//! at all) reproduces the stock probe: launch the locally installed
//! `notebooklm-mcp` server and call its `notebook_list` tool.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::rpc::PROTOCOL_VERSION;
use crate::stdio::codec::DEFAULT_MAX_LINE_BYTES;
use crate::{AppError, Result};

/// What to do with the server's standard error stream.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StderrMode {
    /// Connect a pipe that is never read.
    #[default]
    Piped,
    /// Share the probe's own stderr.
    Inherit,
    /// Discard.
    Null,
}

/// How to launch the MCP server under test.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct ServerConfig {
    /// Executable path or name resolved through `PATH`.
    pub command: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Disposition of the child's stderr.
    pub stderr: StderrMode,
    /// Inbound lines longer than this are dropped unread.
    pub max_line_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            stderr: StderrMode::default(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// Identity announced in the `initialize` request.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct ClientConfig {
    /// `clientInfo.name`.
    pub name: String,
    /// `clientInfo.version`.
    pub version: String,
    /// `protocolVersion` echoed to the server.
    pub protocol_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            version: default_client_version(),
            protocol_version: PROTOCOL_VERSION.to_owned(),
        }
    }
}

/// The single tool invoked after the handshake.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct ToolConfig {
    /// Remote tool name.
    pub name: String,
    /// Tool arguments; must be a JSON object.
    pub arguments: Value,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            name: default_tool_name(),
            arguments: Value::Object(serde_json::Map::new()),
        }
    }
}

fn default_command() -> String {
    "/opt/homebrew/bin/notebooklm-mcp".into()
}

fn default_client_name() -> String {
    "Test".into()
}

fn default_client_version() -> String {
    "1".into()
}

fn default_tool_name() -> String {
    "notebook_list".into()
}

/// Top-level probe configuration parsed from `probe.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct ProbeConfig {
    /// Server launch settings.
    pub server: ServerConfig,
    /// Client identity settings.
    pub client: ClientConfig,
    /// Tool invocation settings.
    pub tool: ToolConfig,
    /// Per-receive timeout in seconds; 0 waits forever.
    pub receive_timeout_seconds: u64,
}

/// Values supplied on the command line that replace configured ones.
#[derive(Debug, Clone, Default)]
pub struct ProbeOverrides {
    /// Full server command line; the first element is the executable.
    pub command: Vec<String>,
    /// Tool name.
    pub tool: Option<String>,
    /// Tool arguments.
    pub arguments: Option<Value>,
    /// `clientInfo.name`.
    pub client_name: Option<String>,
    /// `clientInfo.version`.
    pub client_version: Option<String>,
    /// `protocolVersion`.
    pub protocol_version: Option<String>,
    /// Receive timeout in seconds.
    pub receive_timeout_seconds: Option<u64>,
    /// Inbound line limit in bytes.
    pub max_line_bytes: Option<usize>,
}

impl ProbeConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace configured values with command-line overrides and re-validate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the merged configuration is invalid.
    pub fn apply(&mut self, overrides: ProbeOverrides) -> Result<()> {
        let mut command = overrides.command.into_iter();
        if let Some(program) = command.next() {
            self.server.command = program;
            self.server.args = command.collect();
        }
        if let Some(tool) = overrides.tool {
            self.tool.name = tool;
        }
        if let Some(arguments) = overrides.arguments {
            self.tool.arguments = arguments;
        }
        if let Some(name) = overrides.client_name {
            self.client.name = name;
        }
        if let Some(version) = overrides.client_version {
            self.client.version = version;
        }
        if let Some(protocol_version) = overrides.protocol_version {
            self.client.protocol_version = protocol_version;
        }
        if let Some(seconds) = overrides.receive_timeout_seconds {
            self.receive_timeout_seconds = seconds;
        }
        if let Some(limit) = overrides.max_line_bytes {
            self.server.max_line_bytes = limit;
        }
        self.validate()
    }

    /// Receive timeout, or `None` to block until a response or EOF.
    #[must_use]
    pub fn receive_timeout(&self) -> Option<Duration> {
        (self.receive_timeout_seconds > 0).then(|| Duration::from_secs(self.receive_timeout_seconds))
    }

    fn validate(&self) -> Result<()> {
        if self.server.command.trim().is_empty() {
            return Err(AppError::Config("server.command must not be empty".into()));
        }

        if self.server.max_line_bytes == 0 {
            return Err(AppError::Config(
                "server.max_line_bytes must be greater than zero".into(),
            ));
        }

        if self.tool.name.trim().is_empty() {
            return Err(AppError::Config("tool.name must not be empty".into()));
        }

        if !self.tool.arguments.is_object() {
            return Err(AppError::Config(
                "tool.arguments must be a JSON object".into(),
            ));
        }

        Ok(())
    }
}
