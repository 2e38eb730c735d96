#![forbid(unsafe_code)]

//! `mcp-probe` — smoke-test harness for MCP servers speaking JSON-RPC over
//! stdio.

pub mod config;
pub mod errors;
pub mod probe;
pub mod rpc;
pub mod stdio;

pub use config::ProbeConfig;
pub use errors::{AppError, Result};
