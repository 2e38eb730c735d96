//! Stdio transport to an MCP server process.
//!
//! The probe talks to the server over newline-delimited JSON on the child's
//! stdin and stdout, one request in flight at a time.
//!
//! Submodules:
//! - `codec`: newline framing; lines over the configured size are dropped
//!   and reading continues.
//! - `writer`: serialise and flush one outbound message per line.
//! - `reader`: lazy stream of inbound protocol messages; noise is skipped.
//! - `spawner`: [`ServerProcess`](spawner::ServerProcess), the owned
//!   process handle with `start` / `send` / `receive` / `shutdown`.
//! - `handshake`: `initialize`, `notifications/initialized`, `tools/call`.

pub mod codec;
pub mod handshake;
pub mod reader;
pub mod spawner;
pub mod writer;
