//! Inbound response reader.
//!
//! The server's stdout is treated as a lazy sequence of candidate lines.
//! [`responses`] filters that sequence down to protocol messages: lines that
//! parse as a JSON object carrying the `jsonrpc` key. Everything else
//! (startup banners, log text, stray JSON) is skipped without ending the
//! sequence.
//!
//! Because the [`FramedRead`] is borrowed rather than consumed, a new
//! [`responses`] stream picks up exactly where the previous one stopped;
//! the harness keeps one framed reader for the lifetime of the process.
//!
//! | Inbound item                     | Outcome                         |
//! |----------------------------------|---------------------------------|
//! | JSON object with `jsonrpc`       | yielded                         |
//! | JSON without `jsonrpc`           | skipped; logged at `DEBUG`      |
//! | non-JSON or empty line           | skipped; logged at `DEBUG`      |
//! | line over the codec limit        | dropped by the codec (`WARN`)   |
//! | I/O error                        | yielded as `Err`                |
//! | EOF                              | sequence ends                   |

use std::future;

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::debug;

use crate::rpc::has_protocol_marker;
use crate::stdio::codec::NdjsonCodec;
use crate::Result;

/// Framed line reader over a server's stdout.
pub type LineReader<R> = FramedRead<R, NdjsonCodec>;

/// Wrap `stdout` in a [`LineReader`] that drops lines longer than
/// `max_line_bytes`.
#[must_use]
pub fn line_reader<R: AsyncRead>(stdout: R, max_line_bytes: usize) -> LineReader<R> {
    FramedRead::new(stdout, NdjsonCodec::with_max_line_bytes(max_line_bytes))
}

/// Parse one line, returning it only if it is a protocol message.
///
/// Returns `None` for blank lines, lines that are not valid JSON, and JSON
/// values lacking the `jsonrpc` key.
#[must_use]
pub fn parse_response_line(line: &str) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) if has_protocol_marker(&value) => Some(value),
        Ok(_) => {
            debug!(raw = trimmed, "stdio reader: json without protocol marker, skipping");
            None
        }
        Err(e) => {
            debug!(error = %e, raw = trimmed, "stdio reader: non-JSON line, skipping");
            None
        }
    }
}

/// Lazy stream of protocol messages read from `lines`.
///
/// Never yields a value that lacks the protocol marker. Ends when the
/// underlying stream reaches EOF. An unbounded server produces an unbounded
/// stream; callers wanting a bound wrap the poll in a timeout.
pub fn responses<'a, R>(lines: &'a mut LineReader<R>) -> impl Stream<Item = Result<Value>> + 'a
where
    R: AsyncRead + Unpin + 'a,
{
    lines.filter_map(|item| {
        future::ready(item.map(|line| parse_response_line(&line)).transpose())
    })
}

/// Read until the next protocol message.
///
/// Returns `Ok(None)` if the stream reaches EOF first.
///
/// # Errors
///
/// Returns [`AppError::Io`](crate::AppError::Io) if reading from the stream fails.
pub async fn next_response<R>(lines: &mut LineReader<R>) -> Result<Option<Value>>
where
    R: AsyncRead + Unpin,
{
    let mut stream = std::pin::pin!(responses(lines));
    stream.next().await.transpose()
}
