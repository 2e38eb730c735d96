//! NDJSON line framing for MCP server stdio streams.
//!
//! Decoding never fails on content. A line longer than the configured limit
//! is dropped (with a `WARN`) and decoding carries on with the next line, so
//! a [`FramedRead`](tokio_util::codec::FramedRead) over this codec only
//! stops on real I/O errors or EOF. Bytes that are not valid UTF-8 are
//! replaced rather than rejected; such a line simply fails JSON parsing
//! later and is skipped like any other noise.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::{AppError, Result};

/// Default upper bound on a single inbound line: 64 MiB.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024 * 1024;

/// Newline-delimited line codec with an oversize-line skip.
#[derive(Debug)]
pub struct NdjsonCodec {
    max_line_bytes: usize,
    /// Prefix of the buffer already searched for `\n`.
    scanned: usize,
    /// Inside an oversized line; drop bytes up to the next `\n`.
    discarding: bool,
    /// Count of lines dropped for exceeding the limit.
    dropped_lines: u64,
}

impl NdjsonCodec {
    /// Codec with the [`DEFAULT_MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_line_bytes(DEFAULT_MAX_LINE_BYTES)
    }

    /// Codec that drops lines longer than `max_line_bytes` (terminator
    /// excluded).
    #[must_use]
    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            scanned: 0,
            discarding: false,
            dropped_lines: 0,
        }
    }

    /// Configured line limit.
    #[must_use]
    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    /// Number of oversized lines dropped so far.
    #[must_use]
    pub fn dropped_lines(&self) -> u64 {
        self.dropped_lines
    }

    fn drop_line(&mut self) {
        self.dropped_lines += 1;
        warn!(
            limit = self.max_line_bytes,
            dropped = self.dropped_lines,
            "ndjson codec: line exceeds limit, dropped"
        );
    }
}

impl Default for NdjsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for NdjsonCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let newline = src[self.scanned..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.scanned + offset);

            match newline {
                Some(end) if self.discarding => {
                    // Tail of an oversized line; its start was already counted.
                    src.advance(end + 1);
                    self.scanned = 0;
                    self.discarding = false;
                }
                Some(end) if content_len(src, end) > self.max_line_bytes => {
                    src.advance(end + 1);
                    self.scanned = 0;
                    self.drop_line();
                }
                Some(end) => {
                    let frame = src.split_to(end + 1);
                    self.scanned = 0;
                    return Ok(Some(to_line(&frame[..end])));
                }
                None if self.discarding => {
                    src.clear();
                    self.scanned = 0;
                    return Ok(None);
                }
                None if src.len() > self.max_line_bytes => {
                    src.clear();
                    self.scanned = 0;
                    self.discarding = true;
                    self.drop_line();
                    return Ok(None);
                }
                None => {
                    self.scanned = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        self.scanned = 0;
        if self.discarding || src.is_empty() {
            src.clear();
            self.discarding = false;
            return Ok(None);
        }

        // Unterminated final line; `decode` already dropped it if oversized.
        let frame = src.split_to(src.len());
        Ok(Some(to_line(&frame)))
    }
}

impl Encoder<String> for NdjsonCodec {
    type Error = AppError;

    /// Outbound lines are not length-checked.
    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(item.len() + 1);
        dst.put_slice(item.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Length of the line ending at `end`, without a trailing `\r`.
fn content_len(src: &[u8], end: usize) -> usize {
    if end > 0 && src[end - 1] == b'\r' {
        end - 1
    } else {
        end
    }
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
