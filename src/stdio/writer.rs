//! Outbound message writer.
//!
//! Serialises each [`Message`] to a compact single-line JSON string,
//! frames it with [`NdjsonCodec`], and writes and flushes it so the server
//! sees the line immediately rather than when a buffer fills.

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::debug;

use crate::rpc::Message;
use crate::stdio::codec::NdjsonCodec;
use crate::{AppError, Result};

/// Write `message` to `writer` as one `\n`-terminated JSON line, then flush.
///
/// # Errors
///
/// - [`AppError::Protocol`]`("failed to serialise outbound message: …")`
///   if serialisation fails.
/// - [`AppError::Io`]`("write failed: …")` if the write or flush fails
///   (e.g. the server process has exited).
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = serde_json::to_string(message).map_err(|e| {
        AppError::Protocol(format!("failed to serialise outbound message: {e}"))
    })?;

    let mut frame = BytesMut::with_capacity(line.len() + 1);
    NdjsonCodec::new().encode(line, &mut frame)?;

    writer
        .write_all(&frame)
        .await
        .map_err(|e| AppError::Io(format!("write failed: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| AppError::Io(format!("flush failed: {e}")))?;

    debug!(
        method = message.method.as_str(),
        id = message.id,
        notification = message.is_notification(),
        bytes = frame.len(),
        "stdio writer: message sent"
    );
    Ok(())
}
