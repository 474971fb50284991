//! Distributed mode protocol
//!
//! Walkers running as separate processes report to the coordinator over TCP.
//! Frames are serialized with MessagePack (rmp-serde).
//!
//! # Message Flow
//!
//! ```text
//! Walker (rank r)                 Coordinator
//!     |                              |
//!     |-------- HELLO(r) ----------->|
//!     |                              |
//!     |     ... walk locally ...     |
//!     |                              |
//!     |---- PAYLOAD(Completion) ---->|
//!     |                              |
//!     |-------- close -------------->|
//! ```
//!
//! A walker that fails after HELLO sends `PAYLOAD(Abort)` instead, or simply
//! drops the connection; both stop the run.
//!
//! # Message Framing
//!
//! Each frame is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: frame length][N bytes: MessagePack-serialized frame]
//! ```

use crate::transport::{Message, Rank, TransportError};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Walker and coordinator must agree on it.
pub const PROTOCOL_VERSION: u32 = 1;

/// Frames larger than this are rejected before allocation
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// First frame on every connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    pub protocol_version: u32,
    pub rank: Rank,
    /// Hostname of the walker process
    pub node_id: String,
}

/// Wire frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    Hello(HelloMessage),
    Payload(Message),
}

/// Serialize a frame to bytes with length prefix
pub fn serialize_frame(frame: &Frame) -> Result<Vec<u8>, TransportError> {
    let body = rmp_serde::to_vec(frame).map_err(|e| TransportError::Codec(e.to_string()))?;

    let len = body.len() as u32;
    let mut framed = Vec::with_capacity(4 + body.len());
    framed.extend_from_slice(&len.to_le_bytes());
    framed.extend_from_slice(&body);

    Ok(framed)
}

/// Read one frame from a stream
///
/// Returns `Ok(None)` only when the stream ends exactly at a frame boundary.
/// An end of stream inside the length prefix or the body is an error.
pub async fn read_frame<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Option<Frame>, TransportError> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = stream.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(TransportError::Codec(format!(
                "connection closed inside frame length ({} of 4 bytes)",
                filled
            )));
        }
        filled += n;
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::Codec(format!(
            "frame too large: {} bytes (max {})",
            len, MAX_FRAME_LEN
        )));
    }

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;

    let frame = rmp_serde::from_slice(&body).map_err(|e| TransportError::Codec(e.to_string()))?;
    Ok(Some(frame))
}

/// Write one frame and flush
pub async fn write_frame<S: AsyncWrite + Unpin>(stream: &mut S, frame: &Frame) -> Result<(), TransportError> {
    let framed = serialize_frame(frame)?;
    stream.write_all(&framed).await?;
    stream.flush().await?;
    Ok(())
}
