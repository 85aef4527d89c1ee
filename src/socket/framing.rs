//! Wire protocol codec for the asciifarm socket protocol.
//!
//! Every message in both directions is a length-prefixed frame:
//!
//! ```text
//! [u32 BE length] [payload: length bytes]
//! ```
//!
//! The payload is opaque to this layer. In practice it is UTF-8 JSON, but
//! nothing here parses it.
//!
//! Reads are tolerant: if the peer closes the stream partway through a
//! frame, whatever was accumulated is returned instead of an error. A
//! header cut short therefore yields an empty payload, which callers treat
//! as "connection closed". [`FrameReader`] turns that convention into an
//! explicit [`Incoming::Closed`].

use anyhow::{bail, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::{FRAME_HEADER_LEN, MAX_FRAME_SIZE, RECV_CHUNK_SIZE};

/// Encode a payload into a wire-format byte vector.
///
/// Returns `[u32 BE length][payload]`.
///
/// # Errors
///
/// Returns an error if the payload does not fit a 32-bit length.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let Ok(length) = u32::try_from(payload.len()) else {
        bail!("Frame too large: {} bytes", payload.len());
    };
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.extend_from_slice(&length.to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Write one frame to `writer`.
///
/// Header and payload go out in a single `write_all`, which keeps looping
/// over short writes until every byte is accepted.
pub async fn send<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read until `length` bytes are accumulated or the peer closes.
///
/// Reads in chunks of at most [`RECV_CHUNK_SIZE`] bytes. A zero-byte read
/// ends the loop early and the short buffer is returned as-is.
pub async fn recvall<R>(reader: &mut R, length: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = Vec::with_capacity(length.min(RECV_CHUNK_SIZE));
    let mut chunk = [0u8; RECV_CHUNK_SIZE];

    while buf.len() < length {
        let want = (length - buf.len()).min(RECV_CHUNK_SIZE);
        let n = reader.read(&mut chunk[..want]).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(buf)
}

/// Read one frame and return its payload.
///
/// No cap is applied to the declared length. A closed stream, including a
/// header shorter than four bytes, yields an empty payload. A payload cut
/// short by closure is returned truncated.
pub async fn receive<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    read_frame(reader, None).await
}

async fn read_frame<R>(reader: &mut R, max_frame_size: Option<u32>) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let header = recvall(reader, FRAME_HEADER_LEN).await?;
    let Ok(header) = <[u8; FRAME_HEADER_LEN]>::try_from(header.as_slice()) else {
        return Ok(Vec::new());
    };

    let length = u32::from_be_bytes(header);
    if let Some(max) = max_frame_size {
        if length > max {
            bail!("Frame too large: {length} bytes (max {max})");
        }
    }

    recvall(reader, length as usize).await
}

/// Outcome of reading one frame through a [`FrameReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A non-empty payload (possibly truncated if the peer closed mid-frame).
    Frame(Vec<u8>),
    /// The peer closed the connection, or sent an empty frame.
    Closed,
}

/// Frame reader over one half of a connection.
///
/// Applies a cap on the declared frame length, which the bare [`receive`]
/// does not, and reports closure as [`Incoming::Closed`].
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    max_frame_size: u32,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a reader with the default [`MAX_FRAME_SIZE`] cap.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Replace the cap on declared frame lengths.
    pub fn with_max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Read the next frame.
    ///
    /// # Errors
    ///
    /// Returns an error on a read failure or when the declared length
    /// exceeds the cap.
    pub async fn next(&mut self) -> Result<Incoming> {
        let payload = read_frame(&mut self.reader, Some(self.max_frame_size)).await?;
        if payload.is_empty() {
            Ok(Incoming::Closed)
        } else {
            Ok(Incoming::Frame(payload))
        }
    }

    /// Give back the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}
