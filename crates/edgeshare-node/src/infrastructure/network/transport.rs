//! Async frame transport over a reliable byte stream.
//!
//! Reading keeps going across partial reads until the whole prefix or payload
//! has arrived; a peer that closes mid-read surfaces as
//! [`TransportError::Closed`]. Writing goes through [`FrameWriter`], which
//! serialises concurrent callers so frames never interleave on the wire.

use std::io;

use edgeshare_core::protocol::framing::LENGTH_PREFIX_LEN;
use edgeshare_core::protocol::{frame_payload, parse_length_prefix, FrameError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Errors raised while moving frames over a stream.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the stream, possibly in the middle of a frame.
    #[error("connection closed by peer")]
    Closed,
    /// The declared frame length is zero or above the cap.
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("stream I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => TransportError::Closed,
            _ => TransportError::Io(err),
        }
    }
}

/// Reads one frame and returns its payload.
///
/// The length prefix is validated before any payload memory is allocated.
///
/// # Errors
///
/// [`TransportError::Frame`] for an invalid length, [`TransportError::Closed`]
/// if the stream ends before the frame is complete.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    reader.read_exact(&mut prefix).await?;
    let len = parse_length_prefix(prefix)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Writes one complete frame and flushes the stream.
///
/// # Errors
///
/// [`TransportError::Frame`] if the payload is empty or oversized; I/O
/// failures otherwise.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let frame = frame_payload(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Write half of a connection shared by concurrent senders.
pub struct FrameWriter<W> {
    inner: Mutex<W>,
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    /// Sends one frame; other callers wait until it is fully written.
    pub async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.inner.lock().await;
        write_frame(&mut *writer, payload).await
    }

    /// Shuts down the write direction of the stream.
    pub async fn close(&self) {
        let mut writer = self.inner.lock().await;
        let _ = writer.shutdown().await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edgeshare_core::protocol::MAX_FRAME_LEN;
    use tokio_test::io::Builder;

    use super::*;

    // ── read_frame ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_read_frame_returns_payload() {
        let mut stream = Builder::new().read(&[0, 0, 0, 3]).read(b"abc").build();

        let payload = read_frame(&mut stream).await.expect("frame must parse");

        assert_eq!(payload, b"abc");
    }

    #[tokio::test]
    async fn test_read_frame_reassembles_partial_reads() {
        let mut stream = Builder::new()
            .read(&[0, 0])
            .read(&[0, 5])
            .read(b"he")
            .read(b"l")
            .read(b"lo")
            .build();

        let payload = read_frame(&mut stream).await.expect("frame must parse");

        assert_eq!(payload, b"hello");
    }

    #[tokio::test]
    async fn test_read_frame_reports_closed_mid_payload() {
        let mut stream = Builder::new().read(&[0, 0, 0, 5]).read(b"ab").build();

        let err = read_frame(&mut stream).await.unwrap_err();

        assert!(matches!(err, TransportError::Closed), "got {err:?}");
    }

    #[tokio::test]
    async fn test_read_frame_reports_closed_mid_prefix() {
        let mut stream = Builder::new().read(&[0, 0]).build();

        let err = read_frame(&mut stream).await.unwrap_err();

        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn test_read_frame_rejects_zero_length() {
        let mut stream = Builder::new().read(&[0, 0, 0, 0]).build();

        let err = read_frame(&mut stream).await.unwrap_err();

        assert!(matches!(err, TransportError::Frame(FrameError::InvalidLength(0))));
    }

    #[tokio::test]
    async fn test_read_frame_rejects_negative_and_oversized_lengths() {
        let over = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        for prefix in [[0xFF, 0xFF, 0xFF, 0xFF], [0x80, 0, 0, 0], over] {
            let mut stream = Builder::new().read(&prefix).build();
            let err = read_frame(&mut stream).await.unwrap_err();
            assert!(matches!(err, TransportError::Frame(_)), "prefix {prefix:?}");
        }
    }

    // ── write_frame ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_write_frame_prepends_big_endian_length() {
        let mut stream = Builder::new().write(&[0, 0, 0, 2, 0x0A, 0x0B]).build();

        write_frame(&mut stream, &[0x0A, 0x0B]).await.expect("write must succeed");
    }

    #[tokio::test]
    async fn test_write_frame_rejects_empty_payload() {
        let mut stream = Builder::new().build();

        let err = write_frame(&mut stream, &[]).await.unwrap_err();

        assert!(matches!(err, TransportError::Frame(FrameError::InvalidLength(0))));
    }

    // ── FrameWriter ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_concurrent_senders_never_interleave_frames() {
        const SENDERS: usize = 8;
        const FRAMES_EACH: usize = 50;

        let (client, mut server) = tokio::io::duplex(1024);
        let writer = Arc::new(FrameWriter::new(client));

        let mut tasks = Vec::new();
        for sender in 0..SENDERS {
            let writer = Arc::clone(&writer);
            tasks.push(tokio::spawn(async move {
                for seq in 0..FRAMES_EACH {
                    // Variable sizes so that partial writes are likely.
                    let len = 2 + (sender * 37 + seq * 11) % 700;
                    let mut payload = vec![sender as u8; len];
                    payload[0] = seq as u8;
                    writer.send(&payload).await.expect("send must succeed");
                }
            }));
        }

        let reader = tokio::spawn(async move {
            let mut next_seq = [0usize; SENDERS];
            for _ in 0..SENDERS * FRAMES_EACH {
                let payload = read_frame(&mut server).await.expect("frame must parse");
                let sender = payload[1] as usize;
                assert!(
                    payload[1..].iter().all(|&b| b as usize == sender),
                    "frame body mixes bytes from different senders"
                );
                assert_eq!(payload[0] as usize, next_seq[sender], "per-sender order");
                next_seq[sender] += 1;
            }
        });

        for task in tasks {
            task.await.unwrap();
        }
        reader.await.unwrap();
    }
}
