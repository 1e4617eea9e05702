//! Length-prefixed message framing with stop-and-wait acknowledgment.
//!
//! ## Wire format
//!
//! Every data frame on a channel, in either direction:
//! ```text
//! length:  u32  big-endian  (4)
//! payload: [u8]             (exactly `length` bytes)
//! ```
//! After each frame the peer answers with a single acknowledgment byte
//! (`'1'`). A sender must not start a new frame on a channel until the
//! previous frame's ack has arrived, so at most one message per channel
//! is ever in flight.
//!
//! A receiver keeps reading until exactly `length` payload bytes have
//! accumulated, however the transport fragments them. A connection that
//! closes mid-frame is a protocol violation and surfaces as
//! [`RdaError::ChannelBroken`], never as a silently truncated frame.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RdaError;

// ── Constants ────────────────────────────────────────────────────

/// The acknowledgment byte exchanged after every data frame.
pub const ACK_BYTE: u8 = b'1';

/// Upper bound on a single frame's payload. A declared length above
/// this is treated as a protocol violation rather than allocated.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

// ── ChannelKind ──────────────────────────────────────────────────

/// Which of the three session data channels a connection carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Mouse,
    Keyboard,
    Screen,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Mouse => write!(f, "mouse"),
            ChannelKind::Keyboard => write!(f, "keyboard"),
            ChannelKind::Screen => write!(f, "screen"),
        }
    }
}

// ── FramedChannel ────────────────────────────────────────────────

/// One bidirectional session channel carrying length-prefixed frames
/// and their acks.
///
/// Generic over the transport so tests can drive it with in-memory
/// streams; sessions use `FramedChannel<TcpStream>`. Every failure
/// names the channel it occurred on.
#[derive(Debug)]
pub struct FramedChannel<S> {
    stream: S,
    kind: ChannelKind,
    io_timeout: Option<Duration>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> FramedChannel<S> {
    /// Wrap a connected transport as the given channel.
    pub fn new(stream: S, kind: ChannelKind) -> Self {
        Self {
            stream,
            kind,
            io_timeout: None,
        }
    }

    /// Bound every read and write: a peer that stalls longer than
    /// `limit` breaks the channel instead of blocking forever.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.io_timeout = Some(limit);
        self
    }

    /// The channel this connection carries.
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Write one complete frame: length prefix followed by payload.
    pub async fn send_frame(&mut self, payload: &[u8]) -> Result<(), RdaError> {
        if payload.len() > MAX_FRAME_SIZE {
            return Err(RdaError::broken(
                self.kind,
                format!(
                    "refusing to send {} byte frame (limit {MAX_FRAME_SIZE})",
                    payload.len()
                ),
            ));
        }

        let prefix = (payload.len() as u32).to_be_bytes();
        self.write_all_frame(&prefix, "frame length write").await?;
        self.write_all_frame(payload, "frame payload write").await?;
        self.flush().await
    }

    /// Read one complete frame, looping over partial transport reads
    /// until the declared payload length has accumulated.
    pub async fn recv_frame(&mut self) -> Result<Bytes, RdaError> {
        let mut prefix = [0u8; 4];
        self.read_exact_frame(&mut prefix, "frame length read").await?;

        let len = u32::from_be_bytes(prefix) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(RdaError::broken(
                self.kind,
                format!("peer declared {len} byte frame (limit {MAX_FRAME_SIZE})"),
            ));
        }

        let mut payload = vec![0u8; len];
        self.read_exact_frame(&mut payload, "frame payload read")
            .await?;
        Ok(Bytes::from(payload))
    }

    /// Acknowledge the most recently received frame.
    pub async fn send_ack(&mut self) -> Result<(), RdaError> {
        self.write_all_frame(&[ACK_BYTE], "ack write").await?;
        self.flush().await
    }

    /// Wait for the peer's acknowledgment of the frame just sent.
    pub async fn recv_ack(&mut self) -> Result<(), RdaError> {
        let mut byte = [0u8; 1];
        self.read_exact_frame(&mut byte, "ack read").await?;
        if byte[0] != ACK_BYTE {
            return Err(RdaError::broken(
                self.kind,
                format!("unexpected ack byte {:#04x}", byte[0]),
            ));
        }
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn read_exact_frame(&mut self, buf: &mut [u8], what: &str) -> Result<(), RdaError> {
        let kind = self.kind;
        let result = match self.io_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.stream.read_exact(buf)).await {
                Ok(inner) => inner,
                Err(_) => {
                    return Err(RdaError::broken(
                        kind,
                        format!("{what}: peer stalled for {}ms", limit.as_millis()),
                    ));
                }
            },
            None => self.stream.read_exact(buf).await,
        };

        result.map(|_| ()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                RdaError::broken(kind, format!("{what}: connection closed"))
            } else {
                RdaError::broken(kind, format!("{what}: {e}"))
            }
        })
    }

    async fn write_all_frame(&mut self, buf: &[u8], what: &str) -> Result<(), RdaError> {
        let kind = self.kind;
        let result = match self.io_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.stream.write_all(buf)).await {
                Ok(inner) => inner,
                Err(_) => {
                    return Err(RdaError::broken(
                        kind,
                        format!("{what}: peer stalled for {}ms", limit.as_millis()),
                    ));
                }
            },
            None => self.stream.write_all(buf).await,
        };

        result.map_err(|e| RdaError::broken(kind, format!("{what}: {e}")))
    }

    async fn flush(&mut self) -> Result<(), RdaError> {
        let kind = self.kind;
        self.stream
            .flush()
            .await
            .map_err(|e| RdaError::broken(kind, format!("flush: {e}")))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test]
    async fn frame_roundtrip() {
        let (a, b) = tokio::io::duplex(4096);
        let mut tx = FramedChannel::new(a, ChannelKind::Screen);
        let mut rx = FramedChannel::new(b, ChannelKind::Screen);

        tx.send_frame(b"hello").await.unwrap();
        let frame = rx.recv_frame().await.unwrap();
        assert_eq!(&frame[..], b"hello");
    }

    #[tokio::test]
    async fn empty_frame_roundtrip() {
        let (a, b) = tokio::io::duplex(64);
        let mut tx = FramedChannel::new(a, ChannelKind::Mouse);
        let mut rx = FramedChannel::new(b, ChannelKind::Mouse);

        tx.send_frame(b"").await.unwrap();
        let frame = rx.recv_frame().await.unwrap();
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn large_frame_spans_many_partial_reads() {
        // A 64 byte duplex pipe forces the 8 KiB payload through many
        // partial reads and writes.
        let (a, b) = tokio::io::duplex(64);
        let mut tx = FramedChannel::new(a, ChannelKind::Screen);
        let mut rx = FramedChannel::new(b, ChannelKind::Screen);

        let payload: Vec<u8> = (0..8192u32).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();

        let sender = tokio::spawn(async move {
            tx.send_frame(&payload).await.unwrap();
            tx
        });

        let frame = rx.recv_frame().await.unwrap();
        assert_eq!(&frame[..], &expected[..]);
        sender.await.unwrap();
    }

    #[tokio::test]
    async fn recv_frame_tolerates_scripted_fragmentation() {
        // Length prefix split across reads, payload split again.
        let mock = tokio_test::io::Builder::new()
            .read(&[0, 0])
            .read(&[0, 11])
            .read(b"hello")
            .read(b" world")
            .build();

        let mut chan = FramedChannel::new(mock, ChannelKind::Keyboard);
        let frame = chan.recv_frame().await.unwrap();
        assert_eq!(&frame[..], b"hello world");
    }

    #[tokio::test]
    async fn closed_mid_frame_is_channel_broken() {
        let (mut a, b) = tokio::io::duplex(64);
        a.write_all(&10u32.to_be_bytes()).await.unwrap();
        a.write_all(b"abc").await.unwrap();
        drop(a);

        let mut rx = FramedChannel::new(b, ChannelKind::Screen);
        let err = rx.recv_frame().await.unwrap_err();
        assert_eq!(err.channel(), Some(ChannelKind::Screen));
        assert!(err.to_string().contains("connection closed"));
    }

    #[tokio::test]
    async fn oversized_declared_length_rejected() {
        let (mut a, b) = tokio::io::duplex(64);
        a.write_all(&u32::MAX.to_be_bytes()).await.unwrap();

        let mut rx = FramedChannel::new(b, ChannelKind::Screen);
        let err = rx.recv_frame().await.unwrap_err();
        assert!(matches!(err, RdaError::ChannelBroken { .. }));
        assert!(err.to_string().contains("limit"));
    }

    #[tokio::test]
    async fn bad_ack_byte_rejected() {
        let (mut a, b) = tokio::io::duplex(64);
        a.write_all(b"x").await.unwrap();

        let mut rx = FramedChannel::new(b, ChannelKind::Mouse);
        let err = rx.recv_ack().await.unwrap_err();
        assert!(err.to_string().contains("unexpected ack byte"));
    }

    #[tokio::test]
    async fn stalled_peer_breaks_channel_when_timeout_set() {
        let (_a, b) = tokio::io::duplex(64);
        let mut rx = FramedChannel::new(b, ChannelKind::Keyboard).with_timeout(ms(50));

        let err = rx.recv_frame().await.unwrap_err();
        assert_eq!(err.channel(), Some(ChannelKind::Keyboard));
        assert!(err.to_string().contains("stalled"));
    }

    #[tokio::test]
    async fn second_frame_held_back_until_ack() {
        let (a, b) = tokio::io::duplex(4096);
        let mut tx = FramedChannel::new(a, ChannelKind::Screen);
        let mut rx = FramedChannel::new(b, ChannelKind::Screen);

        let sender = tokio::spawn(async move {
            tx.send_frame(b"one").await.unwrap();
            tx.recv_ack().await.unwrap();
            tx.send_frame(b"two").await.unwrap();
            tx.recv_ack().await.unwrap();
        });

        let first = rx.recv_frame().await.unwrap();
        assert_eq!(&first[..], b"one");

        // With the ack withheld, the second frame must not be
        // observable and the sender must still be blocked.
        let held = tokio::time::timeout(ms(100), rx.recv_frame()).await;
        assert!(held.is_err());
        assert!(!sender.is_finished());

        rx.send_ack().await.unwrap();
        let second = rx.recv_frame().await.unwrap();
        assert_eq!(&second[..], b"two");
        rx.send_ack().await.unwrap();

        sender.await.unwrap();
    }

    #[test]
    fn channel_kind_display() {
        assert_eq!(ChannelKind::Mouse.to_string(), "mouse");
        assert_eq!(ChannelKind::Keyboard.to_string(), "keyboard");
        assert_eq!(ChannelKind::Screen.to_string(), "screen");
    }
}
