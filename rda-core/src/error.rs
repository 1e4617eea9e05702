//! Domain-specific error types for the RDA session protocol.
//!
//! All fallible operations return `Result<T, RdaError>`.
//! No panics on invalid input, and none of these faults are retried:
//! once a session is streaming, any channel fault is total session loss.

use thiserror::Error;

use crate::channel::ChannelKind;

/// The canonical error type for the RDA protocol.
#[derive(Debug, Error)]
pub enum RdaError {
    // ── Rendezvous ───────────────────────────────────────────────
    /// The rendezvous code is not a valid encoded endpoint.
    #[error("malformed rendezvous code: {0}")]
    MalformedCode(String),

    // ── Listener bootstrap ───────────────────────────────────────
    /// Sequential port probing exhausted its attempt budget.
    #[error("no free port after {attempts} attempts starting at {start}")]
    NoPortAvailable { start: u16, attempts: u16 },

    // ── Negotiation ──────────────────────────────────────────────
    /// A step of session negotiation failed; no partial session is
    /// ever handed out.
    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    // ── Streaming ────────────────────────────────────────────────
    /// A frame or ack could not be read or written on a data channel,
    /// or the peer closed the connection mid-frame.
    #[error("{channel} channel broken: {reason}")]
    ChannelBroken { channel: ChannelKind, reason: String },

    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A capture, render, or injection collaborator failed.
    #[error("collaborator error: {0}")]
    Collaborator(String),
}

impl RdaError {
    /// Build a [`RdaError::ChannelBroken`] for the given channel.
    pub fn broken(channel: ChannelKind, reason: impl Into<String>) -> Self {
        RdaError::ChannelBroken {
            channel,
            reason: reason.into(),
        }
    }

    /// The data channel a fault occurred on, if it names one.
    pub fn channel(&self) -> Option<ChannelKind> {
        match self {
            RdaError::ChannelBroken { channel, .. } => Some(*channel),
            _ => None,
        }
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<serde_json::Error> for RdaError {
    fn from(e: serde_json::Error) -> Self {
        RdaError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = RdaError::MalformedCode("not base64".into());
        assert!(e.to_string().contains("rendezvous"));

        let e = RdaError::NoPortAvailable {
            start: 9990,
            attempts: 1000,
        };
        assert!(e.to_string().contains("9990"));
        assert!(e.to_string().contains("1000"));

        let e = RdaError::broken(ChannelKind::Screen, "connection closed");
        assert!(e.to_string().contains("screen"));
        assert!(e.to_string().contains("connection closed"));
    }

    #[test]
    fn channel_accessor() {
        let e = RdaError::broken(ChannelKind::Mouse, "eof");
        assert_eq!(e.channel(), Some(ChannelKind::Mouse));

        let e = RdaError::NegotiationFailed("nope".into());
        assert_eq!(e.channel(), None);
    }

    #[test]
    fn from_serde_json() {
        let bad = serde_json::from_str::<serde_json::Value>("{");
        let e: RdaError = bad.unwrap_err().into();
        assert!(matches!(e, RdaError::Encoding(_)));
    }
}
