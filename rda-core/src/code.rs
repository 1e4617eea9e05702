//! Rendezvous code codec.
//!
//! A code is the base64 rendering of 6 raw bytes: the host's IPv4
//! address (4 bytes) followed by its control port (2 bytes), both
//! big-endian. The code carries no identity and never expires; it is
//! exactly the endpoint it encodes, copied out-of-band by the operator.

use std::net::Ipv4Addr;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::RdaError;

/// Decoded length of a valid code.
const CODE_BYTES: usize = 6;

/// Render `(ip, port)` as a rendezvous code.
pub fn encode(ip: Ipv4Addr, port: u16) -> String {
    let mut raw = [0u8; CODE_BYTES];
    raw[..4].copy_from_slice(&ip.octets());
    raw[4..].copy_from_slice(&port.to_be_bytes());
    STANDARD.encode(raw)
}

/// Recover `(ip, port)` from a rendezvous code.
///
/// Surrounding whitespace is tolerated since operators paste codes by
/// hand. Fails with [`RdaError::MalformedCode`] if the text is not
/// valid base64 or does not decode to exactly 6 bytes.
pub fn decode(code: &str) -> Result<(Ipv4Addr, u16), RdaError> {
    let raw = STANDARD
        .decode(code.trim())
        .map_err(|e| RdaError::MalformedCode(e.to_string()))?;

    let raw: [u8; CODE_BYTES] = raw.as_slice().try_into().map_err(|_| {
        RdaError::MalformedCode(format!("expected {CODE_BYTES} bytes, got {}", raw.len()))
    })?;

    let ip = Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]);
    let port = u16::from_be_bytes([raw[4], raw[5]]);
    Ok((ip, port))
}

// ── Tests ────────────────────────────────────────────────────────
