//! Listener bootstrap with sequential port probing.
//!
//! The host asks for a preferred port and takes the first free one at
//! or above it. Probing is capped so a saturated port range reports
//! [`RdaError::NoPortAvailable`] instead of spinning forever.

use std::net::{IpAddr, SocketAddr};

use tokio::net::TcpListener;
use tracing::debug;

use crate::error::RdaError;

/// Probing budget for one [`bind_next`] call.
pub const MAX_PROBE_ATTEMPTS: u16 = 1000;

/// Bind a listener at `start_port`, probing upward on conflict.
///
/// Returns the listener together with the port actually bound. Probing
/// stops at [`MAX_PROBE_ATTEMPTS`] or at the top of the port range,
/// whichever comes first.
pub async fn bind_next(ip: IpAddr, start_port: u16) -> Result<(TcpListener, u16), RdaError> {
    let mut port = start_port;
    let mut attempts: u16 = 0;

    loop {
        if attempts == MAX_PROBE_ATTEMPTS {
            return Err(RdaError::NoPortAvailable {
                start: start_port,
                attempts,
            });
        }

        match TcpListener::bind(SocketAddr::new(ip, port)).await {
            // Report the port the OS actually bound, which differs
            // from the request when probing starts at 0.
            Ok(listener) => match listener.local_addr() {
                Ok(addr) => {
                    debug!("listener bound on {addr}");
                    return Ok((listener, addr.port()));
                }
                Err(e) => debug!("port {port} unusable: {e}"),
            },
            Err(e) => debug!("port {port} unavailable: {e}"),
        }

        attempts += 1;
        port = match port.checked_add(1) {
            Some(next) => next,
            None => {
                return Err(RdaError::NoPortAvailable {
                    start: start_port,
                    attempts,
                });
            }
        };
    }
}

/// The next port after `port`, or [`RdaError::NoPortAvailable`] at the
/// top of the range. Used for the consecutive channel-port scheme.
pub fn successor(port: u16) -> Result<u16, RdaError> {
    port.checked_add(1).ok_or(RdaError::NoPortAvailable {
        start: port,
        attempts: 0,
    })
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCAL: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn binds_preferred_port_when_free() {
        // An OS-assigned port is free by construction; re-binding it
        // after release must succeed at the same number.
        let (probe, port) = bind_next(LOCAL, 0).await.unwrap();
        drop(probe);
        let (_listener, bound) = bind_next(LOCAL, port).await.unwrap();
        assert_eq!(bound, port);
    }

    #[tokio::test]
    async fn probes_past_occupied_ports() {
        let (hold_a, base) = bind_next(LOCAL, 0).await.unwrap();
        // Occupy base, expect the probe starting there to skip ahead.
        let (listener, bound) = bind_next(LOCAL, base).await.unwrap();
        assert!(bound > base);
        drop(hold_a);
        drop(listener);
    }

    #[tokio::test]
    async fn range_top_reports_no_port() {
        // Occupy 65535 so the probe has nowhere left to go.
        let hold = TcpListener::bind(SocketAddr::new(LOCAL, 65535)).await;
        if let Ok(_hold) = hold {
            let err = bind_next(LOCAL, 65535).await.unwrap_err();
            assert!(matches!(err, RdaError::NoPortAvailable { .. }));
        }
    }

    #[test]
    fn successor_overflows_to_error() {
        assert_eq!(successor(9990).unwrap(), 9991);
        assert!(matches!(
            successor(u16::MAX).unwrap_err(),
            RdaError::NoPortAvailable { .. }
        ));
    }
}
