//! Session negotiation, both sides of the rendezvous handshake.
//!
//! ## Handshake
//!
//! ```text
//! Host                                    Client
//! ────                                    ──────
//! bind control listener (9990, probing up)
//! print rendezvous code ─── out of band ──► decode code
//! accept  ◄──────────────────────────────── connect control
//! bind mouse/keyboard/screen listeners
//!   (consecutive ports after control)
//! {"mouse":p,"keyboard":p,"screen":p} ───► read one JSON message
//! accept mouse  ◄────────────────────────── connect mouse
//! accept keyboard  ◄─────────────────────── connect keyboard
//! accept screen  ◄───────────────────────── connect screen
//! close control                             close control
//! ```
//!
//! The control connection carries exactly one unframed JSON message.
//! Failure at any step fails the whole negotiation; neither side ever
//! holds a partial session or a dangling listener afterwards.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::code;
use crate::error::RdaError;
use crate::port;
use crate::session::Session;

/// Preferred control port, probed upward when taken.
pub const DEFAULT_CONTROL_PORT: u16 = 9990;

/// Hard cap on the control advertisement size.
const CONTROL_MESSAGE_LIMIT: usize = 1024;

// ── Control message ──────────────────────────────────────────────

/// The single advertisement the host sends over the control
/// connection: one port per data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPorts {
    pub mouse: u16,
    pub keyboard: u16,
    pub screen: u16,
}

// ── Options ──────────────────────────────────────────────────────

/// Knobs for the hosting side.
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Interface to bind all listeners on.
    pub bind_ip: IpAddr,
    /// First control port candidate.
    pub start_port: u16,
    /// Address put into the rendezvous code. `None` detects the
    /// machine's outbound IPv4.
    pub advertise_ip: Option<Ipv4Addr>,
    /// Stall bound applied to every established channel; `None`
    /// blocks forever.
    pub io_timeout: Option<Duration>,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            start_port: DEFAULT_CONTROL_PORT,
            advertise_ip: None,
            io_timeout: None,
        }
    }
}

/// Knobs for the dialing side.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Bound on each TCP connect, control and data alike.
    pub connect_timeout: Option<Duration>,
    /// Stall bound applied to every established channel.
    pub io_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            io_timeout: None,
        }
    }
}

// ── Host side ────────────────────────────────────────────────────

/// The hosting side of the handshake.
///
/// [`bind`](Self::bind) reserves the control listener so the code can
/// be shown to the operator before anyone connects;
/// [`establish`](Self::establish) then runs the rest of the handshake
/// to completion.
pub struct HostNegotiator {
    control: TcpListener,
    control_port: u16,
    advertise_ip: Ipv4Addr,
    bind_ip: IpAddr,
    io_timeout: Option<Duration>,
}

impl HostNegotiator {
    /// Bind the control listener, probing upward from the preferred
    /// port, and resolve the address to advertise.
    pub async fn bind(options: HostOptions) -> Result<Self, RdaError> {
        let (control, control_port) = port::bind_next(options.bind_ip, options.start_port).await?;
        let advertise_ip = match options.advertise_ip {
            Some(ip) => ip,
            None => local_ipv4()?,
        };
        info!("control listener on {}:{control_port}", options.bind_ip);

        Ok(Self {
            control,
            control_port,
            advertise_ip,
            bind_ip: options.bind_ip,
            io_timeout: options.io_timeout,
        })
    }

    /// The rendezvous code for the operator to pass out-of-band.
    pub fn code(&self) -> String {
        code::encode(self.advertise_ip, self.control_port)
    }

    /// Port the control listener actually bound.
    pub fn control_port(&self) -> u16 {
        self.control_port
    }

    /// Address baked into the code.
    pub fn advertise_ip(&self) -> Ipv4Addr {
        self.advertise_ip
    }

    /// Accept one client and bring up the full session.
    ///
    /// Steps, strictly in order: accept the control connection; bind
    /// the mouse, keyboard, and screen listeners on consecutive ports
    /// after the control port; advertise the three ports; accept each
    /// data channel in the same order; close control. Returns the
    /// session together with the advertised ports.
    pub async fn establish(self) -> Result<(Session, ChannelPorts), RdaError> {
        let (mut control, peer) = self
            .control
            .accept()
            .await
            .map_err(|e| RdaError::NegotiationFailed(format!("control accept: {e}")))?;
        info!("client connected from {peer}");
        drop(self.control);

        let (mouse_listener, mouse) =
            port::bind_next(self.bind_ip, port::successor(self.control_port)?).await?;
        let (keyboard_listener, keyboard) =
            port::bind_next(self.bind_ip, port::successor(mouse)?).await?;
        let (screen_listener, screen) =
            port::bind_next(self.bind_ip, port::successor(keyboard)?).await?;

        let ports = ChannelPorts {
            mouse,
            keyboard,
            screen,
        };
        let advert = serde_json::to_vec(&ports)
            .map_err(|e| RdaError::NegotiationFailed(format!("advertisement encode: {e}")))?;
        control
            .write_all(&advert)
            .await
            .map_err(|e| RdaError::NegotiationFailed(format!("advertisement send: {e}")))?;
        debug!("advertised channel ports {ports:?}");

        let mouse = accept_channel(mouse_listener, "mouse").await?;
        let keyboard = accept_channel(keyboard_listener, "keyboard").await?;
        let screen = accept_channel(screen_listener, "screen").await?;

        control.shutdown().await.ok();
        info!("session established");
        Ok((Session::new(mouse, keyboard, screen, self.io_timeout), ports))
    }
}

/// Accept exactly one connection, then drop the listener.
async fn accept_channel(listener: TcpListener, name: &str) -> Result<TcpStream, RdaError> {
    let (stream, _) = listener
        .accept()
        .await
        .map_err(|e| RdaError::NegotiationFailed(format!("{name} accept: {e}")))?;
    stream
        .set_nodelay(true)
        .map_err(|e| RdaError::NegotiationFailed(format!("{name} nodelay: {e}")))?;
    Ok(stream)
}

// ── Client side ──────────────────────────────────────────────────

/// Dial a rendezvous code and bring up the full session.
///
/// Decodes the code (failing with [`RdaError::MalformedCode`] before
/// any connection attempt), dials the control endpoint, reads the
/// port advertisement, dials mouse, keyboard, and screen in that
/// order, and closes control.
pub async fn connect(code: &str, options: ClientOptions) -> Result<Session, RdaError> {
    let (ip, control_port) = code::decode(code)?;
    let ip = IpAddr::V4(ip);

    let mut control = dial(ip, control_port, options.connect_timeout).await?;
    let ports = read_control_message(&mut control).await?;
    debug!("received channel ports {ports:?}");

    let mouse = dial(ip, ports.mouse, options.connect_timeout).await?;
    let keyboard = dial(ip, ports.keyboard, options.connect_timeout).await?;
    let screen = dial(ip, ports.screen, options.connect_timeout).await?;

    control.shutdown().await.ok();
    info!("session established with {ip}");
    Ok(Session::new(mouse, keyboard, screen, options.io_timeout))
}

async fn dial(ip: IpAddr, port: u16, limit: Option<Duration>) -> Result<TcpStream, RdaError> {
    let connect = TcpStream::connect((ip, port));
    let stream = match limit {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| RdaError::NegotiationFailed(format!("connect {ip}:{port}: timed out")))?,
        None => connect.await,
    }
    .map_err(|e| RdaError::NegotiationFailed(format!("connect {ip}:{port}: {e}")))?;

    stream
        .set_nodelay(true)
        .map_err(|e| RdaError::NegotiationFailed(format!("nodelay {ip}:{port}: {e}")))?;
    Ok(stream)
}

/// Read the host's single JSON advertisement.
///
/// The message is unframed, so reads accumulate until the document
/// parses; TCP is free to hand it over in pieces.
async fn read_control_message<R>(control: &mut R) -> Result<ChannelPorts, RdaError>
where
    R: AsyncRead + Unpin,
{
    let mut message = Vec::with_capacity(64);
    let mut chunk = [0u8; 256];

    loop {
        let n = control
            .read(&mut chunk)
            .await
            .map_err(|e| RdaError::NegotiationFailed(format!("control read: {e}")))?;
        if n == 0 {
            return Err(RdaError::NegotiationFailed(
                "control connection closed before the advertisement".into(),
            ));
        }

        message.extend_from_slice(&chunk[..n]);
        if message.len() > CONTROL_MESSAGE_LIMIT {
            return Err(RdaError::NegotiationFailed(
                "oversized control advertisement".into(),
            ));
        }

        match serde_json::from_slice::<ChannelPorts>(&message) {
            Ok(ports) => return Ok(ports),
            // The document is still arriving.
            Err(e) if e.is_eof() => continue,
            Err(e) => {
                return Err(RdaError::NegotiationFailed(format!(
                    "bad control advertisement: {e}"
                )));
            }
        }
    }
}

// ── Local address detection ──────────────────────────────────────

/// The machine's outbound IPv4, found by routing a UDP socket at a
/// public address. No packet is sent.
pub fn local_ipv4() -> Result<Ipv4Addr, RdaError> {
    let probe = std::net::UdpSocket::bind("0.0.0.0:0")
        .map_err(|e| RdaError::NegotiationFailed(format!("local address probe: {e}")))?;
    probe
        .connect("8.8.8.8:80")
        .map_err(|e| RdaError::NegotiationFailed(format!("local address probe: {e}")))?;
    match probe
        .local_addr()
        .map_err(|e| RdaError::NegotiationFailed(format!("local address probe: {e}")))?
        .ip()
    {
        IpAddr::V4(ip) => Ok(ip),
        IpAddr::V6(ip) => Err(RdaError::NegotiationFailed(format!(
            "local address {ip} is not IPv4"
        ))),
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ports_wire_names() {
        let ports = ChannelPorts {
            mouse: 9991,
            keyboard: 9992,
            screen: 9993,
        };
        let json = serde_json::to_string(&ports).unwrap();
        assert_eq!(json, r#"{"mouse":9991,"keyboard":9992,"screen":9993}"#);

        let back: ChannelPorts = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ports);
    }

    #[tokio::test]
    async fn control_message_survives_fragmentation() {
        let full = br#"{"mouse":9991,"keyboard":9992,"screen":9993}"#;
        let (head, tail) = full.split_at(13);
        let mut mock = tokio_test::io::Builder::new().read(head).read(tail).build();

        let ports = read_control_message(&mut mock).await.unwrap();
        assert_eq!(
            ports,
            ChannelPorts {
                mouse: 9991,
                keyboard: 9992,
                screen: 9993
            }
        );
    }

    #[tokio::test]
    async fn control_message_rejects_garbage() {
        let mut mock = tokio_test::io::Builder::new().read(b"[1, 2, 3]").build();
        let err = read_control_message(&mut mock).await.unwrap_err();
        assert!(matches!(err, RdaError::NegotiationFailed(_)));
    }

    #[tokio::test]
    async fn control_message_rejects_early_close() {
        let (mut a, mut b) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut a, br#"{"mouse":99"#)
            .await
            .unwrap();
        drop(a);

        let err = read_control_message(&mut b).await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn malformed_code_fails_before_any_dialing() {
        let err = connect("@@not-a-code@@", ClientOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RdaError::MalformedCode(_)));
    }
}
