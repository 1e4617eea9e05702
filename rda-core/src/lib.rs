//! # rda-core
//!
//! Core protocol library for RDA remote desktop sessions.
//!
//! This crate contains:
//! - **Rendezvous code**: `code::encode`/`code::decode` for the short
//!   out-of-band endpoint code
//! - **Listener bootstrap**: `bind_next` sequential port probing
//! - **Framed channel**: `FramedChannel`, length-prefixed frames with
//!   stop-and-wait acknowledgment
//! - **Negotiation**: `HostNegotiator` and `connect`, the two sides of
//!   the four-socket handshake
//! - **Input model**: `InputEvent` and its JSON wire encoding,
//!   `ScreenDimensions` for resolution-independent coordinates
//! - **Drivers**: the per-channel send/receive loops
//! - **Lifecycle**: `Session`, `SessionController`, `ShutdownHandle` —
//!   first fault on any channel tears down all three
//! - **Error**: `RdaError` — typed, `thiserror`-based error hierarchy

pub mod channel;
pub mod code;
pub mod collab;
pub mod drivers;
pub mod error;
pub mod event;
pub mod negotiate;
pub mod port;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use channel::{ACK_BYTE, ChannelKind, FramedChannel, MAX_FRAME_SIZE};
pub use collab::{InputSink, ScreenSink, ScreenSource};
pub use error::RdaError;
pub use event::{InputEvent, Key, MouseButton, ScreenDimensions};
pub use negotiate::{
    ChannelPorts, ClientOptions, DEFAULT_CONTROL_PORT, HostNegotiator, HostOptions, connect,
};
pub use port::{MAX_PROBE_ATTEMPTS, bind_next};
pub use session::{Session, SessionController, ShutdownHandle};
