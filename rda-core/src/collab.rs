//! Collaborator seams for the capture, render, and injection layers.
//!
//! The core never interprets pixels or touches the OS input stack; it
//! moves opaque payloads and decoded events across these traits. Input
//! *capture* has no trait: OS hooks push events, so the sender driver
//! consumes a `tokio::sync::mpsc::Receiver<InputEvent>` fed by whatever
//! capture layer the embedding process runs.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RdaError;

/// Produces already-encoded screen frames on demand.
///
/// The payload encoding (JPEG, raw, anything) is owned by the
/// implementation; the session treats it as opaque bytes.
#[async_trait]
pub trait ScreenSource: Send {
    async fn next_frame(&mut self) -> Result<Bytes, RdaError>;
}

/// Consumes received screen frames and paints them.
#[async_trait]
pub trait ScreenSink: Send {
    async fn render(&mut self, frame: Bytes) -> Result<(), RdaError>;
}

/// Applies received input events to the local machine.
///
/// Shared by the mouse and keyboard drivers, so it takes `&self` and
/// must be safe to call from both.
#[async_trait]
pub trait InputSink: Send + Sync {
    async fn inject(&self, event: crate::event::InputEvent) -> Result<(), RdaError>;
}
