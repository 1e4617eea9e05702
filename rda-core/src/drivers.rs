//! Per-channel stream drivers.
//!
//! Each established channel is driven by exactly one of these loops,
//! running in its own task. The three channels of a session are never
//! synchronized with each other: a slow screen never delays input and
//! vice versa. Within one channel the stop-and-wait ack keeps frames
//! strictly ordered with at most one in flight.
//!
//! Receiver ordering: the screen driver acknowledges after the frame
//! has been handed to the renderer; the input drivers acknowledge
//! first and then inject, so the sender is already unblocked while the
//! event is applied locally.
//!
//! Every loop runs until its channel or collaborator fails; the
//! session controller turns the first such return into teardown of all
//! three channels. A closed capture feed is the one clean exit.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::channel::FramedChannel;
use crate::collab::{InputSink, ScreenSink, ScreenSource};
use crate::error::RdaError;
use crate::event::InputEvent;

/// Sender role, screen channel: capture, send, wait for the ack.
pub async fn screen_sender<S, C>(
    mut channel: FramedChannel<S>,
    mut source: C,
) -> Result<(), RdaError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: ScreenSource,
{
    debug!("screen sender running");
    loop {
        let frame: Bytes = source.next_frame().await?;
        channel.send_frame(&frame).await?;
        channel.recv_ack().await?;
        trace!(bytes = frame.len(), "frame acknowledged");
    }
}

/// Receiver role, screen channel: receive, render, then ack.
pub async fn screen_receiver<S, R>(
    mut channel: FramedChannel<S>,
    mut sink: R,
) -> Result<(), RdaError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: ScreenSink,
{
    debug!("screen receiver running");
    loop {
        let frame = channel.recv_frame().await?;
        trace!(bytes = frame.len(), "frame received");
        sink.render(frame).await?;
        channel.send_ack().await?;
    }
}

/// Sender role, mouse or keyboard channel: forward captured events.
///
/// Returns `Ok` when the capture feed closes; that is the local
/// operator ending the session, not a fault.
pub async fn input_sender<S>(
    mut channel: FramedChannel<S>,
    mut events: mpsc::Receiver<InputEvent>,
) -> Result<(), RdaError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    debug!("{} sender running", channel.kind());
    while let Some(event) = events.recv().await {
        let payload = event.to_bytes()?;
        channel.send_frame(&payload).await?;
        channel.recv_ack().await?;
        trace!(kind = event.kind_name(), "event acknowledged");
    }
    debug!("{} capture feed closed", channel.kind());
    Ok(())
}

/// Receiver role, mouse or keyboard channel: receive, ack, inject.
pub async fn input_receiver<S, I>(
    mut channel: FramedChannel<S>,
    sink: std::sync::Arc<I>,
) -> Result<(), RdaError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    I: InputSink + ?Sized,
{
    debug!("{} receiver running", channel.kind());
    loop {
        let payload = channel.recv_frame().await?;
        let event = InputEvent::from_bytes(&payload)?;
        channel.send_ack().await?;
        trace!(kind = event.kind_name(), "event received");
        sink.inject(event).await?;
    }
}

// ── Tests ────────────────────────────────────────────────────────
