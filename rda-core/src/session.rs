//! Session ownership and lifecycle.
//!
//! A [`Session`] owns the three established data channels. The
//! [`SessionController`] runs one driver task per channel and tears
//! the whole session down the first time any driver returns, whether
//! that is a channel fault, a collaborator fault, or a clean stop.
//! Teardown is cancellation-based: the first completion cancels the
//! remaining drivers, and each driver's channel closes when its task
//! unwinds. [`ShutdownHandle::shutdown`] may be called any number of
//! times from any thread.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::channel::{ChannelKind, FramedChannel};
use crate::collab::{InputSink, ScreenSink, ScreenSource};
use crate::drivers;
use crate::error::RdaError;
use crate::event::InputEvent;

// ── Session ──────────────────────────────────────────────────────

/// The three connected data channels of one negotiated session.
///
/// Exclusively owned by the process that negotiated it; each channel
/// is handed to exactly one driver task.
#[derive(Debug)]
pub struct Session {
    mouse: FramedChannel<TcpStream>,
    keyboard: FramedChannel<TcpStream>,
    screen: FramedChannel<TcpStream>,
}

impl Session {
    /// Wrap the three accepted or dialed connections. `io_timeout`
    /// bounds every channel operation; `None` blocks until the peer
    /// delivers or closes.
    pub fn new(
        mouse: TcpStream,
        keyboard: TcpStream,
        screen: TcpStream,
        io_timeout: Option<Duration>,
    ) -> Self {
        fn wrap(
            stream: TcpStream,
            kind: ChannelKind,
            io_timeout: Option<Duration>,
        ) -> FramedChannel<TcpStream> {
            let channel = FramedChannel::new(stream, kind);
            match io_timeout {
                Some(limit) => channel.with_timeout(limit),
                None => channel,
            }
        }

        Self {
            mouse: wrap(mouse, ChannelKind::Mouse, io_timeout),
            keyboard: wrap(keyboard, ChannelKind::Keyboard, io_timeout),
            screen: wrap(screen, ChannelKind::Screen, io_timeout),
        }
    }

    /// Split into the mouse, keyboard, and screen channels.
    pub fn into_channels(
        self,
    ) -> (
        FramedChannel<TcpStream>,
        FramedChannel<TcpStream>,
        FramedChannel<TcpStream>,
    ) {
        (self.mouse, self.keyboard, self.screen)
    }
}

// ── ShutdownHandle ───────────────────────────────────────────────

/// Requests teardown of a running session.
///
/// Cloneable and idempotent: concurrent or repeated calls all resolve
/// to the same single teardown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    /// End the session. Safe to call from any task or thread, any
    /// number of times.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether teardown has been requested or has already happened.
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}

// ── SessionController ────────────────────────────────────────────

/// Runs a session's three drivers and owns their shared fate.
///
/// The first driver to return for any reason cancels the others; the
/// controller resolves once all three have unwound, with the first
/// error observed, or `Ok` for a clean stop.
#[derive(Debug, Default)]
pub struct SessionController {
    token: CancellationToken,
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A handle that tears this session down from elsewhere.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            token: self.token.clone(),
        }
    }

    /// Run the accepting side: render incoming screen frames, inject
    /// incoming mouse and keyboard events.
    pub async fn run_host<R, I>(self, session: Session, render: R, inject: I) -> Result<(), RdaError>
    where
        R: ScreenSink + 'static,
        I: InputSink + 'static,
    {
        let (mouse, keyboard, screen) = session.into_channels();
        let inject = Arc::new(inject);

        let mut set = JoinSet::new();
        set.spawn(guarded(
            self.token.clone(),
            drivers::screen_receiver(screen, render),
        ));
        set.spawn(guarded(
            self.token.clone(),
            drivers::input_receiver(mouse, Arc::clone(&inject)),
        ));
        set.spawn(guarded(
            self.token.clone(),
            drivers::input_receiver(keyboard, inject),
        ));

        supervise(self.token, set).await
    }

    /// Run the dialing side: stream captured screen frames and the
    /// two captured input feeds.
    pub async fn run_client<C>(
        self,
        session: Session,
        capture: C,
        mouse_events: mpsc::Receiver<InputEvent>,
        keyboard_events: mpsc::Receiver<InputEvent>,
    ) -> Result<(), RdaError>
    where
        C: ScreenSource + 'static,
    {
        let (mouse, keyboard, screen) = session.into_channels();

        let mut set = JoinSet::new();
        set.spawn(guarded(
            self.token.clone(),
            drivers::screen_sender(screen, capture),
        ));
        set.spawn(guarded(
            self.token.clone(),
            drivers::input_sender(mouse, mouse_events),
        ));
        set.spawn(guarded(
            self.token.clone(),
            drivers::input_sender(keyboard, keyboard_events),
        ));

        supervise(self.token, set).await
    }
}

/// Run a driver until it returns or the session is cancelled.
/// Cancellation drops the driver future, closing its channel.
async fn guarded<F>(token: CancellationToken, driver: F) -> Result<(), RdaError>
where
    F: Future<Output = Result<(), RdaError>>,
{
    tokio::select! {
        _ = token.cancelled() => Ok(()),
        result = driver => result,
    }
}

/// Await all drivers; the first to finish, for any reason, tears the
/// rest down. Returns the first error observed.
async fn supervise(
    token: CancellationToken,
    mut set: JoinSet<Result<(), RdaError>>,
) -> Result<(), RdaError> {
    let mut first_failure: Option<RdaError> = None;

    while let Some(joined) = set.join_next().await {
        token.cancel();
        match joined {
            Ok(Ok(())) => debug!("driver stopped"),
            Ok(Err(e)) => {
                if first_failure.is_none() {
                    error!("session fault: {e}");
                    first_failure = Some(e);
                }
            }
            Err(e) => {
                if first_failure.is_none() {
                    error!("driver task failed: {e}");
                    first_failure = Some(RdaError::Collaborator(format!("driver task: {e}")));
                }
            }
        }
    }

    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

// ── Tests ────────────────────────────────────────────────────────
