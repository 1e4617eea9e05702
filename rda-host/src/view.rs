//! Reporting collaborators for the host's receive side.
//!
//! The real display and OS-injection layers are external to this
//! process; these implementations observe the streams and report what
//! arrives, which is enough to run and debug a session end to end.

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use rda_core::{InputEvent, InputSink, RdaError, ScreenDimensions, ScreenSink};

// ── FrameStatsSink ───────────────────────────────────────────────

/// Counts received frames and reports throughput once a second.
pub struct FrameStatsSink {
    total_frames: u64,
    total_bytes: u64,
    window_frames: u64,
    window_bytes: u64,
    window_start: Instant,
}

impl FrameStatsSink {
    pub fn new() -> Self {
        Self {
            total_frames: 0,
            total_bytes: 0,
            window_frames: 0,
            window_bytes: 0,
            window_start: Instant::now(),
        }
    }
}

impl Default for FrameStatsSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScreenSink for FrameStatsSink {
    async fn render(&mut self, frame: Bytes) -> Result<(), RdaError> {
        self.total_frames += 1;
        self.total_bytes += frame.len() as u64;
        self.window_frames += 1;
        self.window_bytes += frame.len() as u64;

        let elapsed = self.window_start.elapsed();
        if elapsed.as_secs() >= 1 {
            let fps = self.window_frames as f64 / elapsed.as_secs_f64();
            info!(
                fps,
                kib_per_s = self.window_bytes / 1024,
                total_frames = self.total_frames,
                total_kib = self.total_bytes / 1024,
                "screen stream"
            );
            self.window_frames = 0;
            self.window_bytes = 0;
            self.window_start = Instant::now();
        }

        Ok(())
    }
}

// ── LoggingInjector ──────────────────────────────────────────────

/// Reports each received input event, scaled onto this machine's
/// display dimensions the way a real injector would position it.
pub struct LoggingInjector {
    dims: ScreenDimensions,
}

impl LoggingInjector {
    pub fn new(dims: ScreenDimensions) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl InputSink for LoggingInjector {
    async fn inject(&self, event: InputEvent) -> Result<(), RdaError> {
        match event.position() {
            Some((nx, ny)) => {
                let (px, py) = self.dims.to_pixels(nx, ny);
                debug!(
                    kind = event.kind_name(),
                    x = px as i64,
                    y = py as i64,
                    "input event"
                );
            }
            None => debug!(kind = event.kind_name(), ?event, "input event"),
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
