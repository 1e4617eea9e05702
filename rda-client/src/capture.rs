//! Stand-in capture collaborator for the client's send side.
//!
//! A real deployment plugs an actual screen-grab layer in behind
//! [`rda_core::ScreenSource`]; this source produces paced synthetic
//! payloads so a session can be brought up and exercised without one.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use rda_core::{RdaError, ScreenSource};

/// Produces fixed-size synthetic frames at a steady rate.
///
/// Each frame is filled with a counter byte so consecutive frames are
/// distinguishable on the receiving end.
pub struct PatternSource {
    frame_bytes: usize,
    interval: tokio::time::Interval,
    counter: u8,
}

impl PatternSource {
    pub fn new(frame_bytes: usize, fps: u8) -> Self {
        let period = Duration::from_secs_f64(1.0 / fps.clamp(1, 60) as f64);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        Self {
            frame_bytes,
            interval,
            counter: 0,
        }
    }
}

#[async_trait]
impl ScreenSource for PatternSource {
    async fn next_frame(&mut self) -> Result<Bytes, RdaError> {
        self.interval.tick().await;
        let frame = vec![self.counter; self.frame_bytes];
        self.counter = self.counter.wrapping_add(1);
        Ok(Bytes::from(frame))
    }
}

// ── Tests ────────────────────────────────────────────────────────
