//! Frame clock: turns a tokio interval into animation frame timestamps.
//!
//! Each band owns a [`FrameQueue`](crate::core::motion::FrameQueue); the
//! clock only decides *when* the outstanding requests are delivered.  When no
//! band has a request pending the main loop stops awaiting the clock, so a
//! fully paused screen costs nothing.

use std::time::{Duration, Instant};

use tokio::time::{Interval, MissedTickBehavior};

/// Frame period for `fps`, never faster than 1 kHz.
pub fn frame_period(fps: u16) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(fps.max(1))).max(Duration::from_millis(1))
}

pub struct FrameClock {
    origin: Instant,
    interval: Interval,
}

impl FrameClock {
    pub fn new(fps: u16) -> Self {
        let mut interval = tokio::time::interval(frame_period(fps));
        // After a stall, deliver one frame rather than a burst; the animator
        // clamps the elapsed time anyway.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            origin: Instant::now(),
            interval,
        }
    }

    /// Wait for the next frame and return its timestamp.
    pub async fn tick(&mut self) -> Duration {
        self.interval.tick().await;
        self.now()
    }

    /// Time since the clock was created.
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
