//! Frame and fragment pacing.
//!
//! Two independent mechanisms:
//!
//! - [`FramePacer`] holds the loop to a target frame rate. In the default
//!   [`PacingMode::SingleInterval`] mode it only tops up the current cycle to
//!   one interval; time lost to a long cycle is never paid back, so sustained
//!   overruns make the effective rate drift below target.
//!   [`PacingMode::DriftCompensated`] schedules against absolute deadlines
//!   instead and catches up after short overruns.
//! - [`FragmentPacer`] inserts a fixed gap between consecutive fragments of
//!   one frame to soften bursts on constrained links. It has no loss feedback.
//!
//! Both use `tokio::time`, so tests can drive them with a paused clock.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::trace;

use crate::{Result, StreamError};

/// Default gap between fragments of one frame
pub const DEFAULT_FRAGMENT_DELAY: Duration = Duration::from_millis(1);

/// Interval between frames for a target of `fps` frames per second.
///
/// Rejects rates that are not positive and finite, and rates so low that
/// the interval does not fit in a [`Duration`].
pub fn interval_for_rate(fps: f64) -> Result<Duration> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(StreamError::config(format!(
            "target_fps must be a positive number, got {}",
            fps
        )));
    }

    Duration::try_from_secs_f64(1.0 / fps).map_err(|_| {
        StreamError::config(format!("target_fps {} gives a frame interval too long to represent", fps))
    })
}

/// Inter-frame scheduling strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// Sleep for whatever remains of one interval since the previous frame
    #[default]
    SingleInterval,
    /// Sleep until the next absolute deadline on a fixed grid
    DriftCompensated,
}

/// Holds the capture loop to a target frame rate.
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    mode: PacingMode,
    last_sent: Instant,
    next_deadline: Instant,
}

impl FramePacer {
    /// Create a pacer whose first interval starts now.
    pub fn new(interval: Duration, mode: PacingMode) -> Self {
        let now = Instant::now();
        Self { interval, mode, last_sent: now, next_deadline: now + interval }
    }

    /// Create a pacer for `fps` frames per second.
    pub fn from_rate(fps: f64, mode: PacingMode) -> Result<Self> {
        Ok(Self::new(interval_for_rate(fps)?, mode))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn mode(&self) -> PacingMode {
        self.mode
    }

    /// Wait until the next frame may start. Returns the time slept.
    pub async fn wait_for_next_frame(&mut self) -> Duration {
        match self.mode {
            PacingMode::SingleInterval => self.wait_single_interval().await,
            PacingMode::DriftCompensated => self.wait_drift_compensated().await,
        }
    }

    async fn wait_single_interval(&mut self) -> Duration {
        let elapsed = self.last_sent.elapsed();
        let slept = match self.interval.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => {
                trace!("Pacing: sleeping {:?}", remaining);
                sleep(remaining).await;
                remaining
            }
            _ => Duration::ZERO,
        };
        self.last_sent = Instant::now();
        slept
    }

    async fn wait_drift_compensated(&mut self) -> Duration {
        let now = Instant::now();
        let slept = if now < self.next_deadline {
            let remaining = self.next_deadline - now;
            trace!("Pacing: sleeping {:?} until deadline", remaining);
            sleep_until(self.next_deadline).await;
            remaining
        } else {
            Duration::ZERO
        };

        self.next_deadline += self.interval;
        // Too far behind: restart the grid instead of bursting to catch up
        let now = Instant::now();
        if self.next_deadline + self.interval < now {
            self.next_deadline = now + self.interval;
        }
        self.last_sent = now;
        slept
    }
}

/// Fixed gap between consecutive fragments of one frame.
#[derive(Debug, Clone, Copy)]
pub struct FragmentPacer {
    delay: Duration,
}

impl FragmentPacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Pause between two fragments. Never called after the last one.
    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

impl Default for FragmentPacer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAGMENT_DELAY)
    }
}
