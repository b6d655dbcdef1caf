//! Frame cadence measurement.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frames averaged by default.
pub const DEFAULT_WINDOW: usize = 10;

/// Reports frames per second as a simple moving average over the last few
/// frame intervals, which smooths the frame-to-frame jitter of a renderer
/// whose cost swings with scene content.
pub struct FrameClock {
    window: usize,
    samples: VecDeque<Duration>,
    last_tick: Option<Instant>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl FrameClock {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::new(),
            last_tick: None,
        }
    }

    /// Marks a frame boundary and returns the current average rate.
    ///
    /// The first call only starts the clock; rates appear from the second
    /// call on.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        if let Some(last) = self.last_tick.replace(now) {
            self.record(now - last);
        }
        self.fps()
    }

    /// Feeds one frame interval directly.
    pub fn record(&mut self, interval: Duration) {
        self.samples.push_back(interval);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
    }

    /// Mean interval across the window, once any frame has completed.
    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    /// Average frames per second; 0.0 until an interval has been observed.
    pub fn fps(&self) -> f32 {
        match self.average() {
            Some(avg) if avg > Duration::ZERO => 1.0 / avg.as_secs_f32(),
            _ => 0.0,
        }
    }
}
