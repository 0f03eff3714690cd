//! Frames-per-second estimate.
//!
//! The estimate is the instantaneous reciprocal of the time between two
//! completed inferences. There is no smoothing, and two ticks with the same
//! timestamp produce an infinite value.

use std::time::Instant;

/// `1 / (now - last)`, plus the new reference time.
pub fn update_fps(now: f64, last_frame_time: f64) -> (f64, f64) {
    (1.0 / (now - last_frame_time), now)
}

/// Overlay text for an FPS value, e.g. `"FPS: 29.8"`.
pub fn format_fps(fps: f64) -> String {
    format!("FPS: {:.1}", fps)
}

/// Producer-side FPS state. Tick once per completed inference.
#[derive(Clone, Debug)]
pub struct FpsEstimator {
    fps: f64,
    last_frame_time: f64,
}

impl FpsEstimator {
    /// Start measuring from `start` (seconds on the caller's clock).
    pub fn new(start: f64) -> Self {
        Self {
            fps: 0.0,
            last_frame_time: start,
        }
    }

    pub fn tick(&mut self, now: f64) -> f64 {
        let (fps, last) = update_fps(now, self.last_frame_time);
        self.fps = fps;
        self.last_frame_time = last;
        fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn last_frame_time(&self) -> f64 {
        self.last_frame_time
    }
}

/// Monotonic clock reporting seconds since it was created.
#[derive(Clone, Copy, Debug)]
pub struct MediaClock {
    origin: Instant,
}

impl MediaClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl Default for MediaClock {
    fn default() -> Self {
        Self::new()
    }
}
