use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::geometry::NormalizedRect;

/// Stub backend for testing and demos. Produces synthetic detections
/// without touching the pixels.
pub struct StubBackend {
    name: String,
    mode: StubMode,
    frame_count: u64,
}

enum StubMode {
    /// One box drifting left to right, wrapping every 100 frames.
    Drifting { label: String },
    /// Cycle through fixed per-frame detection lists.
    Scripted(Vec<Vec<Detection>>),
    /// Every call fails with the given message.
    Failing(String),
}

impl StubBackend {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_mode(
            name,
            StubMode::Drifting {
                label: label.into(),
            },
        )
    }

    /// Replay `script` frame by frame, starting over at the end.
    /// An empty script yields no detections.
    pub fn scripted(name: impl Into<String>, script: Vec<Vec<Detection>>) -> Self {
        Self::with_mode(name, StubMode::Scripted(script))
    }

    /// Backend whose inference always fails.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_mode(name, StubMode::Failing(message.into()))
    }

    fn with_mode(name: impl Into<String>, mode: StubMode) -> Self {
        Self {
            name: name.into(),
            mode,
            frame_count: 0,
        }
    }

    /// Frames seen so far.
    pub fn frames_seen(&self) -> u64 {
        self.frame_count
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        let index = self.frame_count;
        self.frame_count += 1;

        match &self.mode {
            StubMode::Drifting { label } => {
                let step = (index % 100) as f64 / 100.0;
                let bbox = NormalizedRect::new(step * 0.75, 0.35, 0.25, 0.3);
                Ok(vec![Detection::new(bbox, label.clone(), 0.9)])
            }
            StubMode::Scripted(script) => {
                if script.is_empty() {
                    return Ok(Vec::new());
                }
                let slot = (index % script.len() as u64) as usize;
                Ok(script[slot].clone())
            }
            StubMode::Failing(message) => Err(anyhow!("{}", message)),
        }
    }
}
