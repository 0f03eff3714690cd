use serde::{Deserialize, Serialize};

use crate::geometry::NormalizedRect;

/// One predicted object instance.
///
/// `bounding_box` is normalized to the analyzed frame with a bottom-left
/// origin. Detections are produced fresh per frame and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bounding_box: NormalizedRect,
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bounding_box: NormalizedRect, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bounding_box,
            label: label.into(),
            confidence,
        }
    }

    /// Overlay caption, e.g. `"bottle: 0.87"`.
    pub fn caption(&self) -> String {
        format!("{}: {:.2}", self.label, self.confidence)
    }
}
