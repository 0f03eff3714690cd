use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::detect::Detection;

/// One model's predictions over a dataset, one entry per sample.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRun {
    /// Free-form record of the settings the run used (thresholds etc.).
    #[serde(default)]
    pub model_params: serde_json::Value,
    /// Text prompt for prompt-driven detectors; empty otherwise.
    #[serde(default)]
    pub prompt: String,
    pub predictions: Vec<ImagePrediction>,
}

/// Predictions for one image.
///
/// Boxes are `[cx, cy, w, h]` normalized to the image with a top-left origin.
/// `phrases[i]` is the label predicted for `boxes[i]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePrediction {
    pub boxes: Vec<[f64; 4]>,
    #[serde(default)]
    pub logits: Vec<f64>,
    pub phrases: Vec<String>,
}

impl PredictionRun {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read predictions {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid predictions {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write predictions {}", path.display()))
    }
}

impl ImagePrediction {
    /// Convert live detector output (bottom-left normalized boxes).
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut prediction = Self::default();
        for det in detections {
            let top_left = det.bounding_box.flip_vertical();
            prediction.boxes.push([
                top_left.min_x() + top_left.width.abs() / 2.0,
                top_left.min_y() + top_left.height.abs() / 2.0,
                top_left.width.abs(),
                top_left.height.abs(),
            ]);
            prediction.logits.push(det.confidence as f64);
            prediction.phrases.push(det.label.clone());
        }
        prediction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormalizedRect;

    #[test]
    fn detections_become_top_left_center_boxes() {
        let det = Detection::new(NormalizedRect::new(0.1, 0.0, 0.2, 0.25), "Can", 0.5);
        let prediction = ImagePrediction::from_detections(&[det]);
        let [cx, cy, w, h] = prediction.boxes[0];
        assert!((cx - 0.2).abs() < 1e-9);
        // Bottom-hugging box: top-left y is 0.75, center 0.875.
        assert!((cy - 0.875).abs() < 1e-9);
        assert!((w - 0.2).abs() < 1e-9);
        assert!((h - 0.25).abs() < 1e-9);
        assert_eq!(prediction.phrases, vec!["Can"]);
        assert_eq!(prediction.logits, vec![0.5]);
    }

    #[test]
    fn runs_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("litter.json");
        let run = PredictionRun {
            model_params: serde_json::json!({ "box_threshold": 0.35, "text_threshold": 0.25 }),
            prompt: "litter".to_string(),
            predictions: vec![ImagePrediction {
                boxes: vec![[0.5, 0.5, 0.2, 0.2]],
                logits: vec![0.4],
                phrases: vec!["Bottle".to_string()],
            }],
        };
        run.save(&path).unwrap();
        assert_eq!(PredictionRun::load(&path).unwrap(), run);
    }

    #[test]
    fn missing_optional_fields_default() {
        let run: PredictionRun =
            serde_json::from_str(r#"{ "predictions": [ { "boxes": [], "phrases": [] } ] }"#)
                .unwrap();
        assert_eq!(run.prompt, "");
        assert!(run.predictions[0].logits.is_empty());
    }
}
