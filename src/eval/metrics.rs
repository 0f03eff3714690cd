use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use super::dataset::TacoDataset;
use super::predictions::PredictionRun;

/// IoU at which a predicted box counts as covering a ground-truth box.
pub const MATCH_IOU: f64 = 0.5;

/// Corner-form box in image pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PixelBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl PixelBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// From COCO `[x, y, width, height]`.
    pub fn from_xywh([x, y, w, h]: [f64; 4]) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    /// From normalized `[cx, cy, w, h]`, scaled to `width` × `height` pixels.
    pub fn from_normalized_cxcywh([cx, cy, w, h]: [f64; 4], width: f64, height: f64) -> Self {
        Self::new(
            (cx - w / 2.0) * width,
            (cy - h / 2.0) * height,
            (cx + w / 2.0) * width,
            (cy + h / 2.0) * height,
        )
    }

    pub fn area(&self) -> f64 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union; 0 when the union is empty.
    pub fn iou(&self, other: &PixelBox) -> f64 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

// ----------------------------------------------------------------------------
// Confusion matrix
// ----------------------------------------------------------------------------

/// Ground-truth label → predicted label → number of overlapping pairs.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfusionMatrix {
    cells: BTreeMap<String, BTreeMap<String, u64>>,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, ground_truth: &str, predicted: &str) {
        *self
            .cells
            .entry(ground_truth.to_string())
            .or_default()
            .entry(predicted.to_string())
            .or_default() += 1;
    }

    pub fn count(&self, ground_truth: &str, predicted: &str) -> u64 {
        self.cells
            .get(ground_truth)
            .and_then(|row| row.get(predicted))
            .copied()
            .unwrap_or(0)
    }

    /// All recorded pairs.
    pub fn total(&self) -> u64 {
        self.cells.values().flat_map(|row| row.values()).sum()
    }

    /// Pairs where the predicted label equals the ground-truth label.
    pub fn agreeing(&self) -> u64 {
        self.cells
            .iter()
            .filter_map(|(gt, row)| row.get(gt))
            .sum()
    }

    /// Rows in label order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, u64>)> {
        self.cells.iter().map(|(gt, row)| (gt.as_str(), row))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Scores for one prediction run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Evaluation {
    /// Samples paired with a prediction entry.
    pub images: usize,
    /// Predicted phrases that appear among the image's ground-truth labels.
    pub matching_labels: u64,
    pub confusion: ConfusionMatrix,
}

/// Score `run` against `dataset`.
///
/// Predictions pair with samples by position; extra entries on either side
/// are ignored. Every (prediction, ground truth) pair with IoU at or above
/// `iou_threshold` lands in the confusion matrix, so one prediction can
/// count against several ground-truth boxes.
pub fn evaluate(dataset: &TacoDataset, run: &PredictionRun, iou_threshold: f64) -> Result<Evaluation> {
    if dataset.len() != run.predictions.len() {
        log::warn!(
            "{} annotated images but {} prediction entries; scoring the first {}",
            dataset.len(),
            run.predictions.len(),
            dataset.len().min(run.predictions.len())
        );
    }

    let mut evaluation = Evaluation::default();
    for (sample, prediction) in dataset.samples().iter().zip(&run.predictions) {
        evaluation.images += 1;

        if prediction.boxes.len() != prediction.phrases.len() {
            return Err(anyhow!(
                "{}: {} boxes but {} phrases",
                sample.file_name,
                prediction.boxes.len(),
                prediction.phrases.len()
            ));
        }

        for phrase in &prediction.phrases {
            if sample.objects.iter().any(|gt| &gt.label == phrase) {
                evaluation.matching_labels += 1;
            }
        }

        if prediction.boxes.is_empty() {
            continue;
        }
        if sample.width == 0 || sample.height == 0 {
            return Err(anyhow!("{}: image size missing from annotations", sample.file_name));
        }

        let (w, h) = (sample.width as f64, sample.height as f64);
        for (raw, phrase) in prediction.boxes.iter().zip(&prediction.phrases) {
            let predicted = PixelBox::from_normalized_cxcywh(*raw, w, h);
            for gt in &sample.objects {
                if predicted.iou(&gt.bbox) >= iou_threshold {
                    evaluation.confusion.record(&gt.label, phrase);
                }
            }
        }
    }
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::predictions::ImagePrediction;

    const ANNOTATIONS: &str = r#"{
        "images": [
            { "id": 0, "file_name": "a.jpg", "width": 100, "height": 100 },
            { "id": 1, "file_name": "b.jpg", "width": 200, "height": 100 }
        ],
        "categories": [
            { "id": 0, "name": "Drink can", "supercategory": "Can" },
            { "id": 1, "name": "Glass bottle", "supercategory": "Bottle" }
        ],
        "annotations": [
            { "id": 1, "image_id": 0, "category_id": 0, "bbox": [0, 0, 50, 50] },
            { "id": 2, "image_id": 0, "category_id": 1, "bbox": [50, 50, 50, 50] },
            { "id": 3, "image_id": 1, "category_id": 1, "bbox": [0, 0, 100, 100] }
        ]
    }"#;

    fn prediction(boxes: &[[f64; 4]], phrases: &[&str]) -> ImagePrediction {
        ImagePrediction {
            boxes: boxes.to_vec(),
            logits: vec![0.5; boxes.len()],
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = PixelBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = PixelBox::new(0.0, 0.0, 10.0, 10.0);
        let b = PixelBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-12);
    }

    #[test]
    fn iou_disjoint_and_degenerate_are_zero() {
        let a = PixelBox::new(0.0, 0.0, 10.0, 10.0);
        let b = PixelBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
        let empty = PixelBox::default();
        assert_eq!(empty.iou(&empty), 0.0);
    }

    #[test]
    fn center_boxes_denormalize_to_corners() {
        let b = PixelBox::from_normalized_cxcywh([0.5, 0.25, 0.5, 0.5], 200.0, 100.0);
        assert_eq!(b, PixelBox::new(50.0, 0.0, 150.0, 50.0));
    }

    #[test]
    fn confusion_matrix_counts_every_record() {
        let mut matrix = ConfusionMatrix::new();
        matrix.record("Can", "Can");
        matrix.record("Can", "Can");
        matrix.record("Can", "Bottle");
        matrix.record("Bottle", "Bottle");
        assert_eq!(matrix.count("Can", "Can"), 2);
        assert_eq!(matrix.count("Can", "Bottle"), 1);
        assert_eq!(matrix.count("Bottle", "Can"), 0);
        assert_eq!(matrix.total(), 4);
        assert_eq!(matrix.agreeing(), 3);
        let labels: Vec<&str> = matrix.rows().map(|(gt, _)| gt).collect();
        assert_eq!(labels, vec!["Bottle", "Can"]);
    }

    #[test]
    fn evaluates_matches_and_confusions() {
        let dataset = TacoDataset::from_json(ANNOTATIONS, None).unwrap();
        let run = PredictionRun {
            predictions: vec![
                // Exact hit on the can, a bottle called "Can", and a miss.
                prediction(
                    &[[0.25, 0.25, 0.5, 0.5], [0.75, 0.75, 0.5, 0.5], [0.1, 0.9, 0.05, 0.05]],
                    &["Can", "Can", "Paper"],
                ),
                prediction(&[[0.25, 0.5, 0.5, 1.0]], &["Bottle"]),
            ],
            ..PredictionRun::default()
        };

        let eval = evaluate(&dataset, &run, MATCH_IOU).unwrap();
        assert_eq!(eval.images, 2);
        // "Can" twice in image a, "Bottle" once in image b.
        assert_eq!(eval.matching_labels, 3);
        assert_eq!(eval.confusion.count("Can", "Can"), 1);
        assert_eq!(eval.confusion.count("Bottle", "Can"), 1);
        assert_eq!(eval.confusion.count("Bottle", "Bottle"), 1);
        assert_eq!(eval.confusion.total(), 3);
    }

    #[test]
    fn empty_predictions_still_count_images() {
        let dataset = TacoDataset::from_json(ANNOTATIONS, None).unwrap();
        let run = PredictionRun {
            predictions: vec![prediction(&[], &[])],
            ..PredictionRun::default()
        };
        let eval = evaluate(&dataset, &run, MATCH_IOU).unwrap();
        assert_eq!(eval.images, 1);
        assert!(eval.confusion.is_empty());
    }

    #[test]
    fn mismatched_boxes_and_phrases_are_rejected() {
        let dataset = TacoDataset::from_json(ANNOTATIONS, None).unwrap();
        let run = PredictionRun {
            predictions: vec![prediction(&[[0.5, 0.5, 0.1, 0.1]], &[])],
            ..PredictionRun::default()
        };
        let err = evaluate(&dataset, &run, MATCH_IOU).unwrap_err();
        assert!(err.to_string().contains("a.jpg"));
    }
}
