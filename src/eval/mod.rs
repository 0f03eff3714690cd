//! Offline model comparison.
//!
//! Scores saved prediction runs against COCO-style TACO annotations:
//! - `dataset`: annotation loading; labels are category supercategories
//! - `predictions`: prediction run files (normalized center boxes + phrases)
//! - `metrics`: IoU matching and the ground-truth → predicted confusion matrix

mod dataset;
mod metrics;
mod predictions;

pub use dataset::{GroundTruth, Sample, TacoDataset};
pub use metrics::{evaluate, ConfusionMatrix, Evaluation, PixelBox, MATCH_IOU};
pub use predictions::{ImagePrediction, PredictionRun};
