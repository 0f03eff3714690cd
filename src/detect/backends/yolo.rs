//! YOLO output decoding.
//!
//! Turns a raw output tensor into detections with normalized,
//! bottom-left-origin boxes. Two tensor layouts are understood:
//! - anchorless `[1, 4 + C, N]` (YOLOv8 exports): `cx, cy, w, h, class scores`
//! - objectness `[1, N, 5 + C]` (YOLOv3/v5 exports): `cx, cy, w, h, obj, class scores`
//!
//! Box coordinates are in model input pixels.

use std::cmp::Ordering;

use anyhow::{anyhow, Result};

use crate::detect::result::Detection;
use crate::geometry::NormalizedRect;

/// Post-processing parameters for one model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeParams {
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            input_width: 640,
            input_height: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputLayout {
    Anchorless { classes: usize, predictions: usize },
    Objectness { classes: usize, predictions: usize },
}

impl OutputLayout {
    /// Infer the layout from a tensor shape.
    ///
    /// With a known class count the matching axis decides; otherwise the
    /// longer axis is taken to be the prediction axis.
    pub fn from_shape(shape: &[usize], num_classes: Option<usize>) -> Result<Self> {
        let (a, b) = match shape {
            [1, a, b] | [a, b] => (*a, *b),
            _ => return Err(anyhow!("unsupported YOLO output shape {:?}", shape)),
        };

        if let Some(classes) = num_classes {
            if a == classes + 4 {
                return Ok(OutputLayout::Anchorless {
                    classes,
                    predictions: b,
                });
            }
            if b == classes + 5 {
                return Ok(OutputLayout::Objectness {
                    classes,
                    predictions: a,
                });
            }
        }

        if a < b {
            if a <= 4 {
                return Err(anyhow!("YOLO output shape {:?} has no class scores", shape));
            }
            Ok(OutputLayout::Anchorless {
                classes: a - 4,
                predictions: b,
            })
        } else {
            if b <= 5 {
                return Err(anyhow!("YOLO output shape {:?} has no class scores", shape));
            }
            Ok(OutputLayout::Objectness {
                classes: b - 5,
                predictions: a,
            })
        }
    }

    fn len(&self) -> usize {
        match *self {
            OutputLayout::Anchorless {
                classes,
                predictions,
            } => (classes + 4) * predictions,
            OutputLayout::Objectness {
                classes,
                predictions,
            } => (classes + 5) * predictions,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    class_id: usize,
    score: f32,
    cx: f32,
    cy: f32,
    w: f32,
    h: f32,
}

impl Candidate {
    fn iou(&self, other: &Candidate) -> f32 {
        let ax0 = self.cx - self.w / 2.0;
        let ay0 = self.cy - self.h / 2.0;
        let bx0 = other.cx - other.w / 2.0;
        let by0 = other.cy - other.h / 2.0;
        let ix0 = ax0.max(bx0);
        let iy0 = ay0.max(by0);
        let ix1 = (ax0 + self.w).min(bx0 + other.w);
        let iy1 = (ay0 + self.h).min(by0 + other.h);
        let inter = (ix1 - ix0).max(0.0) * (iy1 - iy0).max(0.0);
        let union = self.w * self.h + other.w * other.h - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    fn into_detection(self, labels: &[String], params: &DecodeParams) -> Detection {
        let iw = params.input_width as f64;
        let ih = params.input_height as f64;
        let width = self.w as f64 / iw;
        let height = self.h as f64 / ih;
        let left = (self.cx as f64 - self.w as f64 / 2.0) / iw;
        let top = (self.cy as f64 - self.h as f64 / 2.0) / ih;
        let label = labels
            .get(self.class_id)
            .cloned()
            .unwrap_or_else(|| format!("class{}", self.class_id));
        Detection::new(
            NormalizedRect::new(left, 1.0 - top - height, width, height),
            label,
            self.score,
        )
    }
}

/// Decode a raw output tensor into detections.
pub fn decode(
    raw: &[f32],
    shape: &[usize],
    labels: &[String],
    params: &DecodeParams,
) -> Result<Vec<Detection>> {
    let known_classes = (!labels.is_empty()).then_some(labels.len());
    let layout = OutputLayout::from_shape(shape, known_classes)?;
    if raw.len() < layout.len() {
        return Err(anyhow!(
            "YOLO output too short: expected {} values for {:?}, got {}",
            layout.len(),
            layout,
            raw.len()
        ));
    }

    let candidates = match layout {
        OutputLayout::Anchorless {
            classes,
            predictions,
        } => collect_anchorless(raw, classes, predictions, params.confidence_threshold),
        OutputLayout::Objectness {
            classes,
            predictions,
        } => collect_objectness(raw, classes, predictions, params.confidence_threshold),
    };

    Ok(
        non_max_suppression(candidates, params.iou_threshold, params.max_detections)
            .into_iter()
            .map(|c| c.into_detection(labels, params))
            .collect(),
    )
}

fn collect_anchorless(raw: &[f32], classes: usize, n: usize, threshold: f32) -> Vec<Candidate> {
    let mut out = Vec::new();
    for i in 0..n {
        let mut best_class = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for c in 0..classes {
            let score = raw[(4 + c) * n + i];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }
        if best_score >= threshold {
            out.push(Candidate {
                class_id: best_class,
                score: best_score,
                cx: raw[i],
                cy: raw[n + i],
                w: raw[2 * n + i],
                h: raw[3 * n + i],
            });
        }
    }
    out
}

fn collect_objectness(raw: &[f32], classes: usize, n: usize, threshold: f32) -> Vec<Candidate> {
    let stride = classes + 5;
    let mut out = Vec::new();
    for i in 0..n {
        let base = i * stride;
        let objectness = raw[base + 4];
        let mut best_class = 0usize;
        let mut best_prob = f32::NEG_INFINITY;
        for c in 0..classes {
            let p = raw[base + 5 + c];
            if p > best_prob {
                best_prob = p;
                best_class = c;
            }
        }
        let score = objectness * best_prob;
        if score >= threshold {
            out.push(Candidate {
                class_id: best_class,
                score,
                cx: raw[base],
                cy: raw[base + 1],
                w: raw[base + 2],
                h: raw[base + 3],
            });
        }
    }
    out
}

/// Class-aware greedy NMS.
fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    let mut kept: Vec<Candidate> = Vec::new();
    'outer: for cand in candidates {
        if kept.len() >= max_detections {
            break;
        }
        for k in &kept {
            if k.class_id == cand.class_id && k.iou(&cand) >= iou_threshold {
                continue 'outer;
            }
        }
        kept.push(cand);
    }
    kept
}
