#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use super::yolo::{self, DecodeParams};
use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;

/// Tract-based backend for ONNX YOLO models.
///
/// Frames are stretch-resized to the model input, so normalized output
/// boxes map straight back onto the original frame.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    name: String,
    labels: Vec<String>,
    params: DecodeParams,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        let name = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tract".to_string());

        Ok(Self {
            model,
            name,
            labels: Vec::new(),
            params: DecodeParams {
                input_width: width,
                input_height: height,
                ..DecodeParams::default()
            },
        })
    }

    /// Class names indexed by class id.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Override post-processing thresholds. The input size stays the one the
    /// model was loaded with.
    pub fn with_params(mut self, params: DecodeParams) -> Self {
        self.params = DecodeParams {
            input_width: self.params.input_width,
            input_height: self.params.input_height,
            ..params
        };
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len || expected_len == 0 {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let src_w = width as usize;
        let src_h = height as usize;
        let dst_w = self.params.input_width as usize;
        let dst_h = self.params.input_height as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, dst_h, dst_w), |(_, c, y, x)| {
            let sx = (x * src_w / dst_w).min(src_w - 1);
            let sy = (y * src_h / dst_h).min(src_h - 1);
            pixels[(sy * src_w + sx) * 3 + c] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape().to_vec();
        let raw: Vec<f32> = view.iter().copied().collect();
        yolo::decode(&raw, &shape, &self.labels, &self.params)
    }

    fn warm_up(&mut self) -> Result<()> {
        let w = self.params.input_width;
        let h = self.params.input_height;
        let blank = vec![0u8; (w as usize) * (h as usize) * 3];
        self.detect(&blank, w, h).map(|_| ())
    }
}
