//! Model options and the live model selection.
//!
//! The harness compares a closed set of detection models. Each option has a
//! stable id (used in config files, env vars and the stdin picker) and a
//! display name. Options resolve to a `DetectorBackend` loader when loaded.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::config::ModelsConfig;
use crate::detect::{DetectorBackend, StubBackend};

pub const STUB_MODEL_PREFIX: &str = "stub://";

/// Detection models available for comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelOption {
    #[default]
    #[serde(rename = "taco", alias = "taco_yolo")]
    TacoYolo,
    #[serde(rename = "yolov3", alias = "yolo_v3")]
    YoloV3,
}

impl ModelOption {
    pub const ALL: [ModelOption; 2] = [ModelOption::TacoYolo, ModelOption::YoloV3];

    /// Stable identifier.
    pub fn id(self) -> &'static str {
        match self {
            ModelOption::TacoYolo => "taco",
            ModelOption::YoloV3 => "yolov3",
        }
    }

    /// Human-readable name shown in the picker.
    pub fn name(self) -> &'static str {
        match self {
            ModelOption::TacoYolo => "TACO-trained YOLOv8",
            ModelOption::YoloV3 => "YOLOv3 (for testing)",
        }
    }

    /// Resolve this option to a loaded backend.
    ///
    /// `stub://` paths load a synthetic backend. Anything else is treated as
    /// an ONNX model file and needs the `backend-tract` feature.
    pub fn load(self, models: &ModelsConfig) -> Result<Box<dyn DetectorBackend>> {
        let settings = models.settings(self);
        if let Some(rest) = settings.path.strip_prefix(STUB_MODEL_PREFIX) {
            let label = settings
                .labels
                .first()
                .cloned()
                .unwrap_or_else(|| rest.to_string());
            return Ok(Box::new(StubBackend::new(self.id(), label)));
        }

        #[cfg(feature = "backend-tract")]
        {
            let backend = crate::detect::TractBackend::new(
                &settings.path,
                settings.input_width,
                settings.input_height,
            )?
            .with_labels(settings.labels.clone())
            .with_params(models.decode_params(self));
            Ok(Box::new(backend))
        }
        #[cfg(not(feature = "backend-tract"))]
        {
            anyhow::bail!(
                "model {} ({}) requires the backend-tract feature",
                self.id(),
                settings.path
            )
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            ModelOption::TacoYolo => 0,
            ModelOption::YoloV3 => 1,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ModelOption::YoloV3,
            _ => ModelOption::TacoYolo,
        }
    }
}

impl fmt::Display for ModelOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelOption {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "taco" | "taco_yolo" | "taco-yolo" => Ok(ModelOption::TacoYolo),
            "yolov3" | "yolo_v3" | "yolo-v3" => Ok(ModelOption::YoloV3),
            _ => Err(anyhow!(
                "unknown model '{}' (expected one of: {})",
                s.trim(),
                ModelOption::ALL
                    .iter()
                    .map(|m| m.id())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

// ----------------------------------------------------------------------------
// ModelSelection: shared current choice
// ----------------------------------------------------------------------------

/// Current model choice, shared between the picker and the inference thread.
///
/// A new selection applies to the next frame the inference thread picks up.
/// Frames already in flight finish with the model they started with.
#[derive(Clone, Debug)]
pub struct ModelSelection {
    current: Arc<AtomicU8>,
}

impl ModelSelection {
    pub fn new(initial: ModelOption) -> Self {
        Self {
            current: Arc::new(AtomicU8::new(initial.to_u8())),
        }
    }

    pub fn current(&self) -> ModelOption {
        ModelOption::from_u8(self.current.load(Ordering::Acquire))
    }

    /// Switch models. Returns the previous selection.
    pub fn select(&self, model: ModelOption) -> ModelOption {
        let previous = ModelOption::from_u8(self.current.swap(model.to_u8(), Ordering::AcqRel));
        if previous != model {
            log::info!("model selection: {} -> {}", previous.name(), model.name());
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_case_insensitively() {
        assert_eq!("TACO".parse::<ModelOption>().unwrap(), ModelOption::TacoYolo);
        assert_eq!(" yolov3 ".parse::<ModelOption>().unwrap(), ModelOption::YoloV3);
        assert!("resnet".parse::<ModelOption>().is_err());
    }

    #[test]
    fn display_names_are_stable() {
        assert_eq!(ModelOption::TacoYolo.name(), "TACO-trained YOLOv8");
        assert_eq!(ModelOption::YoloV3.name(), "YOLOv3 (for testing)");
    }

    #[test]
    fn selection_is_shared_across_clones() {
        let selection = ModelSelection::new(ModelOption::TacoYolo);
        let picker = selection.clone();
        let previous = picker.select(ModelOption::YoloV3);
        assert_eq!(previous, ModelOption::TacoYolo);
        assert_eq!(selection.current(), ModelOption::YoloV3);
    }

    #[test]
    fn stub_paths_load_without_onnx_runtime() {
        let models = ModelsConfig::default();
        let mut backend = ModelOption::TacoYolo.load(&models).unwrap();
        assert_eq!(backend.name(), "taco");
        let pixels = vec![0u8; 4 * 4 * 3];
        assert!(backend.detect(&pixels, 4, 4).is_ok());
    }
}
