use crate::frame::Frame;
use crate::model::ModelOption;

use super::registry::ModelRegistry;
use super::result::Detection;

/// Runs the selected model on a frame.
///
/// Never fails outward. A missing model or a poisoned backend skips the
/// frame (`None`); an inference error counts as a completed pass with no
/// detections.
pub struct FrameDetector {
    registry: ModelRegistry,
}

impl FrameDetector {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// `None` when no backend ran for this frame.
    pub fn detect(&self, frame: &Frame, model: ModelOption) -> Option<Vec<Detection>> {
        let Some(backend) = self.registry.get(model) else {
            log::debug!("model {} not loaded; skipping frame {}", model, frame.sequence);
            return None;
        };

        let mut guard = match backend.lock() {
            Ok(guard) => guard,
            Err(_) => {
                log::error!("model {} backend lock poisoned", model);
                return None;
            }
        };

        let detections = match guard.detect(frame.pixels(), frame.width, frame.height) {
            Ok(detections) => {
                log::debug!(
                    "frame {}: {} detected {} objects",
                    frame.sequence,
                    model,
                    detections.len()
                );
                detections
            }
            Err(err) => {
                log::warn!("failed to perform inference with {}: {:#}", model, err);
                Vec::new()
            }
        };
        Some(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubBackend;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 2 * 2 * 3], 2, 2, 1).unwrap()
    }

    #[test]
    fn missing_model_skips_the_frame() {
        let detector = FrameDetector::new(ModelRegistry::new());
        assert_eq!(detector.detect(&frame(), ModelOption::YoloV3), None);
    }

    #[test]
    fn inference_failure_yields_empty_result() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelOption::TacoYolo, StubBackend::failing("taco", "boom"));
        let detector = FrameDetector::new(registry);
        assert_eq!(detector.detect(&frame(), ModelOption::TacoYolo), Some(Vec::new()));
    }

    #[test]
    fn routes_to_the_requested_model() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelOption::TacoYolo, StubBackend::new("taco", "litter"));
        registry.register(ModelOption::YoloV3, StubBackend::new("yolov3", "person"));
        let detector = FrameDetector::new(registry);
        let taco = detector.detect(&frame(), ModelOption::TacoYolo).unwrap();
        let yolo = detector.detect(&frame(), ModelOption::YoloV3).unwrap();
        assert_eq!(taco[0].label, "litter");
        assert_eq!(yolo[0].label, "person");
    }
}
