use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::ModelsConfig;
use crate::model::ModelOption;

use super::backend::DetectorBackend;

pub type SharedBackend = Arc<Mutex<Box<dyn DetectorBackend>>>;

/// Thread-safe registry of loaded models.
///
/// Backends are wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
/// A model that failed to load is simply absent; detection for it is skipped.
pub struct ModelRegistry {
    backends: HashMap<ModelOption, SharedBackend>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Load every model option from configuration.
    ///
    /// Load failures are logged and leave that option unavailable.
    pub fn load(models: &ModelsConfig) -> Self {
        let mut registry = Self::new();
        for option in ModelOption::ALL {
            match option.load(models) {
                Ok(mut backend) => {
                    if let Err(err) = backend.warm_up() {
                        log::warn!("model {} warm-up failed: {:#}", option.name(), err);
                    }
                    log::info!("model {} loaded ({})", option.name(), backend.name());
                    registry.register_boxed(option, backend);
                }
                Err(err) => {
                    log::warn!("model {} unavailable: {:#}", option.name(), err);
                }
            }
        }
        registry
    }

    /// Register a backend for a model option, replacing any previous one.
    pub fn register<B: DetectorBackend + 'static>(&mut self, model: ModelOption, backend: B) {
        self.register_boxed(model, Box::new(backend));
    }

    pub fn register_boxed(&mut self, model: ModelOption, backend: Box<dyn DetectorBackend>) {
        self.backends.insert(model, Arc::new(Mutex::new(backend)));
    }

    /// Get backend by model option.
    pub fn get(&self, model: ModelOption) -> Option<SharedBackend> {
        self.backends.get(&model).cloned()
    }

    pub fn contains(&self, model: ModelOption) -> bool {
        self.backends.contains_key(&model)
    }

    /// Loaded model options, in picker order.
    pub fn available(&self) -> Vec<ModelOption> {
        ModelOption::ALL
            .into_iter()
            .filter(|model| self.backends.contains_key(model))
            .collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSettings;
    use crate::detect::StubBackend;

    #[test]
    fn load_skips_models_that_fail() {
        let mut models = ModelsConfig::default();
        models.yolov3 = ModelSettings {
            path: "/nonexistent/yolov3.onnx".to_string(),
            ..ModelSettings::default()
        };
        let registry = ModelRegistry::load(&models);
        assert!(registry.contains(ModelOption::TacoYolo));
        assert!(!registry.contains(ModelOption::YoloV3));
        assert_eq!(registry.available(), vec![ModelOption::TacoYolo]);
    }

    #[test]
    fn register_replaces_existing_backend() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelOption::YoloV3, StubBackend::new("first", "a"));
        registry.register(ModelOption::YoloV3, StubBackend::new("second", "b"));
        let backend = registry.get(ModelOption::YoloV3).unwrap();
        let guard = backend.lock().unwrap();
        assert_eq!(guard.name(), "second");
    }
}
