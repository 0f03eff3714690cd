use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::DecodeParams;
use crate::geometry::{ReferenceSize, VideoGravity};
use crate::ingest::SourceConfig;
use crate::model::{ModelOption, STUB_MODEL_PREFIX};

const DEFAULT_SOURCE_URL: &str = "stub://camera";
const DEFAULT_SOURCE_FPS: u32 = 30;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_PREVIEW_WIDTH: f64 = 1280.0;
const DEFAULT_PREVIEW_HEIGHT: f64 = 960.0;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_MAX_DETECTIONS: usize = 100;
const DEFAULT_TACO_INPUT: u32 = 640;
const DEFAULT_YOLOV3_INPUT: u32 = 416;

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    source: Option<SourceConfigFile>,
    reference: Option<SizeConfigFile>,
    preview: Option<PreviewConfigFile>,
    models: Option<ModelsConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SizeConfigFile {
    width: Option<f64>,
    height: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct PreviewConfigFile {
    width: Option<f64>,
    height: Option<f64>,
    gravity: Option<VideoGravity>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelsConfigFile {
    selected: Option<ModelOption>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    max_detections: Option<usize>,
    taco: Option<ModelConfigFile>,
    yolov3: Option<ModelConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<String>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    labels: Option<Vec<String>>,
    labels_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub reference: ReferenceSize,
    pub preview: PreviewSettings,
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSettings {
    pub width: f64,
    pub height: f64,
    pub gravity: VideoGravity,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_PREVIEW_WIDTH,
            height: DEFAULT_PREVIEW_HEIGHT,
            gravity: VideoGravity::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelsConfig {
    pub selected: ModelOption,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub taco: ModelSettings,
    pub yolov3: ModelSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    /// ONNX file path, or `stub://<label>` for the synthetic backend.
    pub path: String,
    pub input_width: u32,
    pub input_height: u32,
    /// Class names indexed by class id.
    pub labels: Vec<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: format!("{}model", STUB_MODEL_PREFIX),
            input_width: DEFAULT_TACO_INPUT,
            input_height: DEFAULT_TACO_INPUT,
            labels: Vec::new(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            selected: ModelOption::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            taco: ModelSettings {
                path: format!("{}litter", STUB_MODEL_PREFIX),
                ..ModelSettings::default()
            },
            yolov3: ModelSettings {
                path: format!("{}object", STUB_MODEL_PREFIX),
                input_width: DEFAULT_YOLOV3_INPUT,
                input_height: DEFAULT_YOLOV3_INPUT,
                labels: Vec::new(),
            },
        }
    }
}

impl ModelsConfig {
    pub fn settings(&self, model: ModelOption) -> &ModelSettings {
        match model {
            ModelOption::TacoYolo => &self.taco,
            ModelOption::YoloV3 => &self.yolov3,
        }
    }

    fn settings_mut(&mut self, model: ModelOption) -> &mut ModelSettings {
        match model {
            ModelOption::TacoYolo => &mut self.taco,
            ModelOption::YoloV3 => &mut self.yolov3,
        }
    }

    pub fn decode_params(&self, model: ModelOption) -> DecodeParams {
        let settings = self.settings(model);
        DecodeParams {
            input_width: settings.input_width,
            input_height: settings.input_height,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                url: DEFAULT_SOURCE_URL.to_string(),
                target_fps: DEFAULT_SOURCE_FPS,
                width: DEFAULT_SOURCE_WIDTH,
                height: DEFAULT_SOURCE_HEIGHT,
                max_frames: None,
            },
            reference: ReferenceSize::default(),
            preview: PreviewSettings::default(),
            models: ModelsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `$TACO_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("TACO_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load from an explicit file (if any), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Result<Self> {
        let defaults = Self::default();

        let source_file = file.source.unwrap_or_default();
        let source = SourceConfig {
            url: source_file.url.unwrap_or(defaults.source.url),
            target_fps: source_file.target_fps.unwrap_or(defaults.source.target_fps),
            width: source_file.width.unwrap_or(defaults.source.width),
            height: source_file.height.unwrap_or(defaults.source.height),
            max_frames: source_file.max_frames,
        };

        let reference_file = file.reference.unwrap_or_default();
        let reference = ReferenceSize::new(
            reference_file.width.unwrap_or(defaults.reference.width),
            reference_file.height.unwrap_or(defaults.reference.height),
        );

        let preview_file = file.preview.unwrap_or_default();
        let preview = PreviewSettings {
            width: preview_file.width.unwrap_or(defaults.preview.width),
            height: preview_file.height.unwrap_or(defaults.preview.height),
            gravity: preview_file.gravity.unwrap_or(defaults.preview.gravity),
        };

        let models_file = file.models.unwrap_or_default();
        let models = ModelsConfig {
            selected: models_file.selected.unwrap_or(defaults.models.selected),
            confidence_threshold: models_file
                .confidence_threshold
                .unwrap_or(defaults.models.confidence_threshold),
            iou_threshold: models_file
                .iou_threshold
                .unwrap_or(defaults.models.iou_threshold),
            max_detections: models_file
                .max_detections
                .unwrap_or(defaults.models.max_detections),
            taco: model_settings(models_file.taco, defaults.models.taco)?,
            yolov3: model_settings(models_file.yolov3, defaults.models.yolov3)?,
        };

        Ok(Self {
            source,
            reference,
            preview,
            models,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("TACO_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(model) = std::env::var("TACO_MODEL") {
            if !model.trim().is_empty() {
                self.models.selected = model.parse()?;
            }
        }
        for option in ModelOption::ALL {
            let key = format!("TACO_MODEL_PATH_{}", option.id().to_ascii_uppercase());
            if let Ok(path) = std::env::var(&key) {
                if !path.trim().is_empty() {
                    self.models.settings_mut(option).path = path;
                }
            }
        }
        if let Ok(size) = std::env::var("TACO_PREVIEW_SIZE") {
            let (width, height) = parse_size(&size)
                .ok_or_else(|| anyhow!("TACO_PREVIEW_SIZE must look like 1280x960"))?;
            self.preview.width = width;
            self.preview.height = height;
        }
        if let Ok(threshold) = std::env::var("TACO_CONFIDENCE_THRESHOLD") {
            self.models.confidence_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("TACO_CONFIDENCE_THRESHOLD must be a number"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be non-zero"));
        }
        if self.reference.width <= 0.0 || self.reference.height <= 0.0 {
            return Err(anyhow!("reference size must be positive"));
        }
        if self.preview.width <= 0.0 || self.preview.height <= 0.0 {
            return Err(anyhow!("preview size must be positive"));
        }
        for (name, value) in [
            ("confidence_threshold", self.models.confidence_threshold),
            ("iou_threshold", self.models.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within 0..1, got {}", name, value));
            }
        }
        if self.models.max_detections == 0 {
            return Err(anyhow!("max_detections must be greater than zero"));
        }
        for option in ModelOption::ALL {
            let settings = self.models.settings(option);
            if settings.input_width == 0 || settings.input_height == 0 {
                return Err(anyhow!("model {} input size must be non-zero", option.id()));
            }
        }
        Ok(())
    }
}

fn model_settings(file: Option<ModelConfigFile>, defaults: ModelSettings) -> Result<ModelSettings> {
    let Some(file) = file else {
        return Ok(defaults);
    };
    let labels = match (file.labels, file.labels_path) {
        (Some(labels), _) => labels,
        (None, Some(path)) => read_labels(&path)?,
        (None, None) => defaults.labels,
    };
    Ok(ModelSettings {
        path: file.path.unwrap_or(defaults.path),
        input_width: file.input_width.unwrap_or(defaults.input_width),
        input_height: file.input_height.unwrap_or(defaults.input_height),
        labels,
    })
}

/// One label per line; blank lines are skipped.
pub fn read_labels(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read labels file {}: {}", path.display(), e))?;
    Ok(raw
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect())
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_size(value: &str) -> Option<(f64, f64)> {
    let (w, h) = value.trim().split_once(['x', 'X'])?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}
