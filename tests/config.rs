use std::io::Write;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use taco_lens::config::AppConfig;
use taco_lens::{ModelOption, VideoGravity};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "TACO_CONFIG",
        "TACO_SOURCE_URL",
        "TACO_MODEL",
        "TACO_MODEL_PATH_TACO",
        "TACO_MODEL_PATH_YOLOV3",
        "TACO_PREVIEW_SIZE",
        "TACO_CONFIDENCE_THRESHOLD",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = AppConfig::load().expect("load defaults");
    assert_eq!(cfg.source.url, "stub://camera");
    assert_eq!(cfg.reference.width, 4032.0);
    assert_eq!(cfg.reference.height, 3024.0);
    assert_eq!(cfg.models.selected, ModelOption::TacoYolo);
    assert_eq!(cfg.preview.gravity, VideoGravity::ResizeAspectFill);
    assert!(cfg.models.taco.path.starts_with("stub://"));
}

#[test]
fn loads_json_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": { "url": "/dev/video2", "target_fps": 15, "width": 1280, "height": 720 },
        "reference": { "width": 1920, "height": 1080 },
        "preview": { "width": 390, "height": 844, "gravity": "resize_aspect" },
        "models": {
            "selected": "yolov3",
            "iou_threshold": 0.5,
            "yolov3": { "path": "models/yolov3.onnx", "labels": ["person", "bicycle"] }
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("TACO_CONFIG", file.path());
    std::env::set_var("TACO_MODEL", "taco");
    std::env::set_var("TACO_PREVIEW_SIZE", "800x600");
    std::env::set_var("TACO_CONFIDENCE_THRESHOLD", "0.6");
    std::env::set_var("TACO_MODEL_PATH_TACO", "models/taco.onnx");

    let cfg = AppConfig::load().expect("load config");

    assert_eq!(cfg.source.url, "/dev/video2");
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!(cfg.source.width, 1280);
    assert_eq!(cfg.reference.width, 1920.0);
    assert_eq!(cfg.preview.width, 800.0);
    assert_eq!(cfg.preview.height, 600.0);
    assert_eq!(cfg.preview.gravity, VideoGravity::ResizeAspect);
    assert_eq!(cfg.models.selected, ModelOption::TacoYolo);
    assert_eq!(cfg.models.confidence_threshold, 0.6);
    assert_eq!(cfg.models.iou_threshold, 0.5);
    assert_eq!(cfg.models.taco.path, "models/taco.onnx");
    assert_eq!(cfg.models.yolov3.path, "models/yolov3.onnx");
    assert_eq!(cfg.models.yolov3.labels, vec!["person", "bicycle"]);
    assert_eq!(cfg.models.yolov3.input_width, 416);

    clear_env();
}

#[test]
fn loads_toml_with_labels_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut labels = NamedTempFile::new().expect("temp labels");
    labels
        .write_all(b"Bottle\n\nCan\n  Carton  \n")
        .expect("write labels");

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = format!(
        r#"
[source]
url = "stub://bench"
max_frames = 25

[models]
max_detections = 10

[models.taco]
path = "stub://litter"
labels_path = "{}"
"#,
        labels.path().display()
    );
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = AppConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.source.url, "stub://bench");
    assert_eq!(cfg.source.max_frames, Some(25));
    assert_eq!(cfg.models.max_detections, 10);
    assert_eq!(cfg.models.taco.labels, vec!["Bottle", "Can", "Carton"]);
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{ "models": { "confidence_threshold": 1.5 } }"#)
        .expect("write config");
    let err = AppConfig::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("confidence_threshold"));

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{ "source": { "width": 0 } }"#)
        .expect("write config");
    assert!(AppConfig::load_from(Some(file.path())).is_err());

    std::env::set_var("TACO_PREVIEW_SIZE", "huge");
    assert!(AppConfig::load_from(None).is_err());
    clear_env();

    std::env::set_var("TACO_MODEL", "resnet");
    assert!(AppConfig::load_from(None).is_err());
    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let dir = tempfile::tempdir().expect("temp dir");
    let err = AppConfig::load_from(Some(&dir.path().join("absent.json"))).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}
