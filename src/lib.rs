//! Taco Lens
//!
//! Live object-detection overlay harness for comparing litter-detection
//! models on a camera feed.
//!
//! # Architecture
//!
//! Frames flow through three contexts:
//!
//! 1. **Capture**: a `FrameSource` produces RGB frames into a capacity-one
//!    slot. A frame still waiting when a newer one arrives is dropped.
//! 2. **Inference**: the newest frame runs through the selected model. The
//!    detector never fails outward; errors yield an empty detection list.
//! 3. **Render**: each `FrameResult` replaces the displayed overlay set.
//!    Detector boxes (normalized, bottom-left origin) are flipped and mapped
//!    into preview pixels, with a fixed-size label above every box.
//!
//! # Module Structure
//!
//! - `geometry`: rect types, reference size, preview conversion
//! - `overlay`: detection → screen mapping, label placement, overlay layer
//! - `render`: render sinks and the render-context state
//! - `fps`: instantaneous FPS estimate
//! - `frame`: frames and the drop-oldest frame slot
//! - `detect`: backends, model registry, frame detector
//! - `model`: model options and the live selection
//! - `ingest`: frame sources (synthetic, V4L2)
//! - `pipeline`: capture and inference threads
//! - `config`: file + env configuration
//! - `eval`: offline scoring of saved prediction runs against TACO annotations

pub mod config;
pub mod detect;
pub mod eval;
pub mod fps;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod model;
pub mod overlay;
pub mod pipeline;
pub mod render;

pub use config::{AppConfig, ModelSettings, ModelsConfig, PreviewSettings};
pub use detect::{Detection, DetectorBackend, FrameDetector, ModelRegistry, StubBackend};
pub use fps::{format_fps, update_fps, FpsEstimator};
pub use frame::{Frame, FrameSlot};
pub use geometry::{
    NormalizedRect, PreviewConverter, PreviewLayer, ReferenceSize, ScreenRect, VideoGravity,
};
pub use ingest::{open_source, FrameSource, SourceConfig, SyntheticSource};
pub use model::{ModelOption, ModelSelection};
pub use overlay::{
    build_drawables, label_frame, map_detection_to_screen, Drawable, LabelBox, OverlayLayer,
    OverlayStyle, Rgba, LABEL_HEIGHT, LABEL_WIDTH,
};
pub use pipeline::{FrameResult, Pipeline, PipelineHandle, PipelineStats};
pub use render::{
    LogSink, OverlayRenderer, RecordedLabel, RecordedShape, RecordingSink, RenderSink,
};
