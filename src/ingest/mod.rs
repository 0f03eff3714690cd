//! Frame sources.
//!
//! Sources produce RGB24 `Frame`s for the capture thread:
//! - synthetic `stub://` source (always available)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! Sources are pulled serially by one capture thread. They must not block
//! longer than one frame interval when healthy.

#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;

use crate::frame::Frame;

pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

pub const STUB_SOURCE_PREFIX: &str = "stub://";

/// Configuration for a frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceConfig {
    /// `stub://<name>` for synthetic frames, or a device path such as
    /// `/dev/video0` (optionally prefixed with `v4l2://`).
    pub url: String,
    /// Target frame rate. 0 means "as fast as possible".
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
            max_frames: None,
        }
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

/// A stream of frames.
pub trait FrameSource: Send {
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Open the source named by `config.url`.
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>> {
    if config.url.starts_with(STUB_SOURCE_PREFIX) {
        return Ok(Box::new(SyntheticSource::new(config.clone())));
    }

    #[cfg(feature = "ingest-v4l2")]
    {
        let device = config
            .url
            .strip_prefix("v4l2://")
            .unwrap_or(&config.url)
            .to_string();
        Ok(Box::new(V4l2Source::new(v4l2::V4l2Config {
            device,
            target_fps: config.target_fps,
            width: config.width,
            height: config.height,
            max_frames: config.max_frames,
        })?))
    }
    #[cfg(not(feature = "ingest-v4l2"))]
    {
        anyhow::bail!(
            "source {} requires the ingest-v4l2 feature",
            config.url
        )
    }
}
