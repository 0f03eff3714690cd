use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// A backend wraps one loaded model. It receives RGB24 pixels for a single
/// frame and returns detections with normalized, bottom-left-origin boxes.
/// Errors are reported to the caller; `FrameDetector` turns them into an
/// empty result so the stream never stalls.
pub trait DetectorBackend: Send {
    /// Backend identifier, used in logs.
    fn name(&self) -> &str;

    /// Run detection on a frame.
    ///
    /// The pixel slice is only valid for the duration of the call.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
