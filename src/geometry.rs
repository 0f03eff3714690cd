//! Rectangle types and preview-space conversion.
//!
//! Two coordinate spaces meet here:
//! - Normalized space: values in 0..1 relative to the video frame. Detector
//!   output uses a bottom-left origin; the converter input is the same rect
//!   flipped to a top-left origin.
//! - Preview space: pixels of the on-screen preview surface, top-left origin.

use serde::{Deserialize, Serialize};

/// Rectangle in normalized (0..1) coordinates.
///
/// Values are not validated; out-of-range rects flow through unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub const UNIT: NormalizedRect = NormalizedRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.x.min(self.x + self.width)
    }

    pub fn max_x(&self) -> f64 {
        self.x.max(self.x + self.width)
    }

    pub fn min_y(&self) -> f64 {
        self.y.min(self.y + self.height)
    }

    pub fn max_y(&self) -> f64 {
        self.y.max(self.y + self.height)
    }

    /// Mirror the rect across the horizontal center line.
    ///
    /// Converts between bottom-left and top-left origin. Applying it twice
    /// returns the original rect.
    pub fn flip_vertical(&self) -> Self {
        Self {
            x: self.x,
            y: 1.0 - self.max_y(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Rectangle in preview (screen) coordinates, top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.x.min(self.x + self.width)
    }

    pub fn max_x(&self) -> f64 {
        self.x.max(self.x + self.width)
    }

    pub fn min_y(&self) -> f64 {
        self.y.min(self.y + self.height)
    }

    pub fn max_y(&self) -> f64 {
        self.y.max(self.y + self.height)
    }
}

/// Pixel size of the frame the detector output geometry refers to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSize {
    pub width: f64,
    pub height: f64,
}

impl ReferenceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for ReferenceSize {
    fn default() -> Self {
        // Full-resolution still-photo preset of the original capture session.
        Self {
            width: 4032.0,
            height: 3024.0,
        }
    }
}

// ----------------------------------------------------------------------------
// PreviewConverter: normalized rect -> preview rect
// ----------------------------------------------------------------------------

/// Maps a normalized, top-left-origin rect into preview pixels.
///
/// Implementations account for how the video is scaled into the preview
/// (cropping, letterboxing). They must not clamp; the renderer clips.
pub trait PreviewConverter {
    fn convert(&self, rect: NormalizedRect) -> ScreenRect;
}

/// How video content is scaled into the preview bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoGravity {
    /// Preserve aspect ratio and fill the bounds, cropping overflow.
    #[default]
    ResizeAspectFill,
    /// Preserve aspect ratio and fit inside the bounds.
    ResizeAspect,
    /// Stretch independently on each axis.
    Resize,
}

/// On-screen preview surface showing video of a fixed size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewLayer {
    pub bounds_width: f64,
    pub bounds_height: f64,
    pub video_width: f64,
    pub video_height: f64,
    pub gravity: VideoGravity,
}

impl PreviewLayer {
    pub fn new(bounds_width: f64, bounds_height: f64, video: ReferenceSize) -> Self {
        Self {
            bounds_width,
            bounds_height,
            video_width: video.width,
            video_height: video.height,
            gravity: VideoGravity::default(),
        }
    }

    pub fn with_gravity(mut self, gravity: VideoGravity) -> Self {
        self.gravity = gravity;
        self
    }

    /// Resize the preview bounds, e.g. after a window change.
    pub fn set_bounds(&mut self, width: f64, height: f64) {
        self.bounds_width = width;
        self.bounds_height = height;
    }

    pub fn bounds(&self) -> ScreenRect {
        ScreenRect::new(0.0, 0.0, self.bounds_width, self.bounds_height)
    }

    /// Rect the full video occupies inside (or beyond) the bounds.
    pub fn video_rect(&self) -> ScreenRect {
        let sx = self.bounds_width / self.video_width;
        let sy = self.bounds_height / self.video_height;
        let (scale_x, scale_y) = match self.gravity {
            VideoGravity::ResizeAspectFill => {
                let s = sx.max(sy);
                (s, s)
            }
            VideoGravity::ResizeAspect => {
                let s = sx.min(sy);
                (s, s)
            }
            VideoGravity::Resize => (sx, sy),
        };
        let width = self.video_width * scale_x;
        let height = self.video_height * scale_y;
        ScreenRect::new(
            (self.bounds_width - width) / 2.0,
            (self.bounds_height - height) / 2.0,
            width,
            height,
        )
    }
}

impl PreviewConverter for PreviewLayer {
    fn convert(&self, rect: NormalizedRect) -> ScreenRect {
        let video = self.video_rect();
        ScreenRect::new(
            video.x + rect.x * video.width,
            video.y + rect.y * video.height,
            rect.width * video.width,
            rect.height * video.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn aspect_fill_without_crop_covers_bounds() {
        let layer = PreviewLayer::new(400.0, 300.0, ReferenceSize::default());
        let rect = layer.convert(NormalizedRect::UNIT);
        let bounds = layer.bounds();
        assert!(approx(rect.x, bounds.x));
        assert!(approx(rect.y, bounds.y));
        assert!(approx(rect.width, bounds.width));
        assert!(approx(rect.height, bounds.height));
    }

    #[test]
    fn aspect_fill_crops_overflow_symmetrically() {
        // 4:3 video in a square preview overflows horizontally.
        let layer = PreviewLayer::new(300.0, 300.0, ReferenceSize::new(400.0, 300.0));
        let video = layer.video_rect();
        assert!(approx(video.width, 400.0));
        assert!(approx(video.height, 300.0));
        assert!(approx(video.x, -50.0));
        assert!(approx(video.y, 0.0));

        let centered = layer.convert(NormalizedRect::new(0.25, 0.25, 0.5, 0.5));
        assert!(approx(centered.x, 50.0));
        assert!(approx(centered.width, 200.0));
    }

    #[test]
    fn aspect_fit_letterboxes() {
        let layer = PreviewLayer::new(300.0, 300.0, ReferenceSize::new(400.0, 300.0))
            .with_gravity(VideoGravity::ResizeAspect);
        let video = layer.video_rect();
        assert!(approx(video.x, 0.0));
        assert!(approx(video.width, 300.0));
        assert!(approx(video.height, 225.0));
        assert!(approx(video.y, 37.5));
    }

    #[test]
    fn flip_vertical_is_an_involution() {
        let rect = NormalizedRect::new(0.1, 0.2, 0.3, 0.4);
        let flipped = rect.flip_vertical();
        assert!(approx(flipped.y, 0.4));
        let back = flipped.flip_vertical();
        assert!(approx(back.y, rect.y));
        assert_eq!(back.width, rect.width);
        assert_eq!(back.height, rect.height);
    }

    #[test]
    fn min_max_standardize_negative_sizes() {
        let rect = ScreenRect::new(10.0, 10.0, -4.0, -6.0);
        assert_eq!(rect.min_x(), 6.0);
        assert_eq!(rect.max_x(), 10.0);
        assert_eq!(rect.min_y(), 4.0);
        assert_eq!(rect.max_y(), 10.0);
    }
}
