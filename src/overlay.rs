//! Detection-to-overlay mapping.
//!
//! Detector boxes are normalized to the analyzed frame with a bottom-left
//! origin. The overlay is drawn on a preview surface with a top-left origin,
//! which may crop or letterbox the video. This module produces the preview
//! rectangles and label boxes for one frame's detections and holds the
//! currently displayed set.

use crate::detect::Detection;
use crate::geometry::{NormalizedRect, PreviewConverter, ReferenceSize, ScreenRect};

pub const LABEL_WIDTH: f64 = 150.0;
pub const LABEL_HEIGHT: f64 = 20.0;

/// Map one detection into preview coordinates.
///
/// The box is scaled into reference-frame pixels with the vertical axis
/// flipped, normalized again, and handed to `converter`. No clamping: boxes
/// outside 0..1 produce rects outside the preview.
pub fn map_detection_to_screen<C: PreviewConverter + ?Sized>(
    detection: &Detection,
    reference: ReferenceSize,
    converter: &C,
) -> ScreenRect {
    let bbox = detection.bounding_box;
    let w = reference.width;
    let h = reference.height;

    let scaled = ScreenRect::new(
        bbox.min_x() * w,
        (1.0 - bbox.max_y()) * h,
        bbox.width * w,
        bbox.height * h,
    );
    let normalized = NormalizedRect::new(
        scaled.min_x() / w,
        scaled.min_y() / h,
        scaled.width / w,
        scaled.height / h,
    );

    converter.convert(normalized)
}

/// Label box sitting on top of `rect`, left-aligned, never above the preview.
pub fn label_frame(rect: &ScreenRect) -> ScreenRect {
    ScreenRect::new(
        rect.min_x(),
        (rect.min_y() - LABEL_HEIGHT).max(0.0),
        LABEL_WIDTH,
        LABEL_HEIGHT,
    )
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelBox {
    pub frame: ScreenRect,
    pub text: String,
}

/// One detection ready to draw: outline plus caption.
#[derive(Clone, Debug, PartialEq)]
pub struct Drawable {
    pub rect: ScreenRect,
    pub label: LabelBox,
}

impl Drawable {
    pub fn from_detection<C: PreviewConverter + ?Sized>(
        detection: &Detection,
        reference: ReferenceSize,
        converter: &C,
    ) -> Self {
        let rect = map_detection_to_screen(detection, reference, converter);
        Self {
            label: LabelBox {
                frame: label_frame(&rect),
                text: detection.caption(),
            },
            rect,
        }
    }
}

/// Map a whole detection list.
pub fn build_drawables<C: PreviewConverter + ?Sized>(
    detections: &[Detection],
    reference: ReferenceSize,
    converter: &C,
) -> Vec<Drawable> {
    detections
        .iter()
        .map(|det| Drawable::from_detection(det, reference, converter))
        .collect()
}

// ----------------------------------------------------------------------------
// Styling
// ----------------------------------------------------------------------------

/// RGBA color, 8 bits per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const GREEN: Rgba = Rgba([0, 255, 0, 255]);
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);
    pub const BLACK_HALF: Rgba = Rgba([0, 0, 0, 128]);
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);

    pub fn alpha(self) -> u8 {
        self.0[3]
    }
}

impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    pub stroke: Rgba,
    pub line_width: f64,
    /// Box fill. `None` draws outlines only.
    pub fill: Option<Rgba>,
    pub label_font_size: f64,
    pub label_foreground: Rgba,
    pub label_background: Rgba,
    pub fps_foreground: Rgba,
    pub fps_background: Rgba,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke: Rgba::GREEN,
            line_width: 2.0,
            fill: None,
            label_font_size: 12.0,
            label_foreground: Rgba::GREEN,
            label_background: Rgba::BLACK_HALF,
            fps_foreground: Rgba::BLACK,
            fps_background: Rgba::WHITE,
        }
    }
}

// ----------------------------------------------------------------------------
// OverlayLayer: currently displayed set
// ----------------------------------------------------------------------------

/// Drawables currently on screen.
///
/// Updates replace the whole set; nothing carries over from an earlier frame.
#[derive(Debug, Default)]
pub struct OverlayLayer {
    drawables: Vec<Drawable>,
}

impl OverlayLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new frame's drawables, returning the previous set.
    pub fn replace(&mut self, drawables: Vec<Drawable>) -> Vec<Drawable> {
        std::mem::replace(&mut self.drawables, drawables)
    }

    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    pub fn shape_count(&self) -> usize {
        self.drawables.len()
    }

    pub fn label_count(&self) -> usize {
        self.drawables.len()
    }
}
