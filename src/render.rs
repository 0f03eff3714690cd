//! Render-side overlay state.
//!
//! `OverlayRenderer` lives on the render (UI) context. It owns the displayed
//! overlay set and the preview geometry, and pushes each frame's drawables
//! to a `RenderSink`. Every update clears the sink before drawing, so
//! overlays never accumulate across frames.

use crate::fps::format_fps;
use crate::geometry::{PreviewLayer, ReferenceSize, ScreenRect};
use crate::overlay::{build_drawables, Drawable, LabelBox, OverlayLayer, OverlayStyle, Rgba};
use crate::pipeline::FrameResult;

/// Drawing surface for overlays.
pub trait RenderSink {
    /// Remove every shape and label drawn so far.
    fn clear_overlays(&mut self);

    /// Draw a stroke-only rectangle.
    fn stroke_rect(&mut self, rect: &ScreenRect, style: &OverlayStyle);

    fn draw_label(&mut self, label: &LabelBox, style: &OverlayStyle);

    /// Replace the FPS readout.
    fn draw_fps(&mut self, text: &str, style: &OverlayStyle);
}

pub struct OverlayRenderer<S: RenderSink> {
    sink: S,
    layer: OverlayLayer,
    preview: PreviewLayer,
    reference: ReferenceSize,
    style: OverlayStyle,
    fps_text: String,
    last_sequence: Option<u64>,
}

impl<S: RenderSink> OverlayRenderer<S> {
    pub fn new(sink: S, preview: PreviewLayer, reference: ReferenceSize) -> Self {
        Self {
            sink,
            layer: OverlayLayer::new(),
            preview,
            reference,
            style: OverlayStyle::default(),
            fps_text: format_fps(0.0),
            last_sequence: None,
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    /// Show one frame's results, replacing whatever was on screen.
    pub fn apply(&mut self, result: &FrameResult) {
        let drawables = build_drawables(&result.detections, self.reference, &self.preview);
        self.show(drawables);
        self.fps_text = format_fps(result.fps);
        self.sink.draw_fps(&self.fps_text, &self.style);
        self.last_sequence = Some(result.sequence);
    }

    fn show(&mut self, drawables: Vec<Drawable>) {
        self.sink.clear_overlays();
        for drawable in &drawables {
            self.sink.stroke_rect(&drawable.rect, &self.style);
            self.sink.draw_label(&drawable.label, &self.style);
        }
        self.layer.replace(drawables);
    }

    /// Preview bounds changed; later frames map into the new size.
    pub fn resize_preview(&mut self, width: f64, height: f64) {
        self.preview.set_bounds(width, height);
    }

    pub fn layer(&self) -> &OverlayLayer {
        &self.layer
    }

    pub fn preview(&self) -> &PreviewLayer {
        &self.preview
    }

    pub fn fps_text(&self) -> &str {
        &self.fps_text
    }

    /// Sequence number of the frame currently shown.
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

// ----------------------------------------------------------------------------
// Sinks
// ----------------------------------------------------------------------------

/// A box as it was stroked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordedShape {
    pub rect: ScreenRect,
    pub stroke: Rgba,
    pub line_width: f64,
    pub fill: Option<Rgba>,
}

/// A label as it was drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedLabel {
    pub label: LabelBox,
    pub font_size: f64,
    pub foreground: Rgba,
    pub background: Rgba,
}

/// Keeps what is currently "on screen" in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub shapes: Vec<RecordedShape>,
    pub labels: Vec<RecordedLabel>,
    pub fps_text: Option<String>,
    /// Foreground and background of the FPS readout.
    pub fps_colors: Option<(Rgba, Rgba)>,
    pub clears: u64,
}

impl RenderSink for RecordingSink {
    fn clear_overlays(&mut self) {
        self.shapes.clear();
        self.labels.clear();
        self.clears += 1;
    }

    fn stroke_rect(&mut self, rect: &ScreenRect, style: &OverlayStyle) {
        self.shapes.push(RecordedShape {
            rect: *rect,
            stroke: style.stroke,
            line_width: style.line_width,
            fill: style.fill,
        });
    }

    fn draw_label(&mut self, label: &LabelBox, style: &OverlayStyle) {
        self.labels.push(RecordedLabel {
            label: label.clone(),
            font_size: style.label_font_size,
            foreground: style.label_foreground,
            background: style.label_background,
        });
    }

    fn draw_fps(&mut self, text: &str, style: &OverlayStyle) {
        self.fps_text = Some(text.to_string());
        self.fps_colors = Some((style.fps_foreground, style.fps_background));
    }
}

/// Writes overlays to the log. Boxes go to `debug`, FPS to `trace`.
#[derive(Debug, Default)]
pub struct LogSink {
    drawn: usize,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shapes drawn since the last clear.
    pub fn drawn(&self) -> usize {
        self.drawn
    }
}

impl RenderSink for LogSink {
    fn clear_overlays(&mut self) {
        self.drawn = 0;
    }

    fn stroke_rect(&mut self, rect: &ScreenRect, style: &OverlayStyle) {
        self.drawn += 1;
        log::debug!(
            "box x={:.1} y={:.1} w={:.1} h={:.1} stroke={} width={:.1}{}",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            style.stroke,
            style.line_width,
            style
                .fill
                .map(|fill| format!(" fill={}", fill))
                .unwrap_or_default()
        );
    }

    fn draw_label(&mut self, label: &LabelBox, style: &OverlayStyle) {
        log::debug!(
            "label '{}' at ({:.1}, {:.1}) size={:.0} fg={} bg={}",
            label.text,
            label.frame.x,
            label.frame.y,
            style.label_font_size,
            style.label_foreground,
            style.label_background
        );
    }

    fn draw_fps(&mut self, text: &str, style: &OverlayStyle) {
        log::trace!("{} fg={} bg={}", text, style.fps_foreground, style.fps_background);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Detection;
    use crate::geometry::NormalizedRect;
    use crate::model::ModelOption;

    fn result(sequence: u64, count: usize, fps: f64) -> FrameResult {
        let detections = (0..count)
            .map(|i| {
                Detection::new(
                    NormalizedRect::new(0.1 * i as f64, 0.1, 0.1, 0.1),
                    format!("obj{}", i),
                    0.75,
                )
            })
            .collect();
        FrameResult {
            sequence,
            model: ModelOption::TacoYolo,
            detections,
            fps,
            frame_width: 640,
            frame_height: 480,
        }
    }

    fn renderer() -> OverlayRenderer<RecordingSink> {
        let reference = ReferenceSize::default();
        OverlayRenderer::new(
            RecordingSink::default(),
            PreviewLayer::new(400.0, 300.0, reference),
            reference,
        )
    }

    #[test]
    fn redraw_replaces_previous_overlays() {
        let mut renderer = renderer();
        renderer.apply(&result(1, 3, 30.0));
        assert_eq!(renderer.sink().shapes.len(), 3);

        renderer.apply(&result(2, 1, 30.0));
        assert_eq!(renderer.sink().shapes.len(), 1);
        assert_eq!(renderer.sink().labels.len(), 1);
        assert_eq!(renderer.layer().shape_count(), 1);
        assert_eq!(renderer.sink().clears, 2);
        assert_eq!(renderer.last_sequence(), Some(2));
    }

    #[test]
    fn empty_result_clears_and_updates_fps() {
        let mut renderer = renderer();
        renderer.apply(&result(1, 2, 10.0));
        renderer.apply(&result(2, 0, 12.34));
        assert!(renderer.sink().shapes.is_empty());
        assert!(renderer.sink().labels.is_empty());
        assert_eq!(renderer.fps_text(), "FPS: 12.3");
        assert_eq!(renderer.sink().fps_text.as_deref(), Some("FPS: 12.3"));
    }

    #[test]
    fn resize_changes_mapping() {
        let mut renderer = renderer();
        renderer.apply(&result(1, 1, 1.0));
        let before = renderer.sink().shapes[0].rect;
        renderer.resize_preview(800.0, 600.0);
        renderer.apply(&result(2, 1, 1.0));
        let after = renderer.sink().shapes[0].rect;
        assert!((after.width - before.width * 2.0).abs() < 1e-9);
    }

    #[test]
    fn default_style_reaches_the_sink() {
        let mut renderer = renderer();
        renderer.apply(&result(1, 2, 30.0));
        for shape in &renderer.sink().shapes {
            assert_eq!(shape.stroke, Rgba::GREEN);
            assert_eq!(shape.line_width, 2.0);
            assert_eq!(shape.fill, None);
        }
        let label = &renderer.sink().labels[0];
        assert_eq!(label.font_size, 12.0);
        assert_eq!(label.foreground, Rgba::GREEN);
        assert_eq!(label.background, Rgba::BLACK_HALF);
        assert_eq!(renderer.sink().fps_colors, Some((Rgba::BLACK, Rgba::WHITE)));
    }

    #[test]
    fn custom_style_is_applied() {
        let reference = ReferenceSize::default();
        let style = OverlayStyle {
            stroke: Rgba::WHITE,
            line_width: 4.0,
            ..OverlayStyle::default()
        };
        let mut renderer = OverlayRenderer::new(
            RecordingSink::default(),
            PreviewLayer::new(400.0, 300.0, reference),
            reference,
        )
        .with_style(style);
        renderer.apply(&result(1, 1, 30.0));
        assert_eq!(renderer.sink().shapes[0].stroke, Rgba::WHITE);
        assert_eq!(renderer.sink().shapes[0].line_width, 4.0);
    }

    #[test]
    fn log_sink_counts_shapes_per_frame() {
        let reference = ReferenceSize::default();
        let mut renderer = OverlayRenderer::new(
            LogSink::new(),
            PreviewLayer::new(400.0, 300.0, reference),
            reference,
        );
        renderer.apply(&result(1, 4, 5.0));
        renderer.apply(&result(2, 2, 5.0));
        assert_eq!(renderer.sink().drawn(), 2);
    }
}
