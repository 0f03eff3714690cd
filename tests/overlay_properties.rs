use taco_lens::{
    build_drawables, label_frame, map_detection_to_screen, update_fps, Detection, FpsEstimator,
    FrameResult, ModelOption, NormalizedRect, OverlayRenderer, PreviewConverter, PreviewLayer,
    RecordingSink, ReferenceSize, Rgba, ScreenRect,
};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Converter that treats normalized coordinates as preview pixels.
struct Identity;

impl PreviewConverter for Identity {
    fn convert(&self, rect: NormalizedRect) -> ScreenRect {
        ScreenRect::new(rect.x, rect.y, rect.width, rect.height)
    }
}

fn detection(x: f64, y: f64, w: f64, h: f64) -> Detection {
    Detection::new(NormalizedRect::new(x, y, w, h), "Bottle", 0.82)
}

fn result(sequence: u64, detections: Vec<Detection>, fps: f64) -> FrameResult {
    FrameResult {
        sequence,
        model: ModelOption::TacoYolo,
        detections,
        fps,
        frame_width: 640,
        frame_height: 480,
    }
}

#[test]
fn full_frame_detection_covers_uncropped_preview() {
    let reference = ReferenceSize::default();
    // Same 4:3 aspect as the reference: aspect-fill does not crop.
    let preview = PreviewLayer::new(800.0, 600.0, reference);
    let rect = map_detection_to_screen(&detection(0.0, 0.0, 1.0, 1.0), reference, &preview);
    let bounds = preview.bounds();
    assert!(approx(rect.x, bounds.x));
    assert!(approx(rect.y, bounds.y));
    assert!(approx(rect.width, bounds.width));
    assert!(approx(rect.height, bounds.height));
}

#[test]
fn vertical_flip_round_trips_under_identity() {
    let reference = ReferenceSize::new(640.0, 480.0);
    for (y, h) in [(0.0, 0.2), (0.1, 0.3), (0.45, 0.5), (0.8, 0.2)] {
        let original = detection(0.2, y, 0.3, h);
        let once = map_detection_to_screen(&original, reference, &Identity);

        let flipped_back = detection(0.2, once.y, 0.3, once.height);
        let twice = map_detection_to_screen(&flipped_back, reference, &Identity);
        assert!(approx(twice.y, original.bounding_box.min_y()), "y={y} h={h}");
    }
}

#[test]
fn redraw_replaces_rather_than_accumulates() {
    let reference = ReferenceSize::default();
    let mut renderer = OverlayRenderer::new(
        RecordingSink::default(),
        PreviewLayer::new(400.0, 300.0, reference),
        reference,
    );

    let first = vec![
        detection(0.1, 0.1, 0.1, 0.1),
        detection(0.4, 0.4, 0.1, 0.1),
        detection(0.7, 0.7, 0.1, 0.1),
    ];
    renderer.apply(&result(1, first, 30.0));
    assert_eq!(renderer.sink().shapes.len(), 3);
    assert_eq!(renderer.sink().labels.len(), 3);

    renderer.apply(&result(2, vec![detection(0.5, 0.5, 0.2, 0.2)], 30.0));
    assert_eq!(renderer.sink().shapes.len(), 1);
    assert_eq!(renderer.sink().labels.len(), 1);
    assert_eq!(renderer.layer().shape_count(), 1);
    assert_eq!(renderer.layer().label_count(), 1);

    let shape = renderer.sink().shapes[0];
    assert_eq!(shape.stroke, Rgba::GREEN);
    assert_eq!(shape.line_width, 2.0);
    assert_eq!(shape.fill, None);
}

#[test]
fn half_second_interval_is_two_fps() {
    let (fps, last) = update_fps(10.0, 9.5);
    assert_eq!(fps, 2.0);
    assert_eq!(last, 10.0);
}

#[test]
fn label_top_never_goes_negative() {
    let label = label_frame(&ScreenRect::new(12.0, 5.0, 100.0, 40.0));
    assert_eq!(label.y, 0.0);
    assert_eq!(label.x, 12.0);
    assert_eq!(label.width, 150.0);
    assert_eq!(label.height, 20.0);

    let label = label_frame(&ScreenRect::new(12.0, 50.0, 100.0, 40.0));
    assert_eq!(label.y, 30.0);
}

#[test]
fn empty_detections_still_update_fps() {
    let reference = ReferenceSize::default();
    let preview = PreviewLayer::new(400.0, 300.0, reference);
    assert!(build_drawables(&[], reference, &preview).is_empty());

    let mut fps = FpsEstimator::new(0.0);
    fps.tick(0.5);
    let mut renderer = OverlayRenderer::new(RecordingSink::default(), preview, reference);
    renderer.apply(&result(1, vec![detection(0.1, 0.1, 0.2, 0.2)], fps.fps()));

    assert_eq!(fps.tick(0.75), 4.0);
    renderer.apply(&result(2, Vec::new(), fps.fps()));
    assert!(renderer.sink().shapes.is_empty());
    assert!(renderer.layer().drawables().is_empty());
    assert_eq!(renderer.fps_text(), "FPS: 4.0");
}
