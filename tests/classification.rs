use digit_draw::{
    weights::save_classifier, Bitmap, CpuBackend, DigitClassifierConfig, DigitDrawConfig,
    DigitError, InferenceSession, NormalizeMode, PixelLayout, Point, RasterCanvas,
    StrokeNormalizer,
};
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

type B = CpuBackend;

fn write_weights(dir: &Path, config: DigitClassifierConfig) -> PathBuf {
    let model = config.init::<B>(&Default::default());
    save_classifier(model, &dir.join("weights")).expect("Weights should be written")
}

fn open_session(weights: &Path) -> digit_draw::Result<InferenceSession<B>> {
    let config = DigitDrawConfig::new(weights.to_string_lossy().into_owned());
    InferenceSession::open(&config, Default::default())
}

fn draw_seven(layout: PixelLayout) -> Bitmap {
    let mut canvas = RasterCanvas::new(400, 400, layout).unwrap();
    canvas.add_stroke(Point::new(110.0, 90.0), Point::new(290.0, 90.0), 24.0);
    canvas.add_stroke(Point::new(290.0, 90.0), Point::new(170.0, 320.0), 24.0);
    canvas.snapshot()
}

#[test]
fn blank_canvas_classifies_without_error() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&write_weights(dir.path(), DigitClassifierConfig::new())).unwrap();
    let canvas = RasterCanvas::new(280, 280, PixelLayout::Bgr).unwrap();

    let prediction = session.classify(&canvas.snapshot()).unwrap();

    assert!(prediction.label <= 9);
    assert_eq!(prediction.scores.as_slice().len(), 10);
    assert!(prediction.scores.as_slice().iter().all(|s| s.is_finite()));
}

#[test]
fn eleven_class_artifact_fails_at_construction() {
    let dir = TempDir::new().unwrap();
    let weights = write_weights(dir.path(), DigitClassifierConfig::new().with_num_classes(11));

    let result = open_session(&weights);

    match result {
        Err(DigitError::WeightLoad { reason, .. }) => assert!(reason.contains("fc2")),
        other => panic!("Expected a weight load error, got {other:?}"),
    }
}

#[test]
fn missing_artifact_fails_at_construction() {
    let dir = TempDir::new().unwrap();

    let result = open_session(&dir.path().join("simplecnn_state.pth"));

    assert!(matches!(result, Err(DigitError::WeightLoad { .. })));
}

#[cfg(feature = "pytorch")]
#[test]
fn pytorch_state_dict_classifies_a_drawing() {
    let weights = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/simplecnn_state.pth");
    let session = open_session(&weights).unwrap();

    let prediction = session.classify(&draw_seven(PixelLayout::Bgr)).unwrap();

    assert!(prediction.label <= 9);
    assert!(prediction.scores.as_slice().iter().all(|s| s.is_finite()));
}

#[test]
fn reversed_channels_match_grayscale_drawing() {
    let normalizer = StrokeNormalizer::default();

    let gray = normalizer
        .normalize(&draw_seven(PixelLayout::Gray), NormalizeMode::Classification)
        .unwrap();
    let bgr = normalizer
        .normalize(&draw_seven(PixelLayout::Bgr), NormalizeMode::Classification)
        .unwrap();

    for (a, b) in gray.values().iter().zip(bgr.values()) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }
}

#[test]
fn colored_bgr_snapshot_matches_its_rgb_twin() {
    let (width, height) = (120, 90);
    let rgb: Vec<u8> = (0..width * height)
        .flat_map(|i| [(i % 251) as u8, (i % 127) as u8, (i % 63) as u8])
        .collect();
    let bgr: Vec<u8> = rgb.chunks_exact(3).flat_map(|p| [p[2], p[1], p[0]]).collect();
    let normalizer = StrokeNormalizer::default();

    let from_rgb = normalizer
        .normalize(
            &Bitmap::new(width, height, PixelLayout::Rgb, rgb).unwrap(),
            NormalizeMode::Export,
        )
        .unwrap();
    let from_bgr = normalizer
        .normalize(
            &Bitmap::new(width, height, PixelLayout::Bgr, bgr).unwrap(),
            NormalizeMode::Export,
        )
        .unwrap();

    assert_eq!(from_rgb, from_bgr);
}

#[test]
fn classification_does_not_touch_the_canvas() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&write_weights(dir.path(), DigitClassifierConfig::new())).unwrap();
    let mut canvas = RasterCanvas::new(200, 200, PixelLayout::Rgb).unwrap();
    canvas.add_stroke(Point::new(100.0, 30.0), Point::new(100.0, 170.0), 20.0);
    let before = canvas.snapshot();

    session.classify(&canvas.snapshot()).unwrap();
    let invalid = Bitmap::from_channels(200, 200, 4, vec![0; 200 * 200 * 4]);

    assert!(matches!(invalid, Err(DigitError::InvalidBitmap { .. })));
    assert_eq!(canvas.snapshot(), before);
}

#[test]
fn cloned_sessions_classify_concurrently() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&write_weights(dir.path(), DigitClassifierConfig::new())).unwrap();
    let bitmap = draw_seven(PixelLayout::Bgr);
    let expected = session.classify(&bitmap).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let session = session.clone();
            let bitmap = bitmap.clone();
            thread::spawn(move || session.classify(&bitmap).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
