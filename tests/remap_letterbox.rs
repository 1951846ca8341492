//! Inverse letterbox checks against hand-computed cases.

use serde::Deserialize;
use yolopost::lowlevel::{reverse_letterbox, select_and_remap, LetterboxTransform};
use yolopost::{Detection, ImageSize, Rect, SortStrategy};

const CASES_JSON: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/data/letterbox_cases.json"
));

/// One remap case; sizes are `[rows, cols]`, rectangles `[x, y, w, h]`.
#[derive(Debug, Deserialize)]
struct Case {
    case_id: String,
    letterbox: [usize; 2],
    source: [usize; 2],
    pad: [f32; 2],
    input: [f32; 4],
    expected: [f32; 4],
}

#[derive(Debug, Deserialize)]
struct Cases {
    cases: Vec<Case>,
}

fn rect(v: [f32; 4]) -> Rect {
    Rect::new(v[0], v[1], v[2], v[3])
}

#[test]
fn fixture_cases_remap_as_expected() {
    let cases: Cases = serde_json::from_str(CASES_JSON).expect("parse letterbox cases");
    assert!(!cases.cases.is_empty());

    for case in &cases.cases {
        let letterbox = ImageSize::new(case.letterbox[0], case.letterbox[1]);
        let source = ImageSize::new(case.source[0], case.source[1]);
        let transform = LetterboxTransform::new(letterbox, source).unwrap();
        assert_eq!(
            transform.padding(),
            (case.pad[0], case.pad[1]),
            "{}",
            case.case_id
        );

        let got = transform.remap_rect(&rect(case.input));
        let want = rect(case.expected);
        for (g, w) in [
            (got.x, want.x),
            (got.y, want.y),
            (got.width, want.width),
            (got.height, want.height),
        ] {
            assert!((g - w).abs() < 1e-3, "{}: got {got:?}, want {want:?}", case.case_id);
        }
    }
}

#[test]
fn full_canvas_maps_to_full_source_image() {
    let letterbox = ImageSize::new(640, 640);
    let source = ImageSize::new(480, 640);
    let dets = [Detection::new(Rect::new(0.0, 80.0, 640.0, 480.0), 0, 0.9)];

    let out = reverse_letterbox(&dets, letterbox, source).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].rect, Rect::new(0.0, 0.0, 639.0, 479.0));
    assert_eq!(out[0].label, 0);
    assert_eq!(out[0].score, 0.9);
}

#[test]
fn remapped_boxes_stay_inside_the_image() {
    let letterbox = ImageSize::new(640, 640);
    let source = ImageSize::new(375, 500);
    let dets: Vec<Detection> = (0..40)
        .map(|i| {
            let f = i as f32;
            Detection::new(Rect::new(f * 20.0 - 100.0, f * 15.0 - 50.0, 200.0, 120.0), 0, 0.5)
        })
        .collect();

    for det in reverse_letterbox(&dets, letterbox, source).unwrap() {
        let (x0, y0, x1, y1) = det.rect.corners();
        assert!(det.rect.width >= 0.0 && det.rect.height >= 0.0);
        assert!((0.0..=499.0).contains(&x0) && (0.0..=499.0).contains(&x1));
        assert!((0.0..=374.0).contains(&y0) && (0.0..=374.0).contains(&y1));
    }
}

#[test]
fn empty_inputs_remap_to_empty_outputs() {
    let letterbox = ImageSize::new(640, 640);
    let source = ImageSize::new(480, 640);
    assert!(reverse_letterbox(&[], letterbox, source).unwrap().is_empty());

    let mut none: Vec<Detection> = Vec::new();
    let out = select_and_remap(&mut none, 0.45, letterbox, source, SortStrategy::Sequential)
        .unwrap();
    assert!(out.is_empty());
}

#[test]
fn select_and_remap_sorts_suppresses_then_maps() {
    let letterbox = ImageSize::new(640, 640);
    let source = ImageSize::new(480, 640);
    let mut proposals = vec![
        Detection::new(Rect::new(100.0, 180.0, 50.0, 50.0), 2, 0.6),
        Detection::new(Rect::new(102.0, 182.0, 50.0, 50.0), 2, 0.9),
        Detection::new(Rect::new(400.0, 300.0, 40.0, 40.0), 5, 0.7),
    ];

    let out = select_and_remap(
        &mut proposals,
        0.45,
        letterbox,
        source,
        SortStrategy::Sequential,
    )
    .unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].score, 0.9);
    assert_eq!(out[0].rect, Rect::new(102.0, 102.0, 50.0, 50.0));
    assert_eq!(out[1].label, 5);
    assert_eq!(out[1].rect, Rect::new(400.0, 220.0, 40.0, 40.0));
    assert!(proposals.windows(2).all(|w| w[0].score >= w[1].score));
}
