use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use yolopost::lowlevel::generate_grids_and_stride;
use yolopost::{AnchorSet, DecodeConfig, Decoder, ImageSize, StrideOutput, YoloPostError};

const BACKGROUND: f32 = -20.0;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn default_decoder() -> Decoder {
    Decoder::new(
        DecodeConfig::default(),
        AnchorSet::yolov5(),
        ImageSize::new(640, 640),
    )
    .unwrap()
}

/// Buffer for stride 32 on a 640x640 canvas with every value at `BACKGROUND`.
fn background_stride32() -> Vec<f32> {
    vec![BACKGROUND; 3 * 20 * 20 * 85]
}

fn cell_offset(anchor: usize, row: usize, col: usize) -> usize {
    ((anchor * 20 + row) * 20 + col) * 85
}

fn single_hit_buffer(obj_raw: f32, class_raw: f32, class_idx: usize) -> Vec<f32> {
    let mut data = background_stride32();
    let base = cell_offset(1, 5, 7);
    data[base..base + 4].fill(0.0);
    data[base + 4] = obj_raw;
    data[base + 5 + class_idx] = class_raw;
    data
}

#[test]
fn single_cell_score_is_product_of_sigmoids() {
    let decoder = default_decoder();
    let data = single_hit_buffer(2.0, 1.5, 17);

    let dets = decoder
        .decode_stride(StrideOutput::new(32, &data), 0.5)
        .unwrap();
    assert_eq!(dets.len(), 1);

    let det = dets[0];
    assert_eq!(det.label, 17);
    assert!((det.score - sigmoid(2.0) * sigmoid(1.5)).abs() < 1e-5);

    // Anchor group 2, slot 1 is (156, 198); zero deltas give a half-cell offset.
    let cx = (0.5 * 2.0 - 0.5 + 7.0) * 32.0;
    let cy = (0.5 * 2.0 - 0.5 + 5.0) * 32.0;
    assert!((det.rect.x - (cx - 78.0)).abs() < 1e-3);
    assert!((det.rect.y - (cy - 99.0)).abs() < 1e-3);
    assert!((det.rect.width - 156.0).abs() < 1e-3);
    assert!((det.rect.height - 198.0).abs() < 1e-3);
}

#[test]
fn single_cell_below_threshold_is_dropped() {
    let decoder = default_decoder();
    let data = single_hit_buffer(2.0, 1.5, 17);
    let score = sigmoid(2.0) * sigmoid(1.5);

    let dets = decoder
        .decode_stride(StrideOutput::new(32, &data), score + 0.01)
        .unwrap();
    assert!(dets.is_empty());
}

#[test]
fn threshold_equal_to_score_keeps_cell() {
    let decoder = default_decoder();
    let data = single_hit_buffer(0.0, 0.0, 3);
    // sigmoid(0)^2 is exactly 0.25 in f32.
    let dets = decoder
        .decode_stride(StrideOutput::new(32, &data), 0.25)
        .unwrap();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].label, 3);
}

#[test]
fn class_ties_keep_lowest_index() {
    let decoder = default_decoder();
    let mut data = single_hit_buffer(3.0, 2.0, 40);
    let base = cell_offset(1, 5, 7);
    data[base + 5 + 12] = 2.0;
    data[base + 5 + 70] = 2.0;

    let dets = decoder
        .decode_stride(StrideOutput::new(32, &data), 0.5)
        .unwrap();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].label, 12);
}

#[test]
fn zero_threshold_emits_every_anchor_of_every_cell() {
    let decoder = default_decoder();
    let data = background_stride32();
    let dets = decoder
        .decode_stride(StrideOutput::new(32, &data), 0.0)
        .unwrap();
    assert_eq!(dets.len(), 3 * 20 * 20);
    assert!(dets.iter().all(|d| d.label == 0));
    assert!(dets.iter().all(|d| (0.0..=1.0).contains(&d.score)));
}

#[test]
fn buffer_size_mismatch_fails_fast() {
    let decoder = default_decoder();
    let data = vec![0.0f32; 3 * 20 * 20 * 85 - 1];
    let err = decoder
        .decode_stride(StrideOutput::new(32, &data), 0.5)
        .unwrap_err();
    assert_eq!(
        err,
        YoloPostError::BufferSizeMismatch {
            stride: 32,
            expected: 102_000,
            got: 101_999
        }
    );
}

#[test]
fn unknown_stride_fails_fast() {
    let decoder = default_decoder();
    let data = background_stride32();
    let err = decoder
        .decode_stride(StrideOutput::new(64, &data), 0.5)
        .unwrap_err();
    assert_eq!(err, YoloPostError::UnknownStride { stride: 64 });
}

#[test]
fn custom_class_count_changes_cell_width() {
    let cfg = DecodeConfig {
        num_classes: 2,
        ..DecodeConfig::default()
    };
    let decoder = Decoder::new(cfg, AnchorSet::yolov5(), ImageSize::new(64, 64)).unwrap();
    let shape = decoder.feature_shape(32).unwrap();
    assert_eq!((shape.anchors, shape.rows, shape.cols, shape.channels), (3, 2, 2, 7));

    let mut data = vec![BACKGROUND; 3 * 2 * 2 * 7];
    // anchor 2, row 1, col 0
    let base = ((2 * 2 + 1) * 2) * 7;
    data[base + 4] = 5.0;
    data[base + 6] = 5.0;
    let dets = decoder
        .decode_stride(StrideOutput::new(32, &data), 0.5)
        .unwrap();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].label, 1);
}

#[test]
fn decoding_explicit_grid_matches_per_stride_decoding() {
    let cfg = DecodeConfig {
        num_classes: 3,
        ..DecodeConfig::default()
    };
    let letterbox = ImageSize::new(64, 96);
    let decoder = Decoder::new(cfg.clone(), AnchorSet::yolov5(), letterbox).unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let mut buffers = Vec::new();
    for &stride in &cfg.strides {
        let shape = decoder.feature_shape(stride).unwrap();
        let len = shape.anchors * shape.rows * shape.cols * shape.channels;
        let data: Vec<f32> = (0..len).map(|_| rng.random_range(-4.0f32..4.0)).collect();
        buffers.push((stride, data));
    }
    let outputs: Vec<StrideOutput<'_>> = buffers
        .iter()
        .map(|(stride, data)| StrideOutput::new(*stride, data))
        .collect();

    let mut expected = Vec::new();
    for output in &outputs {
        expected.extend(decoder.decode_stride(*output, 0.3).unwrap());
    }
    assert!(!expected.is_empty());

    let cells = generate_grids_and_stride(letterbox.cols, letterbox.rows, &cfg.strides).unwrap();
    let from_cells = decoder.decode_cells(&cells, &outputs, 0.3).unwrap();
    assert_eq!(from_cells, expected);
}

#[test]
fn decoding_cells_without_their_stride_output_fails() {
    let decoder = default_decoder();
    let cells = generate_grids_and_stride(640, 640, &[32]).unwrap();
    let err = decoder.decode_cells(&cells, &[], 0.5).unwrap_err();
    assert_eq!(err, YoloPostError::UnknownStride { stride: 32 });
}
