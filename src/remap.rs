//! Inverse letterbox mapping from network canvas to source image pixels.
//!
//! The forward letterbox scales the source by
//! `min(letterbox_rows / src_rows, letterbox_cols / src_cols)`, truncates the
//! resized size to whole pixels and pads both sides evenly. The inverse
//! subtracts the padding, multiplies by `src / resized` and clamps every
//! corner into the source image.
//!
//! The horizontal ratio is `src_rows / resize_rows` and the vertical ratio is
//! `src_cols / resize_cols`. Both ratios come from the same uniform scale, so
//! they only differ by truncation of the resized size; the pairing is kept
//! as-is so outputs match existing deployments bit for bit.

use crate::detection::Detection;
use crate::geometry::{ImageSize, Rect};
use crate::select::nms::nms_sorted_bboxes;
use crate::select::sort::{sort_by_score_desc, SortStrategy};
use crate::util::{YoloPostError, YoloPostResult};

/// Precomputed inverse letterbox parameters for one canvas/source pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LetterboxTransform {
    scale: f32,
    resized: ImageSize,
    pad_w: f32,
    pad_h: f32,
    ratio_x: f32,
    ratio_y: f32,
    max_x: f32,
    max_y: f32,
}

impl LetterboxTransform {
    /// Derives the transform for a `letterbox` canvas and `src` image.
    pub fn new(letterbox: ImageSize, src: ImageSize) -> YoloPostResult<Self> {
        if letterbox.is_empty() {
            return Err(YoloPostError::InvalidDimensions {
                width: letterbox.cols,
                height: letterbox.rows,
            });
        }
        if src.is_empty() {
            return Err(YoloPostError::InvalidDimensions {
                width: src.cols,
                height: src.rows,
            });
        }

        let scale_rows = letterbox.rows as f64 / src.rows as f64;
        let scale_cols = letterbox.cols as f64 / src.cols as f64;
        let scale = if scale_rows < scale_cols {
            scale_rows as f32
        } else {
            scale_cols as f32
        };

        let resized = ImageSize::new(
            (scale * src.rows as f32) as usize,
            (scale * src.cols as f32) as usize,
        );
        if resized.is_empty() {
            return Err(YoloPostError::InvalidDimensions {
                width: resized.cols,
                height: resized.rows,
            });
        }

        let pad_h = letterbox.rows.saturating_sub(resized.rows) / 2;
        let pad_w = letterbox.cols.saturating_sub(resized.cols) / 2;

        Ok(Self {
            scale,
            resized,
            pad_w: pad_w as f32,
            pad_h: pad_h as f32,
            ratio_x: src.rows as f32 / resized.rows as f32,
            ratio_y: src.cols as f32 / resized.cols as f32,
            max_x: (src.cols - 1) as f32,
            max_y: (src.rows - 1) as f32,
        })
    }

    /// Uniform letterbox scale factor.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Size of the scaled image inside the canvas.
    pub fn resized(&self) -> ImageSize {
        self.resized
    }

    /// Padding as `(pad_w, pad_h)`.
    pub fn padding(&self) -> (f32, f32) {
        (self.pad_w, self.pad_h)
    }

    /// Inverse ratios as `(ratio_x, ratio_y)`.
    pub fn ratios(&self) -> (f32, f32) {
        (self.ratio_x, self.ratio_y)
    }

    /// Maps one letterbox rectangle into clamped source coordinates.
    pub fn remap_rect(&self, rect: &Rect) -> Rect {
        let (x0, y0, x1, y1) = rect.corners();
        let x0 = self.clamp_x((x0 - self.pad_w) * self.ratio_x);
        let y0 = self.clamp_y((y0 - self.pad_h) * self.ratio_y);
        let x1 = self.clamp_x((x1 - self.pad_w) * self.ratio_x);
        let y1 = self.clamp_y((y1 - self.pad_h) * self.ratio_y);
        Rect::from_corners(x0, y0, x1, y1)
    }

    /// Rewrites every rectangle in `dets`.
    pub fn remap_in_place(&self, dets: &mut [Detection]) {
        for det in dets.iter_mut() {
            det.rect = self.remap_rect(&det.rect);
        }
    }

    fn clamp_x(&self, v: f32) -> f32 {
        v.min(self.max_x).max(0.0)
    }

    fn clamp_y(&self, v: f32) -> f32 {
        v.min(self.max_y).max(0.0)
    }
}

/// Maps unfiltered letterbox detections back to the source image.
pub fn reverse_letterbox(
    proposals: &[Detection],
    letterbox: ImageSize,
    src: ImageSize,
) -> YoloPostResult<Vec<Detection>> {
    let transform = LetterboxTransform::new(letterbox, src)?;
    let mut out = proposals.to_vec();
    transform.remap_in_place(&mut out);
    Ok(out)
}

/// Sorts `proposals` by score, applies NMS and maps the survivors to the
/// source image.
///
/// `proposals` is left in score-descending order.
pub fn select_and_remap(
    proposals: &mut [Detection],
    nms_threshold: f32,
    letterbox: ImageSize,
    src: ImageSize,
    strategy: SortStrategy,
) -> YoloPostResult<Vec<Detection>> {
    let transform = LetterboxTransform::new(letterbox, src)?;
    sort_by_score_desc(proposals, strategy);
    let picked = nms_sorted_bboxes(proposals, nms_threshold);

    let mut out: Vec<Detection> = picked.into_iter().map(|idx| proposals[idx]).collect();
    transform.remap_in_place(&mut out);
    Ok(out)
}
