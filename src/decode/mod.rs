//! Decoding of raw YOLOv5-style head output into candidate detections.
//!
//! Each stride produces one tensor laid out as `[anchor][row][col][channel]`.
//! A cell is kept when `sigmoid(objectness) * sigmoid(best class logit)`
//! reaches the probability threshold; its box is decoded with the YOLOv5
//! parameterization
//!
//! ```text
//! cx = (sigmoid(dx) * 2 - 0.5 + col) * stride
//! cy = (sigmoid(dy) * 2 - 0.5 + row) * stride
//! w  = sigmoid(dw)^2 * 4 * anchor_w
//! h  = sigmoid(dh)^2 * 4 * anchor_h
//! ```
//!
//! All output rectangles are in letterbox coordinates.

pub mod tensor;

use crate::detection::Detection;
use crate::geometry::{ImageSize, Rect};
use crate::grid::anchor::AnchorSet;
use crate::grid::{feature_size, GridCell};
use crate::trace::{trace_event, trace_span};
use crate::util::math::sigmoid;
use crate::util::{YoloPostError, YoloPostResult};
use tensor::{FeatureShape, FeatureView, BOX_CHANNELS, CH_DH, CH_DW, CH_DX, CH_DY, CH_OBJ};

/// Head layout parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeConfig {
    /// Number of object classes.
    pub num_classes: usize,
    /// Anchor slots per grid cell.
    pub anchors_per_group: usize,
    /// Strides in anchor-group order; stride `strides[g]` uses anchor group `g`.
    pub strides: Vec<u32>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            num_classes: 80,
            anchors_per_group: 3,
            strides: vec![8, 16, 32],
        }
    }
}

impl DecodeConfig {
    /// Checks that the layout is usable.
    pub fn validate(&self) -> YoloPostResult<()> {
        if self.num_classes == 0 {
            return Err(YoloPostError::InvalidConfig {
                reason: "num_classes must be positive",
            });
        }
        if self.anchors_per_group == 0 {
            return Err(YoloPostError::InvalidConfig {
                reason: "anchors_per_group must be positive",
            });
        }
        if self.strides.is_empty() {
            return Err(YoloPostError::InvalidConfig {
                reason: "at least one stride is required",
            });
        }
        if self.strides.contains(&0) {
            return Err(YoloPostError::InvalidConfig {
                reason: "strides must be positive",
            });
        }
        for (idx, stride) in self.strides.iter().enumerate() {
            if self.strides[..idx].contains(stride) {
                return Err(YoloPostError::InvalidConfig {
                    reason: "strides must be unique",
                });
            }
        }
        Ok(())
    }

    /// Values per cell: four box deltas, objectness, then class logits.
    pub fn channels(&self) -> usize {
        BOX_CHANNELS + self.num_classes
    }

    /// Anchor group used by `stride`.
    pub fn stride_group(&self, stride: u32) -> YoloPostResult<usize> {
        self.strides
            .iter()
            .position(|&s| s == stride)
            .ok_or(YoloPostError::UnknownStride { stride })
    }
}

/// Raw output buffer of one stride.
#[derive(Clone, Copy, Debug)]
pub struct StrideOutput<'a> {
    /// Stride the buffer was produced at.
    pub stride: u32,
    /// Flat `[anchor][row][col][channel]` values.
    pub data: &'a [f32],
}

impl<'a> StrideOutput<'a> {
    /// Pairs a buffer with its stride.
    pub fn new(stride: u32, data: &'a [f32]) -> Self {
        Self { stride, data }
    }
}

/// Decoder bound to one head layout, anchor table and letterbox canvas.
#[derive(Clone, Debug)]
pub struct Decoder {
    cfg: DecodeConfig,
    anchors: AnchorSet,
    letterbox: ImageSize,
}

impl Decoder {
    /// Creates a decoder after validating the configuration.
    pub fn new(cfg: DecodeConfig, anchors: AnchorSet, letterbox: ImageSize) -> YoloPostResult<Self> {
        cfg.validate()?;
        if letterbox.is_empty() {
            return Err(YoloPostError::InvalidDimensions {
                width: letterbox.cols,
                height: letterbox.rows,
            });
        }
        if anchors.anchors_per_group() != cfg.anchors_per_group {
            return Err(YoloPostError::InvalidConfig {
                reason: "anchor table does not match anchors_per_group",
            });
        }
        Ok(Self {
            cfg,
            anchors,
            letterbox,
        })
    }

    /// Head layout.
    pub fn config(&self) -> &DecodeConfig {
        &self.cfg
    }

    /// Anchor table.
    pub fn anchors(&self) -> &AnchorSet {
        &self.anchors
    }

    /// Letterbox canvas size.
    pub fn letterbox(&self) -> ImageSize {
        self.letterbox
    }

    /// Expected shape of the tensor for `stride`.
    pub fn feature_shape(&self, stride: u32) -> YoloPostResult<FeatureShape> {
        self.cfg.stride_group(stride)?;
        let (cols, rows) = feature_size(self.letterbox.cols, self.letterbox.rows, stride)?;
        Ok(FeatureShape {
            stride,
            anchors: self.cfg.anchors_per_group,
            rows,
            cols,
            channels: self.cfg.channels(),
        })
    }

    /// Validates `data` as the tensor for `stride`.
    pub fn feature_view<'a>(&self, stride: u32, data: &'a [f32]) -> YoloPostResult<FeatureView<'a>> {
        FeatureView::new(data, self.feature_shape(stride)?)
    }

    /// Decodes every cell of one stride, appending hits to `out`.
    pub fn decode_stride_into(
        &self,
        output: StrideOutput<'_>,
        prob_threshold: f32,
        out: &mut Vec<Detection>,
    ) -> YoloPostResult<()> {
        let _span = trace_span!("decode_stride", stride = output.stride).entered();

        let view = self.feature_view(output.stride, output.data)?;
        let anchors = self.group_anchors(output.stride)?;
        let shape = view.shape();
        let before = out.len();

        for row in 0..shape.rows {
            for col in 0..shape.cols {
                for (slot, anchor) in anchors.chunks_exact(2).enumerate() {
                    let cell = view.cell(slot, row, col)?;
                    let prior = (anchor[0], anchor[1]);
                    if let Some(det) =
                        decode_cell(cell, col, row, output.stride, prior, prob_threshold)
                    {
                        out.push(det);
                    }
                }
            }
        }

        trace_event!(
            "stride_candidates",
            stride = output.stride,
            count = out.len() - before
        );
        Ok(())
    }

    /// Decodes every cell of one stride.
    pub fn decode_stride(
        &self,
        output: StrideOutput<'_>,
        prob_threshold: f32,
    ) -> YoloPostResult<Vec<Detection>> {
        let mut out = Vec::new();
        self.decode_stride_into(output, prob_threshold, &mut out)?;
        Ok(out)
    }

    /// Decodes a chosen list of cells, looking up each cell's tensor by stride.
    ///
    /// Within a cell, anchor slots are visited in table order, so decoding
    /// the full output of `generate_grids_and_stride` yields the same
    /// detections as `decode_stride` over each stride in turn.
    pub fn decode_cells(
        &self,
        cells: &[GridCell],
        outputs: &[StrideOutput<'_>],
        prob_threshold: f32,
    ) -> YoloPostResult<Vec<Detection>> {
        let mut views = Vec::with_capacity(outputs.len());
        for output in outputs {
            views.push((
                self.feature_view(output.stride, output.data)?,
                self.group_anchors(output.stride)?,
            ));
        }

        let mut out = Vec::new();
        for cell in cells {
            let (view, anchors) = views
                .iter()
                .find(|(view, _)| view.shape().stride == cell.stride)
                .ok_or(YoloPostError::UnknownStride {
                    stride: cell.stride,
                })?;
            for (slot, anchor) in anchors.chunks_exact(2).enumerate() {
                let raw = view.cell(slot, cell.grid_y, cell.grid_x)?;
                if let Some(det) = decode_cell(
                    raw,
                    cell.grid_x,
                    cell.grid_y,
                    cell.stride,
                    (anchor[0], anchor[1]),
                    prob_threshold,
                ) {
                    out.push(det);
                }
            }
        }
        Ok(out)
    }

    fn group_anchors(&self, stride: u32) -> YoloPostResult<&[f32]> {
        let group = self.cfg.stride_group(stride)?;
        self.anchors.group(group)
    }
}

/// Decodes one stride with a throwaway [`Decoder`].
pub fn decode_stride(
    output: StrideOutput<'_>,
    prob_threshold: f32,
    letterbox: ImageSize,
    anchors: &AnchorSet,
    cfg: &DecodeConfig,
) -> YoloPostResult<Vec<Detection>> {
    Decoder::new(cfg.clone(), anchors.clone(), letterbox)?.decode_stride(output, prob_threshold)
}

/// Index and raw logit of the highest class score; ties keep the first index.
pub(crate) fn best_class(logits: &[f32]) -> (usize, f32) {
    let mut best_idx = 0usize;
    let mut best = f32::MIN;
    for (idx, &value) in logits.iter().enumerate() {
        if value > best {
            best_idx = idx;
            best = value;
        }
    }
    (best_idx, best)
}

fn decode_cell(
    cell: &[f32],
    col: usize,
    row: usize,
    stride: u32,
    anchor: (f32, f32),
    prob_threshold: f32,
) -> Option<Detection> {
    let (label, class_logit) = best_class(&cell[BOX_CHANNELS..]);
    let score = sigmoid(cell[CH_OBJ]) * sigmoid(class_logit);
    // NaN scores fall through here as well.
    if !(score >= prob_threshold) {
        return None;
    }

    let stride = stride as f32;
    let dx = sigmoid(cell[CH_DX]);
    let dy = sigmoid(cell[CH_DY]);
    let dw = sigmoid(cell[CH_DW]);
    let dh = sigmoid(cell[CH_DH]);
    let cx = (dx * 2.0 - 0.5 + col as f32) * stride;
    let cy = (dy * 2.0 - 0.5 + row as f32) * stride;
    let w = dw * dw * 4.0 * anchor.0;
    let h = dh * dh * 4.0 * anchor.1;

    Some(Detection::new(Rect::from_center(cx, cy, w, h), label, score))
}
