//! Bounds-checked view over one stride's raw output tensor.
//!
//! The buffer layout is `[anchor][row][col][channel]`, row-major, with
//! `channel = [dx, dy, dw, dh, objectness, class_0 .. class_{C-1}]`. The view
//! checks the exact length once at construction; cell lookups then only need
//! an index check.

use crate::util::{YoloPostError, YoloPostResult};

/// Channel offset of the box delta `dx`.
pub const CH_DX: usize = 0;
/// Channel offset of the box delta `dy`.
pub const CH_DY: usize = 1;
/// Channel offset of the box delta `dw`.
pub const CH_DW: usize = 2;
/// Channel offset of the box delta `dh`.
pub const CH_DH: usize = 3;
/// Channel offset of the objectness logit.
pub const CH_OBJ: usize = 4;
/// Number of leading non-class channels.
pub const BOX_CHANNELS: usize = 5;

/// Shape metadata for one stride's output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureShape {
    /// Downsampling factor this tensor belongs to.
    pub stride: u32,
    /// Anchor slots per cell.
    pub anchors: usize,
    /// Feature-map rows.
    pub rows: usize,
    /// Feature-map columns.
    pub cols: usize,
    /// Values per cell, `5 + num_classes`.
    pub channels: usize,
}

impl FeatureShape {
    /// Total number of values the buffer must hold.
    pub fn value_count(&self) -> Option<usize> {
        self.anchors
            .checked_mul(self.rows)?
            .checked_mul(self.cols)?
            .checked_mul(self.channels)
    }

    /// Number of class channels.
    pub fn num_classes(&self) -> usize {
        self.channels - BOX_CHANNELS
    }
}

/// Borrowed, validated view of a raw feature buffer.
#[derive(Clone, Copy, Debug)]
pub struct FeatureView<'a> {
    data: &'a [f32],
    shape: FeatureShape,
}

impl<'a> FeatureView<'a> {
    /// Wraps `data`, requiring its length to match `shape` exactly.
    pub fn new(data: &'a [f32], shape: FeatureShape) -> YoloPostResult<Self> {
        if shape.rows == 0 || shape.cols == 0 {
            return Err(YoloPostError::InvalidDimensions {
                width: shape.cols,
                height: shape.rows,
            });
        }
        if shape.anchors == 0 || shape.channels <= BOX_CHANNELS {
            return Err(YoloPostError::InvalidConfig {
                reason: "feature shape needs at least one anchor and one class",
            });
        }
        let expected = shape.value_count().ok_or(YoloPostError::InvalidDimensions {
            width: shape.cols,
            height: shape.rows,
        })?;
        if data.len() != expected {
            return Err(YoloPostError::BufferSizeMismatch {
                stride: shape.stride,
                expected,
                got: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    /// Shape of the view.
    pub fn shape(&self) -> FeatureShape {
        self.shape
    }

    /// The backing buffer.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// All channels of cell `(row, col)` for anchor slot `anchor`.
    pub fn cell(&self, anchor: usize, row: usize, col: usize) -> YoloPostResult<&'a [f32]> {
        let s = &self.shape;
        if anchor >= s.anchors {
            return Err(YoloPostError::IndexOutOfBounds {
                index: anchor,
                len: s.anchors,
                context: "anchor",
            });
        }
        if row >= s.rows {
            return Err(YoloPostError::IndexOutOfBounds {
                index: row,
                len: s.rows,
                context: "row",
            });
        }
        if col >= s.cols {
            return Err(YoloPostError::IndexOutOfBounds {
                index: col,
                len: s.cols,
                context: "col",
            });
        }
        let start = ((anchor * s.rows + row) * s.cols + col) * s.channels;
        Ok(&self.data[start..start + s.channels])
    }
}
