//! Anchor-box priors grouped by stride.

use crate::util::{YoloPostError, YoloPostResult};

/// YOLOv5 COCO anchors for strides 8, 16 and 32, as `(w, h)` pairs.
pub const YOLOV5_ANCHORS: [f32; 18] = [
    10.0, 13.0, 16.0, 30.0, 33.0, 23.0, //
    30.0, 61.0, 62.0, 45.0, 59.0, 119.0, //
    116.0, 90.0, 156.0, 198.0, 373.0, 326.0,
];

/// Anchor priors indexed by stride group and anchor slot.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorSet {
    anchors_per_group: usize,
    data: Vec<f32>,
}

impl AnchorSet {
    /// Builds a table from a flat `[group][anchor][w, h]` array.
    pub fn from_flat(data: &[f32], anchors_per_group: usize) -> YoloPostResult<Self> {
        if anchors_per_group == 0 {
            return Err(YoloPostError::InvalidConfig {
                reason: "anchors_per_group must be positive",
            });
        }
        let group_len = anchors_per_group * 2;
        if data.is_empty() || data.len() % group_len != 0 {
            return Err(YoloPostError::InvalidConfig {
                reason: "anchor table length must be a positive multiple of 2 * anchors_per_group",
            });
        }
        if data.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(YoloPostError::InvalidConfig {
                reason: "anchor sizes must be finite and non-negative",
            });
        }
        Ok(Self {
            anchors_per_group,
            data: data.to_vec(),
        })
    }

    /// The default YOLOv5 table with three anchors per group.
    pub fn yolov5() -> Self {
        Self {
            anchors_per_group: 3,
            data: YOLOV5_ANCHORS.to_vec(),
        }
    }

    /// Number of stride groups.
    pub fn num_groups(&self) -> usize {
        self.data.len() / (self.anchors_per_group * 2)
    }

    /// Number of anchors per group.
    pub fn anchors_per_group(&self) -> usize {
        self.anchors_per_group
    }

    /// The `(w, h)` pairs of one stride group.
    pub fn group(&self, group: usize) -> YoloPostResult<&[f32]> {
        let len = self.anchors_per_group * 2;
        let start = group * len;
        self.data
            .get(start..start + len)
            .ok_or(YoloPostError::MissingAnchorGroup {
                group,
                groups: self.num_groups(),
            })
    }

    /// The `(w, h)` prior for `slot` within `group`.
    pub fn anchor(&self, group: usize, slot: usize) -> YoloPostResult<(f32, f32)> {
        if slot >= self.anchors_per_group {
            return Err(YoloPostError::IndexOutOfBounds {
                index: slot,
                len: self.anchors_per_group,
                context: "anchor slot",
            });
        }
        let pairs = self.group(group)?;
        Ok((pairs[slot * 2], pairs[slot * 2 + 1]))
    }

    /// Flat view of the table.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl Default for AnchorSet {
    fn default() -> Self {
        Self::yolov5()
    }
}
