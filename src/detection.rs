//! Detection records produced by the decoder and refined by later stages.

use crate::geometry::Rect;
use std::fmt;

/// One detected object.
///
/// The rectangle is in letterbox space after decoding and in source image
/// pixels after remapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Bounding box.
    pub rect: Rect,
    /// Zero-based class index.
    pub label: usize,
    /// Confidence in `[0, 1]`.
    pub score: f32,
}

impl Detection {
    /// Creates a detection.
    pub fn new(rect: Rect, label: usize, score: f32) -> Self {
        Self { rect, label, score }
    }
}

/// Formats as `label: pct%, [x0, y0, x1, y1]`.
impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x0, y0, x1, y1) = self.rect.corners();
        write!(
            f,
            "{:2}: {:3.0}%, [{:4.0}, {:4.0}, {:4.0}, {:4.0}]",
            self.label,
            self.score * 100.0,
            x0,
            y0,
            x1,
            y1
        )
    }
}
