//! Axis-aligned rectangle geometry used by suppression and remapping.

/// Axis-aligned rectangle stored as top-left corner plus size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from two corners, `(x0, y0)` top-left and
    /// `(x1, y1)` bottom-right.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Creates a rectangle centered on `(cx, cy)`.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        let x0 = cx - width * 0.5;
        let y0 = cy - height * 0.5;
        let x1 = cx + width * 0.5;
        let y1 = cy + height * 0.5;
        Self::from_corners(x0, y0, x1, y1)
    }

    /// Right edge (`x + width`).
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Returns `(x0, y0, x1, y1)`.
    pub fn corners(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.right(), self.bottom())
    }
}

/// Image or canvas size in pixels, stored as rows x cols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSize {
    /// Height in pixels.
    pub rows: usize,
    /// Width in pixels.
    pub cols: usize,
}

impl ImageSize {
    /// Creates a size from `rows` (height) and `cols` (width).
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// True when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

/// Area of `rect`; negative extents count as zero.
pub fn area(rect: &Rect) -> f32 {
    rect.width.max(0.0) * rect.height.max(0.0)
}

/// Area of the overlap between `a` and `b`, or 0 when they are disjoint.
pub fn intersection_area(a: &Rect, b: &Rect) -> f32 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = a.right().min(b.right());
    let y1 = a.bottom().min(b.bottom());
    let w = x1 - x0;
    let h = y1 - y0;
    if w <= 0.0 || h <= 0.0 {
        return 0.0;
    }
    w * h
}

/// Intersection over union of `a` and `b`.
///
/// Returns 0 when the union is not positive, so zero-area boxes never
/// produce NaN. The result is capped at 1 to absorb corner rounding.
pub fn iou(a: &Rect, b: &Rect) -> f32 {
    iou_with_areas(a, area(a), b, area(b))
}

/// IoU with caller-provided areas, used when areas are cached.
pub(crate) fn iou_with_areas(a: &Rect, area_a: f32, b: &Rect, area_b: f32) -> f32 {
    let inter = intersection_area(a, b);
    let union = area_a + area_b - inter;
    if !(union > 0.0) {
        return 0.0;
    }
    (inter / union).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::{area, intersection_area, iou, Rect};

    #[test]
    fn intersection_of_disjoint_is_zero() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 0.0, 5.0, 5.0);
        assert_eq!(intersection_area(&a, &b), 0.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(intersection_area(&a, &b), 0.0);
    }

    #[test]
    fn half_overlap_matches_hand_computation() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 0.0, 10.0, 10.0);
        assert_eq!(intersection_area(&a, &b), 50.0);
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn zero_area_boxes_yield_zero_iou() {
        let a = Rect::new(3.0, 3.0, 0.0, 0.0);
        assert_eq!(area(&a), 0.0);
        assert_eq!(iou(&a, &a), 0.0);
    }

    #[test]
    fn from_center_round_trips_corners() {
        let r = Rect::from_center(50.0, 40.0, 20.0, 10.0);
        assert_eq!(r.corners(), (40.0, 35.0, 60.0, 45.0));
    }
}
