//! Individual postprocessing stages for callers assembling their own pipeline.
//!
//! Most users should prefer [`crate::Postprocessor`], which runs the stages in
//! order with a single configuration.

pub use crate::decode::tensor::{FeatureShape, FeatureView, BOX_CHANNELS};
pub use crate::decode::{decode_stride, Decoder};
pub use crate::geometry::{area, intersection_area, iou};
pub use crate::grid::{feature_size, generate_grids_and_stride, GridCell};
pub use crate::remap::{reverse_letterbox, select_and_remap, LetterboxTransform};
pub use crate::select::nms::{nms_sorted, nms_sorted_bboxes};
pub use crate::select::sort::{qsort_descent_inplace, sort_by_score_desc};
