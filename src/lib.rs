//! yolopost turns raw YOLOv5-style detection head output into final boxes.
//!
//! The pipeline decodes each stride's `[anchor][row][col][channel]` tensor
//! into candidates, sorts them by confidence, applies greedy IoU
//! non-maximum suppression and maps the survivors from the letterbox canvas
//! back to source image pixels. Stride decoding and the confidence sort can
//! run in parallel with the `rayon` feature.

pub mod decode;
pub mod detection;
pub mod geometry;
pub mod grid;
#[cfg(feature = "image-io")]
pub mod io;
pub mod lowlevel;
pub mod pipeline;
pub mod remap;
pub mod select;
mod trace;
pub mod util;

pub use decode::{DecodeConfig, Decoder, StrideOutput};
pub use detection::Detection;
pub use geometry::{ImageSize, Rect};
pub use grid::anchor::{AnchorSet, YOLOV5_ANCHORS};
pub use grid::GridCell;
pub use pipeline::{PostprocessConfig, Postprocessor};
pub use select::sort::SortStrategy;
pub use util::{YoloPostError, YoloPostResult};
