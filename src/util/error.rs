//! Error types for yolopost.

use thiserror::Error;

/// Result alias for yolopost operations.
pub type YoloPostResult<T> = std::result::Result<T, YoloPostError>;

/// Errors that can occur when decoding and postprocessing detections.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum YoloPostError {
    /// A width or height is zero where a positive size is required.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The feature buffer for a stride does not have the expected length.
    #[error("feature buffer for stride {stride} has {got} values, expected {expected}")]
    BufferSizeMismatch {
        stride: u32,
        expected: usize,
        got: usize,
    },
    /// The stride is not part of the configured stride set.
    #[error("stride {stride} is not in the configured stride set")]
    UnknownStride { stride: u32 },
    /// The anchor table has no entries for the requested stride group.
    #[error("anchor group {group} is missing (table has {groups} groups)")]
    MissingAnchorGroup { group: usize, groups: usize },
    /// An index is outside the valid range.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// A configuration value is invalid.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Reading image metadata failed.
    #[cfg(feature = "image-io")]
    #[error("image io: {reason}")]
    ImageIo { reason: String },
}
