//! Source-image metadata via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Only the header is read;
//! pixel data is never decoded.

use crate::geometry::ImageSize;
use crate::util::{YoloPostError, YoloPostResult};
use std::path::Path;

/// Reads the pixel size of the image at `path` as rows x cols.
pub fn source_size_from_image<P: AsRef<Path>>(path: P) -> YoloPostResult<ImageSize> {
    let (width, height) =
        image::image_dimensions(path).map_err(|err| YoloPostError::ImageIo {
            reason: err.to_string(),
        })?;
    Ok(ImageSize::new(height as usize, width as usize))
}
