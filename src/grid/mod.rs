//! Feature-pyramid grid enumeration and anchor priors.
//!
//! A `GridCell` names one spatial position of one feature map. The decoder
//! derives cells on the fly from the stride and letterbox size, so explicit
//! enumeration is only needed when a caller wants the grid metadata itself or
//! wants to decode a chosen subset of cells.

pub mod anchor;

use crate::util::{YoloPostError, YoloPostResult};

/// One grid position on the feature map for `stride`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCell {
    /// Column index.
    pub grid_x: usize,
    /// Row index.
    pub grid_y: usize,
    /// Downsampling factor of the feature map.
    pub stride: u32,
}

/// Feature-map size for `stride` over a `cols` x `rows` letterbox canvas.
///
/// Returns `(feat_w, feat_h)` using integer division.
pub fn feature_size(cols: usize, rows: usize, stride: u32) -> YoloPostResult<(usize, usize)> {
    if stride == 0 {
        return Err(YoloPostError::InvalidConfig {
            reason: "stride must be positive",
        });
    }
    let stride = stride as usize;
    let feat_w = cols / stride;
    let feat_h = rows / stride;
    if feat_w == 0 || feat_h == 0 {
        return Err(YoloPostError::InvalidDimensions {
            width: feat_w,
            height: feat_h,
        });
    }
    Ok((feat_w, feat_h))
}

/// Enumerates every grid cell for each stride.
///
/// Cells are ordered stride-major, then by row, then by column.
pub fn generate_grids_and_stride(
    target_w: usize,
    target_h: usize,
    strides: &[u32],
) -> YoloPostResult<Vec<GridCell>> {
    let mut sizes = Vec::with_capacity(strides.len());
    for &stride in strides {
        sizes.push((stride, feature_size(target_w, target_h, stride)?));
    }

    let total = sizes.iter().map(|(_, (w, h))| w * h).sum();
    let mut cells = Vec::with_capacity(total);
    for (stride, (feat_w, feat_h)) in sizes {
        for grid_y in 0..feat_h {
            for grid_x in 0..feat_w {
                cells.push(GridCell {
                    grid_x,
                    grid_y,
                    stride,
                });
            }
        }
    }
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::{feature_size, generate_grids_and_stride, GridCell};
    use crate::util::YoloPostError;

    #[test]
    fn enumerates_rows_then_columns_per_stride() {
        let cells = generate_grids_and_stride(64, 32, &[16, 32]).unwrap();
        assert_eq!(cells.len(), 4 * 2 + 2 * 1);
        assert_eq!(
            cells[1],
            GridCell {
                grid_x: 1,
                grid_y: 0,
                stride: 16
            }
        );
        assert_eq!(
            cells[4],
            GridCell {
                grid_x: 0,
                grid_y: 1,
                stride: 16
            }
        );
        assert_eq!(cells[8].stride, 32);
        assert_eq!((cells[9].grid_x, cells[9].grid_y), (1, 0));
    }

    #[test]
    fn feature_size_rejects_stride_larger_than_canvas() {
        let err = feature_size(16, 16, 32).unwrap_err();
        assert_eq!(
            err,
            YoloPostError::InvalidDimensions {
                width: 0,
                height: 0
            }
        );
    }

    #[test]
    fn empty_stride_list_yields_no_cells() {
        assert!(generate_grids_and_stride(640, 640, &[]).unwrap().is_empty());
    }
}
