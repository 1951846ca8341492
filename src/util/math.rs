//! Scalar activation helpers.

/// Logistic sigmoid evaluated in single precision.
#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
