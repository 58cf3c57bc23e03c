//! Affine georeferencing transform.

use serde::{Deserialize, Serialize};

/// The six affine coefficients mapping pixel/line to projection coordinates.
///
/// Coefficients follow the GDAL ordering:
///
/// ```text
/// x = c[0] + col * c[1] + row * c[2]
/// y = c[3] + col * c[4] + row * c[5]
/// ```
///
/// For a north-up image `c[2]` and `c[4]` are zero and `c[5]` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// Transform used for sources that carry no georeferencing.
    pub const IDENTITY: Self = Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// Returns the x coordinate of the upper-left corner.
    #[must_use]
    pub fn origin_x(&self) -> f64 {
        self.0[0]
    }

    /// Returns the y coordinate of the upper-left corner.
    #[must_use]
    pub fn origin_y(&self) -> f64 {
        self.0[3]
    }

    /// Returns the signed pixel width.
    #[must_use]
    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    /// Returns the signed pixel height (negative for north-up images).
    #[must_use]
    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }

    /// Returns `true` when the transform has rotation or shear terms.
    #[must_use]
    pub fn is_rotated(&self) -> bool {
        self.0[2] != 0.0 || self.0[4] != 0.0
    }

    /// Applies the transform to a pixel/line position.
    #[must_use]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let c = &self.0;
        (
            c[0] + col * c[1] + row * c[2],
            c[3] + col * c[4] + row * c[5],
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f64; 6]> for GeoTransform {
    fn from(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }
}
