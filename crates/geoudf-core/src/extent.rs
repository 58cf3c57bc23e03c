//! Spatial extent of a raster grid.

use std::fmt;

use geo_types::{LineString, Polygon};
use geoudf_core_common::GeoTransform;
use serde::{Deserialize, Serialize};

/// Bounding box of a raster grid in projection coordinates, plus its pixel
/// resolution.
///
/// `width` and `height` are resolution magnitudes; the orientation of each
/// axis is carried by the corners, so that
/// [`to_geo_transform`](Self::to_geo_transform) can recover signed pixel sizes.
///
/// Two extents are equal when their corner polygons are equal. Resolution does
/// not take part in the comparison; grids of the same footprint but different
/// size are caught by comparing dimensions separately.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
    /// Pixel width (resolution along x)
    pub width: f64,
    /// Pixel height (resolution along y)
    pub height: f64,
}

impl SpatialExtent {
    /// Builds the extent of a `rows` x `cols` grid georeferenced by
    /// `geo_transform`.
    ///
    /// Rotation terms are ignored.
    #[must_use]
    pub fn from_geo_transform(geo_transform: &GeoTransform, rows: usize, cols: usize) -> Self {
        let left = geo_transform.origin_x();
        let top = geo_transform.origin_y();
        let right = left + cols as f64 * geo_transform.pixel_width();
        let bottom = top + rows as f64 * geo_transform.pixel_height();

        Self {
            top,
            bottom,
            left,
            right,
            width: geo_transform.pixel_width().abs(),
            height: geo_transform.pixel_height().abs(),
        }
    }

    /// Geotransform whose origin is the top-left corner, with pixel sizes
    /// signed by the direction from the first corner to the opposite one.
    #[must_use]
    pub fn to_geo_transform(&self) -> GeoTransform {
        GeoTransform([
            self.left,
            self.width * direction(self.left, self.right),
            0.0,
            self.top,
            0.0,
            self.height * direction(self.top, self.bottom),
        ])
    }

    /// Closed ring through the four corners, clockwise from top-left.
    #[must_use]
    pub fn polygon(&self) -> Polygon<f64> {
        let exterior = LineString::from(vec![
            (self.left, self.top),
            (self.right, self.top),
            (self.right, self.bottom),
            (self.left, self.bottom),
            (self.left, self.top),
        ]);
        Polygon::new(exterior, vec![])
    }
}

fn direction(from: f64, to: f64) -> f64 {
    if to < from { -1.0 } else { 1.0 }
}

impl PartialEq for SpatialExtent {
    fn eq(&self, other: &Self) -> bool {
        self.polygon() == other.polygon()
    }
}

impl fmt::Display for SpatialExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[left {}, top {}, right {}, bottom {}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}
