//! Tiles held by the UDF data context.

use arrow_array::RecordBatch;
use geoudf_core_common::{CubeArray, SampleType};

use crate::extent::SpatialExtent;

/// One band of a multi-temporal raster stack.
///
/// `data` is indexed `[slice][row][column]`; slice `i` comes from the `i`-th
/// raster source of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterCollectionTile {
    /// Tile identifier, normally the band name
    pub id: String,
    pub data: CubeArray,
    pub extent: SpatialExtent,
}

impl RasterCollectionTile {
    #[must_use]
    pub fn new(id: impl Into<String>, data: CubeArray, extent: SpatialExtent) -> Self {
        Self {
            id: id.into(),
            data,
            extent,
        }
    }

    /// Number of time slices.
    #[must_use]
    pub fn slice_count(&self) -> usize {
        self.data.slice_count()
    }

    /// `(rows, columns)` of every slice.
    #[must_use]
    pub fn size(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (rows, cols)
    }

    #[must_use]
    pub fn sample_type(&self) -> SampleType {
        self.data.sample_type()
    }
}

/// Attribute table and geometries of one vector source.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollectionTile {
    /// Tile identifier, normally the source file name without extension
    pub id: String,
    /// Attribute table including the WKT geometry column
    pub data: RecordBatch,
}

impl FeatureCollectionTile {
    #[must_use]
    pub fn new(id: impl Into<String>, data: RecordBatch) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.num_rows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.num_rows() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::Int64Array;
    use arrow_schema::{DataType, Field, Schema};
    use geoudf_core_common::GeoTransform;

    use super::*;

    #[test]
    fn test_raster_tile_shape() {
        let extent = SpatialExtent::from_geo_transform(&GeoTransform::IDENTITY, 4, 5);
        let data = CubeArray::zeros(SampleType::UInt16, (3, 4, 5));
        let tile = RasterCollectionTile::new("RED", data, extent);

        assert_eq!(tile.slice_count(), 3);
        assert_eq!(tile.size(), (4, 5));
        assert_eq!(tile.sample_type(), SampleType::UInt16);
    }

    #[test]
    fn test_feature_tile_len() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1, 2, 3]))]).unwrap();
        let tile = FeatureCollectionTile::new("roads", batch);

        assert_eq!(tile.len(), 3);
        assert!(!tile.is_empty());
    }
}
