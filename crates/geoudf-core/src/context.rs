//! The data context handed to user transformations.

use crate::tile::{FeatureCollectionTile, RasterCollectionTile};

/// Everything a transformation sees: the raster and feature tiles of a run
/// and the projection they share.
///
/// Tiles keep their insertion order. A transformation may add, replace or
/// remove tiles and may overwrite the projection; whatever the context holds
/// after execution is what gets written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UdfDataContext {
    pub projection: String,
    pub raster_tiles: Vec<RasterCollectionTile>,
    pub feature_tiles: Vec<FeatureCollectionTile>,
}

impl UdfDataContext {
    #[must_use]
    pub fn new(
        projection: impl Into<String>,
        raster_tiles: Vec<RasterCollectionTile>,
        feature_tiles: Vec<FeatureCollectionTile>,
    ) -> Self {
        Self {
            projection: projection.into(),
            raster_tiles,
            feature_tiles,
        }
    }

    /// `true` when the context holds no tiles at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raster_tiles.is_empty() && self.feature_tiles.is_empty()
    }

    #[must_use]
    pub fn raster_tile(&self, id: &str) -> Option<&RasterCollectionTile> {
        self.raster_tiles.iter().find(|t| t.id == id)
    }

    pub fn raster_tile_mut(&mut self, id: &str) -> Option<&mut RasterCollectionTile> {
        self.raster_tiles.iter_mut().find(|t| t.id == id)
    }

    #[must_use]
    pub fn feature_tile(&self, id: &str) -> Option<&FeatureCollectionTile> {
        self.feature_tiles.iter().find(|t| t.id == id)
    }

    pub fn feature_tile_mut(&mut self, id: &str) -> Option<&mut FeatureCollectionTile> {
        self.feature_tiles.iter_mut().find(|t| t.id == id)
    }

    /// Replaces the raster tile with the same id in place, or appends `tile`.
    ///
    /// Returns the replaced tile.
    pub fn put_raster_tile(
        &mut self,
        tile: RasterCollectionTile,
    ) -> Option<RasterCollectionTile> {
        match self.raster_tiles.iter_mut().find(|t| t.id == tile.id) {
            Some(slot) => Some(std::mem::replace(slot, tile)),
            None => {
                self.raster_tiles.push(tile);
                None
            },
        }
    }

    /// Replaces the feature tile with the same id in place, or appends `tile`.
    ///
    /// Returns the replaced tile.
    pub fn put_feature_tile(
        &mut self,
        tile: FeatureCollectionTile,
    ) -> Option<FeatureCollectionTile> {
        match self.feature_tiles.iter_mut().find(|t| t.id == tile.id) {
            Some(slot) => Some(std::mem::replace(slot, tile)),
            None => {
                self.feature_tiles.push(tile);
                None
            },
        }
    }

    pub fn remove_raster_tile(&mut self, id: &str) -> Option<RasterCollectionTile> {
        let index = self.raster_tiles.iter().position(|t| t.id == id)?;
        Some(self.raster_tiles.remove(index))
    }

    pub fn remove_feature_tile(&mut self, id: &str) -> Option<FeatureCollectionTile> {
        let index = self.feature_tiles.iter().position(|t| t.id == id)?;
        Some(self.feature_tiles.remove(index))
    }
}
