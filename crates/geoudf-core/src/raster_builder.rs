//! Stacking of single-time raster sources into multi-temporal band tiles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use geoudf_core_common::{CubeArray, RasterDataset, RasterFormat};
use log::{debug, info};

use crate::error::{ConfigError, GeometryMismatchError, IoErrorExt, Result, ValidationError};
use crate::extent::SpatialExtent;
use crate::tile::RasterCollectionTile;

/// Output of [`RasterTileBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct RasterTiles {
    /// One tile per declared band name, in declaration order
    pub tiles: Vec<RasterCollectionTile>,
    /// Projection shared by every source, empty when there are no sources
    pub projection: String,
}

/// Builds one [`RasterCollectionTile`] per band from a sequence of raster
/// sources that share one band layout.
///
/// Every source contributes one slice to every tile, in input order. Sources
/// must agree on band count, sample type, extent, size and projection; the
/// first source is the reference for all of them.
#[derive(Clone)]
pub struct RasterTileBuilder {
    format: Arc<dyn RasterFormat>,
}

struct OpenSource<'a> {
    path: &'a Path,
    dataset: Box<dyn RasterDataset>,
}

impl RasterTileBuilder {
    #[must_use]
    pub fn new(format: Arc<dyn RasterFormat>) -> Self {
        Self { format }
    }

    /// Reads `sources` and stacks band `b` of every source into the tile
    /// named `band_names[b]`.
    ///
    /// Zero sources with zero band names yields zero tiles.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::BandNameMismatch`] when the number of band names differs
    ///   from the band count of the sources
    /// - [`ValidationError`] when sources disagree on band count or sample type
    /// - [`GeometryMismatchError`] when a source's extent, size or projection
    ///   differs from the first source
    /// - [`IoError::Read`](crate::error::IoError::Read) when a source cannot be
    ///   opened or decoded
    pub fn build(&self, sources: &[PathBuf], band_names: &[String]) -> Result<RasterTiles> {
        if sources.is_empty() {
            if !band_names.is_empty() {
                return Err(ConfigError::BandNameMismatch {
                    declared: band_names.len(),
                    detected: 0,
                }
                .into());
            }
            return Ok(RasterTiles::default());
        }

        info!(
            "Building {} raster tile(s) from {} source(s)",
            band_names.len(),
            sources.len()
        );

        let mut opened = self.open_all(sources)?;
        validate_layout(&opened, band_names)?;
        let (extent, size, projection) = validate_geometry(&opened)?;

        let (rows, cols) = size;
        let sample_type = opened[0].dataset.sample_type();
        let format_name = self.format.name();

        let mut tiles = Vec::with_capacity(band_names.len());
        for (band_index, band_name) in band_names.iter().enumerate() {
            let mut data = CubeArray::zeros(sample_type, (opened.len(), rows, cols));
            for (slice, source) in opened.iter_mut().enumerate() {
                let band = source
                    .dataset
                    .read_band(band_index)
                    .with_read_context(format_name, source.path)?;
                data.assign_slice(slice, &band)
                    .with_read_context(format_name, source.path)?;
            }
            debug!("Stacked band '{band_name}' into {} slice(s)", opened.len());
            tiles.push(RasterCollectionTile::new(band_name.clone(), data, extent));
        }

        Ok(RasterTiles { tiles, projection })
    }

    fn open_all<'a>(&self, sources: &'a [PathBuf]) -> Result<Vec<OpenSource<'a>>> {
        sources
            .iter()
            .map(|path| -> Result<OpenSource<'a>> {
                let dataset = self
                    .format
                    .open(path)
                    .with_read_context(self.format.name(), path)?;
                debug!(
                    "Opened {}: {} band(s) of {}, {:?}",
                    path.display(),
                    dataset.band_count(),
                    dataset.sample_type(),
                    dataset.size()
                );
                Ok(OpenSource { path, dataset })
            })
            .collect()
    }
}

fn validate_layout(sources: &[OpenSource<'_>], band_names: &[String]) -> Result<()> {
    let counts: Vec<usize> = sources.iter().map(|s| s.dataset.band_count()).collect();
    if counts.iter().any(|&c| c != counts[0]) {
        return Err(ValidationError::BandCountMismatch { counts }.into());
    }
    if counts[0] != band_names.len() {
        return Err(ConfigError::BandNameMismatch {
            declared: band_names.len(),
            detected: counts[0],
        }
        .into());
    }

    let types: Vec<_> = sources.iter().map(|s| s.dataset.sample_type()).collect();
    if types.iter().any(|&t| t != types[0]) {
        return Err(ValidationError::SampleTypeMismatch { types }.into());
    }

    Ok(())
}

fn validate_geometry(
    sources: &[OpenSource<'_>],
) -> Result<(SpatialExtent, (usize, usize), String)> {
    let first = &sources[0].dataset;
    let size = first.size();
    let extent = SpatialExtent::from_geo_transform(&first.geo_transform(), size.0, size.1);
    let projection = first.projection().to_string();

    for source in &sources[1..] {
        let found_size = source.dataset.size();
        let found_extent = SpatialExtent::from_geo_transform(
            &source.dataset.geo_transform(),
            found_size.0,
            found_size.1,
        );

        if found_extent != extent {
            return Err(GeometryMismatchError::Extent {
                path: source.path.to_path_buf(),
                expected: Box::new(extent),
                found: Box::new(found_extent),
            }
            .into());
        }
        if found_size != size {
            return Err(GeometryMismatchError::Dimensions {
                path: source.path.to_path_buf(),
                expected: size,
                found: found_size,
            }
            .into());
        }
        if source.dataset.projection() != projection {
            return Err(GeometryMismatchError::Projection {
                path: source.path.to_path_buf(),
                expected: projection,
                found: source.dataset.projection().to_string(),
            }
            .into());
        }
    }

    Ok((extent, size, projection))
}
