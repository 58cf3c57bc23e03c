//! Wrapping of vector sources as feature collection tiles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use geoudf_core_common::VectorFormat;
use log::{debug, info};

use crate::error::{IoError, IoErrorExt, Result};
use crate::tile::FeatureCollectionTile;

/// Reads vector sources into one [`FeatureCollectionTile`] each.
///
/// Sources are independent: no schema or geometry checks span them.
#[derive(Clone)]
pub struct VectorTileBuilder {
    format: Arc<dyn VectorFormat>,
}

impl VectorTileBuilder {
    #[must_use]
    pub fn new(format: Arc<dyn VectorFormat>) -> Self {
        Self { format }
    }

    /// Reads every source in order. Tile ids are the file names without their
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Read`] if a source cannot be read, and
    /// [`IoError::InvalidPath`] if a path has no file name.
    pub fn build(&self, sources: &[PathBuf]) -> Result<Vec<FeatureCollectionTile>> {
        if !sources.is_empty() {
            info!("Building {} feature tile(s)", sources.len());
        }

        sources
            .iter()
            .map(|path| -> Result<FeatureCollectionTile> {
                let id = tile_id(path)?;
                let batch = self
                    .format
                    .read(path)
                    .with_read_context(self.format.name(), path)?;
                debug!(
                    "Read {} feature(s) from {} as '{id}'",
                    batch.num_rows(),
                    path.display()
                );
                Ok(FeatureCollectionTile::new(id, batch))
            })
            .collect()
    }
}

fn tile_id(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| {
            IoError::InvalidPath {
                path: path.to_path_buf(),
                reason: "path has no file name".to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use arrow_array::{Int64Array, RecordBatch};
    use arrow_schema::{DataType, Field, Schema};

    use super::*;
    use crate::error::UdfError;

    struct FixedFormat;

    impl VectorFormat for FixedFormat {
        fn name(&self) -> &'static str {
            "Fixed"
        }

        fn extension(&self) -> &'static str {
            "fixed"
        }

        fn read(&self, path: &Path) -> anyhow::Result<RecordBatch> {
            if path.to_string_lossy().contains("broken") {
                anyhow::bail!("unparseable");
            }
            let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
            Ok(RecordBatch::try_new(
                schema,
                vec![Arc::new(Int64Array::from(vec![1, 2]))],
            )?)
        }

        fn write(&self, _path: &Path, _table: &RecordBatch) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tile_ids_from_file_stems() {
        let builder = VectorTileBuilder::new(Arc::new(FixedFormat));
        let tiles = builder
            .build(&[
                PathBuf::from("/data/roads.geojson"),
                PathBuf::from("fields.v2.geojson"),
            ])
            .unwrap();

        let ids: Vec<_> = tiles.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["roads", "fields.v2"]);
        assert_eq!(tiles[0].len(), 2);
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let builder = VectorTileBuilder::new(Arc::new(FixedFormat));
        let err = builder
            .build(&[PathBuf::from("ok.fixed"), PathBuf::from("broken.fixed")])
            .unwrap_err();
        assert!(matches!(err, UdfError::Io(IoError::Read { .. })));
    }

    #[test]
    fn test_path_without_file_name() {
        let builder = VectorTileBuilder::new(Arc::new(FixedFormat));
        let err = builder.build(&[PathBuf::from("/")]).unwrap_err();
        assert!(matches!(err, UdfError::Io(IoError::InvalidPath { .. })));
    }
}
