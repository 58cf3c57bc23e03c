//! Transformations run by an external interpreter.
//!
//! The context crosses the process boundary through an exchange directory:
//!
//! ```text
//! <exchange-dir>/
//!     context.json        manifest, see below
//!     raster_0.tif        one file per raster tile, one band per slice
//!     vector_0.geojson    one file per feature tile
//!     udf                 the transformation source
//! ```
//!
//! The manifest lists every tile and the file holding it:
//!
//! ```json
//! {
//!   "projection": "EPSG:32633",
//!   "raster_tiles": [{"id": "RED", "file": "raster_0.tif", "extent": {"top": 10.0, "...": 0}}],
//!   "feature_tiles": [{"id": "roads", "file": "vector_0.geojson"}]
//! }
//! ```
//!
//! The interpreter is invoked as `<interpreter...> <exchange-dir>/udf
//! <exchange-dir>` with `GEOUDF_CONTEXT_DIR` set to the exchange directory.
//! After a zero exit status the manifest is read back and becomes the new
//! context, so a transformation edits the files, the manifest, or both. File
//! names in the manifest are resolved against the exchange directory. A raster
//! entry without an `extent` takes it from the file's georeferencing.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Instant;

use geoudf_core_common::{BandArray, CubeArray, RasterFormat, RasterWrite, VectorFormat};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::context::UdfDataContext;
use crate::error::{ExecutionError, IoErrorExt, Result};
use crate::executor::UdfTransform;
use crate::extent::SpatialExtent;
use crate::tile::{FeatureCollectionTile, RasterCollectionTile};

/// File name of the manifest inside the exchange directory.
pub const MANIFEST_FILE: &str = "context.json";

/// Environment variable holding the exchange directory.
pub const CONTEXT_DIR_ENV: &str = "GEOUDF_CONTEXT_DIR";

const SCRIPT_FILE: &str = "udf";

/// Serialized form of a [`UdfDataContext`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextManifest {
    #[serde(default)]
    pub projection: String,
    #[serde(default)]
    pub raster_tiles: Vec<RasterEntry>,
    #[serde(default)]
    pub feature_tiles: Vec<FeatureEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterEntry {
    pub id: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<SpatialExtent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEntry {
    pub id: String,
    pub file: String,
}

/// Codecs used to move tiles in and out of the exchange directory.
#[derive(Clone)]
pub struct ExchangeFormats {
    pub raster: Arc<dyn RasterFormat>,
    pub vector: Arc<dyn VectorFormat>,
}

impl ExchangeFormats {
    #[must_use]
    pub fn new(raster: Arc<dyn RasterFormat>, vector: Arc<dyn VectorFormat>) -> Self {
        Self { raster, vector }
    }
}

/// GeoTIFF for rasters, GeoJSON for feature tables.
impl Default for ExchangeFormats {
    fn default() -> Self {
        Self::new(
            Arc::new(geoudf_geotiff::GeoTiffFormat::new()),
            Arc::new(geoudf_geojson::GeoJsonFormat::new()),
        )
    }
}

fn exchange_error(
    message: impl Into<String>,
    source: impl Into<crate::error::BoxError>,
) -> ExecutionError {
    ExecutionError::Exchange {
        message: message.into(),
        source: Some(source.into()),
    }
}

/// Writes `context` into `dir` and returns the manifest that was written.
///
/// # Errors
///
/// Returns [`ExecutionError::Exchange`] if a tile or the manifest cannot be
/// written.
pub fn export_context(
    context: &UdfDataContext,
    dir: &Path,
    formats: &ExchangeFormats,
) -> std::result::Result<ContextManifest, ExecutionError> {
    let mut manifest = ContextManifest {
        projection: context.projection.clone(),
        ..ContextManifest::default()
    };

    for (index, tile) in context.raster_tiles.iter().enumerate() {
        let file = format!("raster_{index}.{}", formats.raster.extension());
        let bands: Vec<BandArray> = (0..tile.slice_count())
            .filter_map(|slice| tile.data.slice(slice))
            .collect();
        formats
            .raster
            .write(
                &dir.join(&file),
                &RasterWrite {
                    bands: &bands,
                    geo_transform: tile.extent.to_geo_transform(),
                    projection: &context.projection,
                },
            )
            .map_err(|e| exchange_error(format!("cannot export raster tile '{}'", tile.id), e))?;
        manifest.raster_tiles.push(RasterEntry {
            id: tile.id.clone(),
            file,
            extent: Some(tile.extent),
        });
    }

    for (index, tile) in context.feature_tiles.iter().enumerate() {
        let file = format!("vector_{index}.{}", formats.vector.extension());
        formats
            .vector
            .write(&dir.join(&file), &tile.data)
            .map_err(|e| exchange_error(format!("cannot export feature tile '{}'", tile.id), e))?;
        manifest.feature_tiles.push(FeatureEntry {
            id: tile.id.clone(),
            file,
        });
    }

    let json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| exchange_error("cannot serialize manifest", e))?;
    fs::write(dir.join(MANIFEST_FILE), json)
        .map_err(|e| exchange_error("cannot write manifest", e))?;

    debug!(
        "Exported {} raster and {} feature tile(s) to {}",
        manifest.raster_tiles.len(),
        manifest.feature_tiles.len(),
        dir.display()
    );
    Ok(manifest)
}

/// Reads the manifest in `dir` and every file it references.
///
/// # Errors
///
/// Returns [`ExecutionError::Exchange`] if the manifest is missing or invalid,
/// or if a referenced file cannot be read.
pub fn import_context(
    dir: &Path,
    formats: &ExchangeFormats,
) -> std::result::Result<UdfDataContext, ExecutionError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let bytes = fs::read(&manifest_path)
        .map_err(|e| exchange_error(format!("cannot read {}", manifest_path.display()), e))?;
    let manifest: ContextManifest = serde_json::from_slice(&bytes)
        .map_err(|e| exchange_error(format!("invalid {MANIFEST_FILE}"), e))?;

    let mut context = UdfDataContext::new(manifest.projection, Vec::new(), Vec::new());

    for entry in manifest.raster_tiles {
        let path = dir.join(&entry.file);
        let tile = read_raster_tile(&path, entry, formats.raster.as_ref())?;
        context.raster_tiles.push(tile);
    }

    for entry in manifest.feature_tiles {
        let path = dir.join(&entry.file);
        let data = formats
            .vector
            .read(&path)
            .map_err(|e| exchange_error(format!("cannot import feature tile '{}'", entry.id), e))?;
        context
            .feature_tiles
            .push(FeatureCollectionTile::new(entry.id, data));
    }

    Ok(context)
}

fn read_raster_tile(
    path: &Path,
    entry: RasterEntry,
    format: &dyn RasterFormat,
) -> std::result::Result<RasterCollectionTile, ExecutionError> {
    let context = || format!("cannot import raster tile '{}'", entry.id);

    let mut dataset = format.open(path).map_err(|e| exchange_error(context(), e))?;
    let bands = (0..dataset.band_count())
        .map(|index| dataset.read_band(index))
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(|e| exchange_error(context(), e))?;
    let data = CubeArray::stack(&bands).map_err(|e| exchange_error(context(), e))?;

    let extent = entry.extent.unwrap_or_else(|| {
        let (rows, cols) = dataset.size();
        SpatialExtent::from_geo_transform(&dataset.geo_transform(), rows, cols)
    });
    if !dataset.projection().is_empty() {
        debug!(
            "Raster tile '{}' carries its own projection; the manifest projection applies",
            entry.id
        );
    }

    Ok(RasterCollectionTile::new(entry.id, data, extent))
}

/// Transformation whose body is a script run by an external interpreter.
///
/// The script runs in a child process against a private exchange directory
/// that is removed when [`apply`](UdfTransform::apply) returns.
#[derive(Clone)]
pub struct ProcessTransform {
    name: String,
    source: String,
    interpreter: Vec<String>,
    formats: ExchangeFormats,
}

impl ProcessTransform {
    /// Creates a transform for `source`, run with `sh` by default.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        formats: ExchangeFormats,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            interpreter: vec!["sh".to_string()],
            formats,
        }
    }

    /// Reads the script from `path`; the transform is named after the file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Read`](crate::error::IoError::Read) if the file
    /// cannot be read.
    pub fn from_file(path: &Path, formats: ExchangeFormats) -> Result<Self> {
        let source = fs::read_to_string(path).with_read_context("UDF", path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, source, formats))
    }

    /// Sets the interpreter command line, program first.
    #[must_use]
    pub fn with_interpreter<I, S>(mut self, interpreter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interpreter = interpreter.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn interpreter(&self) -> &[String] {
        &self.interpreter
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    fn run(&self, context: &mut UdfDataContext) -> std::result::Result<(), ExecutionError> {
        let Some((program, args)) = self.interpreter.split_first() else {
            return Err(ExecutionError::Spawn {
                interpreter: String::new(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "empty interpreter command",
                ),
            });
        };

        let exchange = tempfile::Builder::new()
            .prefix("geoudf-")
            .tempdir()
            .map_err(|e| exchange_error("cannot create exchange directory", e))?;
        let dir = exchange.path();

        export_context(context, dir, &self.formats)?;
        let script = dir.join(SCRIPT_FILE);
        fs::write(&script, &self.source).map_err(|e| exchange_error("cannot write script", e))?;

        info!("Running '{}' with {}", self.name, self.interpreter.join(" "));
        let start = Instant::now();
        let output = Command::new(program)
            .args(args)
            .arg(&script)
            .arg(dir)
            .env(CONTEXT_DIR_ENV, dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExecutionError::Spawn {
                interpreter: program.clone(),
                source,
            })?;
        let elapsed = start.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!("[{}] {line}", self.name);
        }

        if !output.status.success() {
            return Err(ExecutionError::ProcessExit {
                transform: self.name.clone(),
                status: output.status.to_string(),
                stderr: stderr.into_owned(),
                elapsed,
            });
        }
        for line in stderr.lines() {
            warn!("[{}] {line}", self.name);
        }

        *context = import_context(dir, &self.formats)?;
        Ok(())
    }
}

impl UdfTransform for ProcessTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, context: &mut UdfDataContext) -> anyhow::Result<()> {
        Ok(self.run(context)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::{Int64Array, RecordBatch};
    use arrow_schema::{DataType, Field, Schema};
    use geoudf_core_common::{GeoTransform, SampleType, wkt_geometry_field};
    use ndarray::Array3;
    use tempfile::TempDir;

    use super::*;
    use crate::error::UdfError;
    use crate::executor::UdfExecutor;

    fn formats() -> ExchangeFormats {
        ExchangeFormats::default()
    }

    fn context() -> UdfDataContext {
        let extent = SpatialExtent::from_geo_transform(
            &GeoTransform([10.0, 1.0, 0.0, 20.0, 0.0, -1.0]),
            2,
            3,
        );
        let data = CubeArray::Int16(
            Array3::from_shape_vec((2, 2, 3), (0..12).map(|v| v as i16).collect()).unwrap(),
        );

        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            wkt_geometry_field("geometry"),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![7])),
                Arc::new(arrow_array::StringArray::from(vec!["POINT(1 2)"])),
            ],
        )
        .unwrap();

        UdfDataContext::new(
            "EPSG:32633",
            vec![RasterCollectionTile::new("RED", data, extent)],
            vec![FeatureCollectionTile::new("wells", batch)],
        )
    }

    #[test]
    fn test_export_import_round_trip() {
        let dir = TempDir::new().unwrap();
        let original = context();

        let manifest = export_context(&original, dir.path(), &formats()).unwrap();
        assert_eq!(manifest.raster_tiles[0].file, "raster_0.tif");
        assert_eq!(manifest.feature_tiles[0].file, "vector_0.geojson");
        assert!(dir.path().join(MANIFEST_FILE).exists());

        let imported = import_context(dir.path(), &formats()).unwrap();
        assert_eq!(imported.projection, original.projection);
        assert_eq!(imported.raster_tiles, original.raster_tiles);
        assert_eq!(imported.raster_tiles[0].sample_type(), SampleType::Int16);
        assert_eq!(imported.feature_tiles[0].id, "wells");
        assert_eq!(imported.feature_tiles[0].len(), 1);
    }

    #[test]
    fn test_missing_extent_comes_from_file() {
        let dir = TempDir::new().unwrap();
        let original = context();
        let mut manifest = export_context(&original, dir.path(), &formats()).unwrap();
        manifest.raster_tiles[0].extent = None;
        fs::write(
            dir.path().join(MANIFEST_FILE),
            serde_json::to_vec(&manifest).unwrap(),
        )
        .unwrap();

        let imported = import_context(dir.path(), &formats()).unwrap();
        assert_eq!(imported.raster_tiles[0].extent, original.raster_tiles[0].extent);
    }

    #[test]
    fn test_invalid_manifest_is_exchange_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "{ nope").unwrap();

        let err = import_context(dir.path(), &formats()).unwrap_err();
        assert!(matches!(err, ExecutionError::Exchange { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_script_edits_manifest() {
        let script = r#"
set -e
cd "$GEOUDF_CONTEXT_DIR"
sed 's/"EPSG:32633"/"EPSG:3035"/' context.json > context.tmp
mv context.tmp context.json
"#;
        let transform = ProcessTransform::new("reproject.sh", script, formats());
        let mut ctx = context();

        let status = UdfExecutor::new().execute(&transform, &mut ctx).unwrap();
        assert!(status.modified);
        assert_eq!(ctx.projection, "EPSG:3035");
        assert_eq!(ctx.raster_tiles.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_script_receives_exchange_dir_argument() {
        let script = r#"test "$1" = "$GEOUDF_CONTEXT_DIR" && test -f "$1/context.json""#;
        let transform = ProcessTransform::new("args.sh", script, formats());
        let mut ctx = context();

        UdfExecutor::new().execute(&transform, &mut ctx).unwrap();
        assert_eq!(ctx.raster_tiles, context().raster_tiles);
        assert_eq!(ctx.projection, "EPSG:32633");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_script_reports_stderr() {
        let transform =
            ProcessTransform::new("fail.sh", "echo 'no such band' >&2\nexit 3\n", formats());
        let mut ctx = context();

        let err = UdfExecutor::new().execute(&transform, &mut ctx).unwrap_err();
        match err {
            UdfError::Execution(ExecutionError::ProcessExit { stderr, status, .. }) => {
                assert!(stderr.contains("no such band"));
                assert!(status.contains('3'));
            },
            other => panic!("expected process exit, got {other:?}"),
        }
        assert_eq!(ctx, context());
    }

    #[test]
    fn test_missing_interpreter_is_spawn_error() {
        let transform = ProcessTransform::new("x", "", formats())
            .with_interpreter(["geoudf-no-such-interpreter"]);
        let mut ctx = UdfDataContext::default();

        let err = UdfExecutor::new().execute(&transform, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            UdfError::Execution(ExecutionError::Spawn { .. })
        ));
    }

    #[test]
    fn test_from_file_names_transform_after_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ndvi.sh");
        fs::write(&path, "exit 0\n").unwrap();

        let transform = ProcessTransform::from_file(&path, formats()).unwrap();
        assert_eq!(transform.name(), "ndvi.sh");
        assert_eq!(transform.source(), "exit 0\n");
        assert_eq!(transform.interpreter(), ["sh".to_string()]);

        assert!(ProcessTransform::from_file(&dir.path().join("missing.sh"), formats()).is_err());
    }
}
