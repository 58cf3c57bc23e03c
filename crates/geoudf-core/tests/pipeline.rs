//! End-to-end runs against real GeoTIFF and GeoJSON files.

use std::fs;
use std::path::{Path, PathBuf};

use geoudf_core::error::{ConfigError, ExecutionError, GeometryMismatchError, UdfError};
use geoudf_core::{
    BandArray, CubeArray, ExchangeFormats, FnTransform, GeoTransform, OutputPrecision,
    ProcessTransform, RunConfig, SampleType, UdfDataContext, run,
};
use geoudf_core_common::{RasterDataset, RasterFormat, RasterWrite};
use geoudf_geotiff::GeoTiffFormat;
use ndarray::Array2;
use tempfile::TempDir;

const PROJECTION: &str = "EPSG:32633";
const GEO_TRANSFORM: GeoTransform = GeoTransform([300_000.0, 10.0, 0.0, 5_000_000.0, 0.0, -10.0]);

fn band(seed: u8) -> BandArray {
    BandArray::UInt8(Array2::from_shape_fn((3, 4), |(r, c)| seed + (r * 4 + c) as u8))
}

fn write_raster(path: &Path, bands: &[BandArray], geo_transform: GeoTransform) {
    GeoTiffFormat::new()
        .write(
            path,
            &RasterWrite {
                bands,
                geo_transform,
                projection: PROJECTION,
            },
        )
        .unwrap();
}

fn write_vector(path: &Path) {
    fs::write(
        path,
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"w1","depth":12},
             "geometry":{"type":"Point","coordinates":[300015.0,4999985.0]}}
        ]}"#,
    )
    .unwrap();
}

/// Writes `count` single-time sources with one band per entry in `band_seeds`.
fn sources(dir: &Path, count: usize, band_seeds: &[u8]) -> Vec<PathBuf> {
    (0..count)
        .map(|t| {
            let path = dir.join(format!("t{t}.tif"));
            let bands: Vec<_> = band_seeds.iter().map(|s| band(s + t as u8 * 20)).collect();
            write_raster(&path, &bands, GEO_TRANSFORM);
            path
        })
        .collect()
}

fn identity() -> FnTransform<impl Fn(&mut UdfDataContext) -> anyhow::Result<()>> {
    FnTransform::new("identity", |_: &mut UdfDataContext| Ok(()))
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

fn read_bands(path: &Path) -> Vec<BandArray> {
    let mut dataset = GeoTiffFormat::new().open(path).unwrap();
    (0..dataset.band_count())
        .map(|i| dataset.read_band(i).unwrap())
        .collect()
}

#[test]
fn test_one_file_per_time_slice() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let rasters = sources(input.path(), 3, &[0]);
    let wells = input.path().join("wells.geojson");
    write_vector(&wells);

    let config = RunConfig::new()
        .with_raster_files(rasters)
        .with_vector_files([&wells])
        .with_band_names(["RED"])
        .with_output_dir(output.path());

    let summary = run(&config, &identity()).unwrap();
    assert!(!summary.status.modified);
    assert_eq!(
        file_names(&summary.written),
        vec!["RED_0.tif", "RED_1.tif", "RED_2.tif", "wells.geojson"]
    );

    let slice_1 = read_bands(&output.path().join("RED_1.tif"));
    assert_eq!(slice_1.len(), 1);
    assert_eq!(slice_1[0].sample_type(), SampleType::Float32);
    assert_eq!(slice_1[0], band(20).to_float32());

    let dataset = GeoTiffFormat::new()
        .open(&output.path().join("RED_0.tif"))
        .unwrap();
    assert_eq!(dataset.geo_transform(), GEO_TRANSFORM);
    assert_eq!(dataset.projection(), PROJECTION);
}

#[test]
fn test_identity_round_trip_multiband() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let rasters = sources(input.path(), 2, &[0, 100]);

    let config = RunConfig::new()
        .with_raster_files(rasters)
        .with_band_names(["RED", "NIR"])
        .with_output_dir(output.path())
        .with_output_precision(OutputPrecision::Float64);

    let summary = run(&config, &identity()).unwrap();
    assert_eq!(file_names(&summary.written), vec!["RED_0.tif", "RED_1.tif"]);

    for slice in 0..2u8 {
        let bands = read_bands(&output.path().join(format!("RED_{slice}.tif")));
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0], band(slice * 20).to_float64());
        assert_eq!(bands[1], band(100 + slice * 20).to_float64());
    }
}

#[test]
fn test_band_name_mismatch_writes_nothing() {
    let input = TempDir::new().unwrap();
    let output = input.path().join("out");
    let rasters = sources(input.path(), 1, &[0]);

    let config = RunConfig::new()
        .with_raster_files(rasters)
        .with_band_names(["RED", "NIR"])
        .with_output_dir(&output);

    let err = run(&config, &identity()).unwrap_err();
    assert!(matches!(
        err,
        UdfError::Config(ConfigError::BandNameMismatch {
            declared: 2,
            detected: 1
        })
    ));
    assert!(!output.exists());
}

#[test]
fn test_extent_mismatch_is_rejected() {
    let input = TempDir::new().unwrap();
    let a = input.path().join("a.tif");
    let b = input.path().join("b.tif");
    write_raster(&a, &[band(0)], GEO_TRANSFORM);
    write_raster(
        &b,
        &[band(0)],
        GeoTransform([300_010.0, 10.0, 0.0, 5_000_000.0, 0.0, -10.0]),
    );

    let config = RunConfig::new()
        .with_raster_files([a, b])
        .with_band_names(["RED"])
        .with_output_dir(input.path().join("out"));

    let err = run(&config, &identity()).unwrap_err();
    assert!(matches!(
        err,
        UdfError::Geometry(GeometryMismatchError::Extent { .. })
    ));
}

#[test]
fn test_vector_only_run() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let roads = input.path().join("roads.geojson");
    write_vector(&roads);

    let config = RunConfig::new()
        .with_vector_files([roads])
        .with_output_dir(output.path());

    let summary = run(&config, &identity()).unwrap();
    assert_eq!(file_names(&summary.written), vec!["roads.geojson"]);
    assert_eq!(summary.status.raster_tiles, 0);
    assert_eq!(fs::read_dir(output.path()).unwrap().count(), 1);
}

#[test]
fn test_identity_runs_are_byte_identical() {
    let input = TempDir::new().unwrap();
    let rasters = sources(input.path(), 2, &[0]);
    let wells = input.path().join("wells.geojson");
    write_vector(&wells);

    let outputs: Vec<_> = (0..2)
        .map(|_| {
            let output = TempDir::new().unwrap();
            let config = RunConfig::new()
                .with_raster_files(rasters.clone())
                .with_vector_files([&wells])
                .with_band_names(["RED"])
                .with_output_dir(output.path());
            let summary = run(&config, &identity()).unwrap();
            let contents: Vec<_> = summary
                .written
                .iter()
                .map(|p| fs::read(p).unwrap())
                .collect();
            (file_names(&summary.written), contents)
        })
        .collect();

    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_transform_output_shape_may_differ() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let rasters = sources(input.path(), 3, &[0]);

    let mean = FnTransform::new("mean", |ctx: &mut UdfDataContext| {
        let tile = ctx
            .raster_tile_mut("RED")
            .ok_or_else(|| anyhow::anyhow!("RED missing"))?;
        let CubeArray::Float32(cube) = tile.data.to_float32() else {
            anyhow::bail!("unexpected sample type");
        };
        let mean = cube
            .mean_axis(ndarray::Axis(0))
            .ok_or_else(|| anyhow::anyhow!("no slices"))?;
        tile.data = CubeArray::Float32(mean.insert_axis(ndarray::Axis(0)));
        tile.id = "MEAN".to_string();
        Ok(())
    });

    let config = RunConfig::new()
        .with_raster_files(rasters)
        .with_band_names(["RED"])
        .with_output_dir(output.path());

    let summary = run(&config, &mean).unwrap();
    assert!(summary.status.modified);
    assert_eq!(file_names(&summary.written), vec!["MEAN_0.tif"]);

    let bands = read_bands(&output.path().join("MEAN_0.tif"));
    assert_eq!(bands[0], band(20).to_float32());
}

#[test]
fn test_float64_first_tile_widens_every_band() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let rasters = sources(input.path(), 2, &[0]);

    let prepend_ndvi = FnTransform::new("ndvi", |ctx: &mut UdfDataContext| {
        let red = ctx
            .raster_tile("RED")
            .ok_or_else(|| anyhow::anyhow!("RED missing"))?;
        let mut ndvi = red.clone();
        ndvi.id = "NDVI".to_string();
        ndvi.data = red.data.to_float64();
        ctx.raster_tiles.insert(0, ndvi);
        Ok(())
    });

    let config = RunConfig::new()
        .with_raster_files(rasters)
        .with_band_names(["RED"])
        .with_output_dir(output.path());

    let summary = run(&config, &prepend_ndvi).unwrap();
    assert_eq!(file_names(&summary.written), vec!["NDVI_0.tif", "NDVI_1.tif"]);

    let bands = read_bands(&output.path().join("NDVI_1.tif"));
    assert_eq!(bands.len(), 2);
    assert!(bands.iter().all(|b| b.sample_type() == SampleType::Float64));
    assert_eq!(bands[1], band(20).to_float64());
}

#[cfg(unix)]
#[test]
fn test_script_transform_changes_projection() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let rasters = sources(input.path(), 2, &[0]);
    let script = input.path().join("reproject.sh");
    fs::write(
        &script,
        "sed 's/EPSG:32633/EPSG:3035/' \"$1/context.json\" > \"$1/next.json\"\nmv \"$1/next.json\" \"$1/context.json\"\n",
    )
    .unwrap();

    let transform = ProcessTransform::from_file(&script, ExchangeFormats::default()).unwrap();
    let config = RunConfig::new()
        .with_raster_files(rasters)
        .with_band_names(["RED"])
        .with_output_dir(output.path());

    let summary = run(&config, &transform).unwrap();
    assert_eq!(summary.status.transform, "reproject.sh");
    assert!(summary.status.modified);

    let dataset = GeoTiffFormat::new()
        .open(&output.path().join("RED_1.tif"))
        .unwrap();
    assert_eq!(dataset.projection(), "EPSG:3035");
}

#[cfg(unix)]
#[test]
fn test_failing_script_writes_nothing() {
    let input = TempDir::new().unwrap();
    let output = input.path().join("out");
    let rasters = sources(input.path(), 1, &[0]);

    let transform = ProcessTransform::new(
        "broken",
        "echo 'cannot compute NDVI' >&2\nexit 2\n",
        ExchangeFormats::default(),
    );
    let config = RunConfig::new()
        .with_raster_files(rasters)
        .with_band_names(["RED"])
        .with_output_dir(&output);

    let err = run(&config, &transform).unwrap_err();
    assert!(matches!(
        err,
        UdfError::Execution(ExecutionError::ProcessExit { .. })
    ));
    assert!(err.to_string().contains("cannot compute NDVI"));
    assert!(!output.exists());
}
