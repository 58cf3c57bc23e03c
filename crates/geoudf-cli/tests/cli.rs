use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use geoudf_core_common::{BandArray, GeoTransform, RasterFormat, RasterWrite};
use geoudf_geotiff::GeoTiffFormat;
use ndarray::Array2;
use predicates::prelude::*;
use tempfile::TempDir;

fn geoudf() -> Command {
    Command::cargo_bin("geoudf").unwrap()
}

fn write_raster(path: &Path, bands: usize) {
    let band = BandArray::Int16(Array2::from_elem((2, 3), 7));
    let bands = vec![band; bands];
    GeoTiffFormat::new()
        .write(
            path,
            &RasterWrite {
                bands: &bands,
                geo_transform: GeoTransform([10.0, 1.0, 0.0, 20.0, 0.0, -1.0]),
                projection: "EPSG:32633",
            },
        )
        .unwrap();
}

fn sources(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|t| {
            let path = dir.join(format!("t{t}.tif"));
            write_raster(&path, 1);
            path
        })
        .collect()
}

fn joined(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[test]
fn test_help() {
    geoudf()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("drivers"));
}

#[test]
fn test_drivers_lists_supported_formats() {
    geoudf()
        .arg("drivers")
        .assert()
        .success()
        .stdout(predicate::str::contains("GTiff"))
        .stdout(predicate::str::contains("GeoJSON"))
        .stdout(predicate::str::contains("Planned"));
}

#[test]
fn test_info_on_raster() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scene.tif");
    write_raster(&path, 2);

    geoudf()
        .arg("info")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("GTiff"))
        .stdout(predicate::str::contains("Int16"))
        .stdout(predicate::str::contains("EPSG:32633"));
}

#[test]
fn test_info_on_vector() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wells.geojson");
    fs::write(
        &path,
        r#"{"type":"Feature","properties":{"depth":12},"geometry":{"type":"Point","coordinates":[1,2]}}"#,
    )
    .unwrap();

    geoudf()
        .args(["info", "--driver", "GeoJSON"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("depth"))
        .stdout(predicate::str::contains("geoarrow.wkt"));
}

#[test]
fn test_info_unknown_driver() {
    geoudf()
        .args(["info", "scene.tif", "--driver", "HDF5"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Driver 'HDF5' not found"))
        .stderr(predicate::str::contains("geoudf drivers"));
}

#[test]
fn test_run_identity_script() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out");
    let rasters = sources(dir.path(), 2);
    let script = dir.path().join("identity.sh");
    fs::write(&script, "exit 0\n").unwrap();

    geoudf()
        .arg("run")
        .arg("--udf")
        .arg(&script)
        .arg("--raster-files")
        .arg(joined(&rasters))
        .args(["--band-names", "RED"])
        .arg("--output-dir")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 file(s)"))
        .stdout(predicate::str::contains("RED_1.tif"));

    assert!(output.join("RED_0.tif").exists());
    assert!(output.join("RED_1.tif").exists());
}

#[test]
fn test_run_without_sources_fails() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("identity.sh");
    fs::write(&script, "exit 0\n").unwrap();

    geoudf()
        .arg("run")
        .arg("--udf")
        .arg(&script)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No input sources"));
}

#[test]
fn test_run_blank_interpreter_fails() {
    let dir = TempDir::new().unwrap();
    let rasters = sources(dir.path(), 1);
    let script = dir.path().join("identity.sh");
    fs::write(&script, "exit 0\n").unwrap();

    geoudf()
        .arg("run")
        .arg("--udf")
        .arg(&script)
        .arg("--raster-files")
        .arg(joined(&rasters))
        .args(["--band-names", "RED", "--interpreter", ""])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Missing required option: interpreter"))
        .stderr(predicate::str::contains("Pass --interpreter."));
}

#[test]
fn test_run_band_name_mismatch_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out");
    let rasters = sources(dir.path(), 1);
    let script = dir.path().join("identity.sh");
    fs::write(&script, "exit 0\n").unwrap();

    geoudf()
        .arg("run")
        .arg("--udf")
        .arg(&script)
        .arg("--raster-files")
        .arg(joined(&rasters))
        .args(["--band-names", "RED,NIR"])
        .arg("--output-dir")
        .arg(&output)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--band-names"));

    assert!(!output.exists());
}

#[test]
fn test_run_failing_script_reports_stderr() {
    let dir = TempDir::new().unwrap();
    let rasters = sources(dir.path(), 1);
    let script = dir.path().join("broken.sh");
    fs::write(&script, "echo 'band RED missing' >&2\nexit 4\n").unwrap();

    geoudf()
        .arg("run")
        .arg("--udf")
        .arg(&script)
        .arg("--raster-files")
        .arg(joined(&rasters))
        .args(["--band-names", "RED"])
        .arg("--output-dir")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("band RED missing"));
}
