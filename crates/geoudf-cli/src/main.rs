//! Command-line interface for `geoudf`.
//!
//! This binary runs user-defined transformations over co-registered raster and
//! vector datasets through the [`geoudf_core`] library.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for
//! structured logging. It parses arguments, configures logging, and delegates
//! to command handlers; errors are reported with their user message and a
//! recovery hint.
//!
//! # Available Commands
//!
//! - `run` - Run a UDF script over raster and vector sources
//! - `info` - Display dataset information and metadata
//! - `drivers` - List all format drivers and their capabilities

mod display;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use geoudf_core::config::{DEFAULT_RASTER_DRIVER, DEFAULT_VECTOR_DRIVER, default_output_dir};
use geoudf_core::drivers::{get_drivers, raster_format, vector_format};
use geoudf_core::error::ConfigError;
use geoudf_core::operations::describe_dataset;
use geoudf_core::{ExchangeFormats, OutputPrecision, ProcessTransform, RunConfig, UdfError};

use crate::display::{display_dataset_info, display_run_summary, drivers_table};

#[derive(Parser)]
#[command(
    name = "geoudf",
    version,
    about = "Run user-defined transformations over geospatial raster and vector data",
    long_about = "geoudf stacks co-registered single-time rasters into one cube per band,\n\
                  hands them with any vector layers to a UDF script and writes back\n\
                  whatever the script leaves in the context."
)]
/// Command-line arguments and options for the `geoudf` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `geoudf` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Runs a UDF script over raster and vector sources.
    ///
    /// Raster sources are single-time snapshots sharing one band layout; they
    /// are stacked in the order given. The script receives the context through
    /// an exchange directory and may rewrite it.
    Run {
        /// Path to the UDF script.
        #[arg(long, value_name = "FILE")]
        udf: PathBuf,

        /// Raster sources, in time order.
        #[arg(long, value_name = "FILES", value_delimiter = ',')]
        raster_files: Vec<PathBuf>,

        /// Vector sources.
        #[arg(long, value_name = "FILES", value_delimiter = ',')]
        vector_files: Vec<PathBuf>,

        /// One name per band of the raster sources (e.g., "RED,NIR").
        #[arg(long, value_name = "NAMES", value_delimiter = ',')]
        band_names: Vec<String>,

        /// Directory receiving the outputs [default: $TMPDIR/geoudf_output].
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Sample type of written rasters: match-input, float32 or float64.
        #[arg(long, value_name = "PRECISION", default_value_t = OutputPrecision::MatchInput)]
        output_precision: OutputPrecision,

        /// Interpreter command running the script; split on whitespace.
        #[arg(long, value_name = "COMMAND", default_value = "sh")]
        interpreter: String,

        /// The driver used for raster sources and outputs.
        #[arg(long, value_name = "DRIVER", default_value = DEFAULT_RASTER_DRIVER)]
        raster_driver: String,

        /// The driver used for vector sources and outputs.
        #[arg(long, value_name = "DRIVER", default_value = DEFAULT_VECTOR_DRIVER)]
        vector_driver: String,
    },

    /// Displays information about a raster or vector dataset.
    Info {
        /// Path to the dataset.
        #[arg(value_name = "DATASET")]
        input: PathBuf,

        /// Driver to open the dataset with; inferred from the extension if omitted.
        #[arg(long, value_name = "DRIVER")]
        driver: Option<String>,
    },

    /// Lists all geospatial drivers and their capabilities.
    Drivers,
}

/// Entry point for the `geoudf` command-line interface.
fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.verbose, cli.debug) {
        eprintln!("Error: failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Run {
            udf,
            raster_files,
            vector_files,
            band_names,
            output_dir,
            output_precision,
            interpreter,
            raster_driver,
            vector_driver,
        } => {
            let config = RunConfig::new()
                .with_raster_files(raster_files)
                .with_vector_files(vector_files)
                .with_band_names(band_names)
                .with_output_dir(output_dir.unwrap_or_else(default_output_dir))
                .with_output_precision(output_precision)
                .with_raster_driver(raster_driver)
                .with_vector_driver(vector_driver);
            handle_run(&config, &udf, &interpreter)
        },
        Commands::Info { input, driver } => handle_info(&input, driver.as_deref()),
        Commands::Drivers => {
            handle_drivers();
            Ok(())
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        },
    }
}

fn init_logging(verbose: bool, debug: bool) -> Result<()> {
    let log_level = if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn report_error(err: &UdfError) {
    eprintln!("Error: {}", err.user_message());
    if let Some(hint) = err.recovery_suggestion() {
        eprintln!("\nHint: {hint}");
    }
}

fn handle_run(config: &RunConfig, udf: &Path, interpreter: &str) -> geoudf_core::Result<()> {
    info!("Run command:");
    info!("UDF: {}", udf.display());
    info!("Output: {}", config.output_dir.display());
    debug!("Interpreter: {interpreter}");

    if interpreter.split_whitespace().next().is_none() {
        return Err(ConfigError::MissingRequired {
            option: "interpreter".to_string(),
        }
        .into());
    }
    config.validate()?;
    let formats = ExchangeFormats::new(
        raster_format(&config.raster_driver)?,
        vector_format(&config.vector_driver)?,
    );
    let transform =
        ProcessTransform::from_file(udf, formats)?.with_interpreter(interpreter.split_whitespace());

    let summary = geoudf_core::run(config, &transform)?;
    display_run_summary(&summary);
    Ok(())
}

fn handle_info(input: &Path, driver: Option<&str>) -> geoudf_core::Result<()> {
    info!("Displaying info for {}", input.display());
    let info = describe_dataset(input, driver)?;
    display_dataset_info(&info);
    Ok(())
}

/// Handles the `drivers` subcommand by displaying a formatted table of every
/// registered driver and its capabilities.
fn handle_drivers() {
    let drivers = get_drivers();
    println!("\nDrivers ({} total):\n", drivers.len());
    println!("{}", drivers_table(&drivers));
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments_split_on_commas() {
        let cli = Cli::try_parse_from([
            "geoudf",
            "run",
            "--udf",
            "ndvi.sh",
            "--raster-files",
            "t0.tif,t1.tif",
            "--band-names",
            "RED,NIR",
            "--output-precision",
            "float64",
        ])
        .unwrap();

        let Commands::Run {
            raster_files,
            band_names,
            output_precision,
            output_dir,
            interpreter,
            raster_driver,
            ..
        } = cli.command
        else {
            panic!("expected run command");
        };
        assert_eq!(raster_files, vec![PathBuf::from("t0.tif"), PathBuf::from("t1.tif")]);
        assert_eq!(band_names, vec!["RED", "NIR"]);
        assert_eq!(output_precision, OutputPrecision::Float64);
        assert!(output_dir.is_none());
        assert_eq!(interpreter, "sh");
        assert_eq!(raster_driver, "GTiff");
    }

    #[test]
    fn test_invalid_precision_is_rejected() {
        let result = Cli::try_parse_from([
            "geoudf",
            "run",
            "--udf",
            "x.sh",
            "--output-precision",
            "float16",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_interpreter_is_missing_option() {
        let err = handle_run(&RunConfig::new(), Path::new("ndvi.sh"), "  ").unwrap_err();
        assert!(matches!(
            err,
            UdfError::Config(ConfigError::MissingRequired { ref option }) if option == "interpreter"
        ));
        assert_eq!(err.recovery_suggestion().as_deref(), Some("Pass --interpreter."));
    }

    #[test]
    fn test_handle_info_unknown_driver() {
        let err = handle_info(Path::new("scene.tif"), Some("HDF5")).unwrap_err();
        assert!(err.user_message().contains("HDF5"));
        assert!(err.recovery_suggestion().is_some());
    }
}
