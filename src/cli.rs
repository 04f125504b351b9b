//! Command-line interface for the telemetry driver binary.
//!
//! Per the distilled spec's external interfaces (§6), the driver takes four
//! positional arguments and is explicitly not part of the core - everything
//! it does (model/label loading, the inference loop itself) is a thin
//! harness around the profiles and uploader this crate actually
//! specifies.
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names (`"info"`, `"debug"`, ...) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => return Err(format!("unsupported log level number '{number}' (expected 0-5)")),
            };
            return Ok(LogLevelArg(level));
        }

        trimmed
            .parse::<LevelFilter>()
            .map(LogLevelArg)
            .map_err(|_| format!("unrecognized log level '{trimmed}'"))
    }
}

/// `<model> <labels> <image_dir> <config>` driver arguments.
#[derive(Parser, Debug)]
#[command(name = "edge-telemetry-profiler", about = "Runs the edge telemetry/uncertainty-sampling pipeline over a directory of images.")]
pub struct Cli {
    /// Path to the inference model file (loading it is a collaborator, out
    /// of this crate's scope - its presence is checked at startup).
    pub model: PathBuf,

    /// Path to the model's label file.
    pub labels: PathBuf,

    /// Directory of images to run the pipeline over.
    pub image_dir: PathBuf,

    /// INI config file (see `src/config.rs`).
    pub config: PathBuf,

    /// Log verbosity, as a name (`info`) or numeric level (0-5).
    #[arg(long, default_value = "info")]
    pub log_level: LogLevelArg,
}

/// Parses `std::env::args`, exiting the process with clap's usage message
/// on a parse error.
pub fn parse_args() -> Cli {
    Cli::parse()
}
