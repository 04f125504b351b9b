//! Driver binary: wires a config file's profile sections and uploader
//! instances together and runs the profiling pipeline over a directory of
//! images.
//!
//! Model/label loading and the inference engine itself are collaborators
//! this crate treats as opaque - this binary only checks that the paths
//! exist before starting, then stands in for the inference loop by
//! decoding each image under `image_dir` and running it through whichever
//! profiles the config file enabled.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use edge_telemetry::cli::{self, Cli};
use edge_telemetry::config::Config;
use edge_telemetry::profiles::{CustomProfile, ImageProfile, ModelProfile, SamplingProfile, TrackerProfile};
use edge_telemetry::uploader::Uploader;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// How often each profile's saver flushes its sketches to disk, absent a
/// more specific per-profile override.
const SAVE_INTERVAL: Duration = Duration::from_secs(60);

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let cli = cli::parse_args();
    init_tracing(&cli);

    if let Err(err) = check_model_inputs(&cli.model, &cli.labels) {
        error!(error = %err, "fatal: model initialization failed");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, path = %cli.config.display(), "fatal: failed to load config");
            return ExitCode::FAILURE;
        }
    };

    let model_id = cli
        .model
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "model".to_string());

    let mut image_profile = match config.image {
        Some(section) => match ImageProfile::new(section, SAVE_INTERVAL) {
            Ok(profile) => Some(profile),
            Err(err) => {
                error!(error = %err, "fatal: failed to initialize image profile");
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let model_profile = match config.model {
        Some(section) => match ModelProfile::new(model_id, section, SAVE_INTERVAL) {
            Ok(profile) => Some(profile),
            Err(err) => {
                error!(error = %err, "fatal: failed to initialize model profile");
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let tracker_profile = match config.tracker {
        Some(section) => match TrackerProfile::new(section, SAVE_INTERVAL) {
            Ok(profile) => Some(profile),
            Err(err) => {
                error!(error = %err, "fatal: failed to initialize tracker profile");
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let custom_profile = match config.custom {
        Some(section) => match CustomProfile::new(section, SAVE_INTERVAL) {
            Ok(profile) => Some(profile),
            Err(err) => {
                error!(error = %err, "fatal: failed to initialize custom profile");
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let sampling_profile = match config.sampling {
        Some(section) => match SamplingProfile::new(section, SAVE_INTERVAL) {
            Ok(profile) => Some(profile),
            Err(err) => {
                error!(error = %err, "fatal: failed to initialize sampling profile");
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    // model/tracker/custom/sampling are driven by the inference engine's
    // own classification/detection/tracking/custom-metric call sites,
    // which this binary doesn't emulate. They stay alive here only so
    // their savers keep running for the process lifetime.
    let _ = &model_profile;
    let _ = &tracker_profile;
    let _ = &custom_profile;
    let _ = &sampling_profile;

    let mut uploaders: Vec<Uploader> = config
        .uploaders
        .into_iter()
        .map(|section| {
            let mut uploader = Uploader::new(section);
            uploader.start();
            uploader
        })
        .collect();

    info!(image_dir = %cli.image_dir.display(), "starting profiling run");

    let entries = match std::fs::read_dir(&cli.image_dir) {
        Ok(entries) => entries,
        Err(err) => {
            error!(error = %err, path = %cli.image_dir.display(), "fatal: failed to read image directory");
            return ExitCode::FAILURE;
        }
    };

    let mut processed = 0u64;
    for entry in entries.flatten() {
        let path = entry.path();
        if !is_image_path(&path) {
            continue;
        }

        match image::open(&path) {
            Ok(decoded) => {
                let rgb = decoded.to_rgb8();
                if let Some(profile) = image_profile.as_mut() {
                    profile.profile(&rgb, true);
                }
                processed += 1;
            }
            Err(err) => warn!(path = %path.display(), error = %err, "failed to decode image, skipping"),
        }
    }

    info!(processed, "profiling run complete");

    for uploader in uploaders.iter_mut() {
        uploader.stop();
    }

    ExitCode::SUCCESS
}

fn is_image_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_ascii_lowercase()).as_deref(),
        Some("png") | Some("jpg") | Some("jpeg")
    )
}

fn check_model_inputs(model: &Path, labels: &Path) -> std::io::Result<()> {
    std::fs::metadata(model)?;
    std::fs::metadata(labels)?;
    Ok(())
}
