//! INI configuration loading for the telemetry engine.
//!
//! The general-purpose INI grammar is treated as an opaque collaborator (see
//! `SPEC_FULL.md` §0.3): this parser only supports the subset the pipeline's
//! config files actually use — `[section]` headers, `key = value` lines,
//! `;`/`#` full-line comments, blank lines, and comma-separated list values.
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::error::ConfigError;

/// A lower/upper threshold pair, e.g. from `BRIGHTNESS = 200, 255`.
///
/// A metric value outside `[lower, upper]` is the trigger condition for
/// sample-saving (see component design §4.1); for sections where the
/// metric key only gates sketch registration (tracker, sampling-adjacent
/// bookkeeping) the bounds themselves may go unused but presence of the key
/// still enables the metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    /// Lower bound, inclusive.
    pub lower: f32,
    /// Upper bound, inclusive.
    pub upper: f32,
}

impl Threshold {
    /// True when `value` falls outside `[lower, upper]` — the save-sample
    /// trigger condition fixed by the distilled spec's open-question
    /// resolution ("outside the range triggers save").
    pub fn is_exceeded(&self, value: f32) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Raw parsed INI document: section name -> (key -> raw value).
#[derive(Debug, Clone, Default)]
struct IniDocument {
    sections: HashMap<String, HashMap<String, String>>,
}

fn parse_ini(path: &Path) -> Result<IniDocument, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let mut doc = IniDocument::default();
    let mut current_section: Option<String> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
                return Err(ConfigError::MalformedLine {
                    line: idx + 1,
                    content: raw_line.to_string(),
                });
            };
            let name = name.trim().to_string();
            doc.sections.entry(name.clone()).or_default();
            current_section = Some(name);
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::MalformedLine {
                line: idx + 1,
                content: raw_line.to_string(),
            });
        };

        let Some(section) = current_section.as_ref() else {
            return Err(ConfigError::MalformedLine {
                line: idx + 1,
                content: raw_line.to_string(),
            });
        };

        doc.sections
            .get_mut(section)
            .expect("section was inserted on header")
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(doc)
}

fn split_comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_threshold(section: &str, key: &str, value: &str) -> Result<Threshold, ConfigError> {
    let parts = split_comma_list(value);
    if parts.len() != 2 {
        return Err(ConfigError::MalformedThreshold {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    let lower = parts[0]
        .parse::<f32>()
        .map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        })?;
    let upper = parts[1]
        .parse::<f32>()
        .map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        })?;
    Ok(Threshold { lower, upper })
}

/// `stat_dir`/`data_dir` pair parsed from a section's `filepath` key.
#[derive(Debug, Clone)]
pub struct FilePaths {
    /// Directory serialized sketches are written under.
    pub stat_dir: PathBuf,
    /// Directory sampled raw images are written under.
    pub data_dir: PathBuf,
}

fn parse_filepaths(section: &str, kv: &HashMap<String, String>) -> Result<FilePaths, ConfigError> {
    let raw = kv.get("filepath").ok_or_else(|| ConfigError::MissingKey {
        section: section.to_string(),
        key: "filepath".to_string(),
    })?;
    let parts = split_comma_list(raw);
    let stat_dir = parts
        .first()
        .ok_or_else(|| ConfigError::MissingKey {
            section: section.to_string(),
            key: "filepath".to_string(),
        })?
        .clone();
    // Some sections (model) only configure a single stat directory.
    let data_dir = parts.get(1).cloned().unwrap_or_else(|| stat_dir.clone());
    Ok(FilePaths {
        stat_dir: PathBuf::from(stat_dir),
        data_dir: PathBuf::from(data_dir),
    })
}

/// Parses all non-`filepath` keys in a section as thresholds, warning and
/// skipping (not failing) on keys outside `allowed_keys`.
fn parse_metric_thresholds(
    section: &str,
    kv: &HashMap<String, String>,
    allowed_keys: &[&str],
) -> Result<HashMap<String, Threshold>, ConfigError> {
    let mut metrics = HashMap::new();
    for (key, value) in kv {
        if key == "filepath" {
            continue;
        }
        if !allowed_keys.contains(&key.as_str()) {
            warn!(section, key, "ignoring unknown metric key in config");
            continue;
        }
        metrics.insert(key.clone(), parse_threshold(section, key, value)?);
    }
    Ok(metrics)
}

/// Image profile metric vocabulary, per component design §4.1.
pub const IMAGE_METRIC_KEYS: &[&str] =
    &["NOISE", "BRIGHTNESS", "SHARPNESS", "MEAN", "HISTOGRAM"];

/// Sampling-section confidence metric vocabulary.
pub const SAMPLING_METRIC_KEYS: &[&str] = &[
    "MARGINCONFIDENCE",
    "LEASTCONFIDENCE",
    "RATIOCONFIDENCE",
    "ENTROPYCONFIDENCE",
];

/// Tracker profile metric vocabulary (supplemented from `trackingprofile.cpp`,
/// see `SPEC_FULL.md` §0.5).
pub const TRACKER_METRIC_KEYS: &[&str] = &[
    "DETECTION_CONFIDENCE",
    "TRACK_LENGTH",
    "TRACK_IOU",
    "POSITION_ERROR",
    "ORIENTATION_ERROR",
    "ANGULAR_VELOCITY_LATENCY",
    "COVARIANCE_SPREAD",
    "ANGULAR_DIVERGENCE",
    "ANOMALOUS_ROTATION",
    "QUATERNION_DRIFT",
];

/// `[image]` section configuration.
#[derive(Debug, Clone)]
pub struct ImageProfileConfig {
    /// Save directories.
    pub paths: FilePaths,
    /// Enabled metrics and their thresholds.
    pub metrics: HashMap<String, Threshold>,
}

/// `[model]` section configuration.
#[derive(Debug, Clone)]
pub struct ModelProfileConfig {
    /// Save directories.
    pub paths: FilePaths,
}

/// `[tracker]` section configuration.
#[derive(Debug, Clone)]
pub struct TrackerProfileConfig {
    /// Save directories.
    pub paths: FilePaths,
    /// Enabled metrics (presence gates registration; see `SPEC_FULL.md`
    /// §0.5 for why thresholds are parsed uniformly here even though the
    /// original source used plain boolean flags for this section).
    pub metrics: HashMap<String, Threshold>,
}

/// `[custom]` section configuration.
#[derive(Debug, Clone)]
pub struct CustomProfileConfig {
    /// Save directories.
    pub paths: FilePaths,
}

/// `[sampling]` section configuration.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Save directories.
    pub paths: FilePaths,
    /// Enabled confidence metrics and their thresholds.
    pub metrics: HashMap<String, Threshold>,
}

/// A single watched folder entry within an uploader section's parallel
/// `folderPath`/`fileType`/`deletedata` lists.
#[derive(Debug, Clone)]
pub struct FolderUploadSpec {
    /// Folder to archive and upload.
    pub folder_path: PathBuf,
    /// File-type tag sent with the archive.
    pub file_type: String,
    /// Whether to empty the folder after a successful upload.
    pub delete_after_upload: bool,
}

/// One uploader-instance section (any section name other than the five
/// fixed profile sections).
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Section name, used as a human-readable instance tag.
    pub name: String,
    /// Ingest endpoint URL.
    pub endpoint_url: String,
    /// Bearer token.
    pub token: String,
    /// Sensor identifier sent with each upload.
    pub sensor_id: String,
    /// Folders this instance walks round-robin.
    pub folders: Vec<FolderUploadSpec>,
    /// Seconds between upload cycles.
    pub interval_seconds: u64,
}

const FIXED_SECTIONS: &[&str] = &["image", "model", "tracker", "custom", "sampling"];

fn parse_uploader_section(
    name: &str,
    kv: &HashMap<String, String>,
) -> Result<UploaderConfig, ConfigError> {
    let get = |key: &str| -> Result<&String, ConfigError> {
        kv.get(key).ok_or_else(|| ConfigError::MissingKey {
            section: name.to_string(),
            key: key.to_string(),
        })
    };

    let endpoint_url = get("http_endpoint")?.clone();
    let token = get("token")?.clone();
    let sensor_id = get("sensorId")?.clone();

    let folder_paths = split_comma_list(get("folderPath")?);
    let file_types = split_comma_list(get("fileType")?);
    let delete_flags = split_comma_list(get("deletedata")?);

    if folder_paths.len() != file_types.len() || folder_paths.len() != delete_flags.len() {
        return Err(ConfigError::MismatchedLists {
            section: name.to_string(),
        });
    }

    let folders = folder_paths
        .into_iter()
        .zip(file_types)
        .zip(delete_flags)
        .map(|((folder_path, file_type), delete_flag)| FolderUploadSpec {
            folder_path: PathBuf::from(folder_path),
            file_type,
            delete_after_upload: delete_flag.eq_ignore_ascii_case("true"),
        })
        .collect();

    let interval_raw = get("upload_interval")?;
    let interval_seconds = interval_raw
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber {
            key: "upload_interval".to_string(),
            value: interval_raw.clone(),
        })?;

    Ok(UploaderConfig {
        name: name.to_string(),
        endpoint_url,
        token,
        sensor_id,
        folders,
        interval_seconds,
    })
}

/// Fully parsed configuration file: the five fixed profile sections (each
/// optional — a profile is only constructed if its section is present) plus
/// zero or more uploader instance sections.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// `[image]` section, if present.
    pub image: Option<ImageProfileConfig>,
    /// `[model]` section, if present.
    pub model: Option<ModelProfileConfig>,
    /// `[tracker]` section, if present.
    pub tracker: Option<TrackerProfileConfig>,
    /// `[custom]` section, if present.
    pub custom: Option<CustomProfileConfig>,
    /// `[sampling]` section, if present.
    pub sampling: Option<SamplingConfig>,
    /// All other sections, each describing one uploader instance.
    pub uploaders: Vec<UploaderConfig>,
}

impl Config {
    /// Loads and parses the INI file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let doc = parse_ini(path.as_ref())?;
        let mut config = Config::default();

        if let Some(kv) = doc.sections.get("image") {
            config.image = Some(ImageProfileConfig {
                paths: parse_filepaths("image", kv)?,
                metrics: parse_metric_thresholds("image", kv, IMAGE_METRIC_KEYS)?,
            });
        }
        if let Some(kv) = doc.sections.get("model") {
            config.model = Some(ModelProfileConfig {
                paths: parse_filepaths("model", kv)?,
            });
        }
        if let Some(kv) = doc.sections.get("tracker") {
            config.tracker = Some(TrackerProfileConfig {
                paths: parse_filepaths("tracker", kv)?,
                metrics: parse_metric_thresholds("tracker", kv, TRACKER_METRIC_KEYS)?,
            });
        }
        if let Some(kv) = doc.sections.get("custom") {
            config.custom = Some(CustomProfileConfig {
                paths: parse_filepaths("custom", kv)?,
            });
        }
        if let Some(kv) = doc.sections.get("sampling") {
            config.sampling = Some(SamplingConfig {
                paths: parse_filepaths("sampling", kv)?,
                metrics: parse_metric_thresholds("sampling", kv, SAMPLING_METRIC_KEYS)?,
            });
        }

        for (name, kv) in &doc.sections {
            if FIXED_SECTIONS.contains(&name.as_str()) {
                continue;
            }
            config.uploaders.push(parse_uploader_section(name, kv)?);
        }

        Ok(config)
    }
}

/// Creates `stat_dir` and `data_dir` if they do not already exist.
pub fn ensure_dirs(paths: &FilePaths) -> std::io::Result<()> {
    if !paths.stat_dir.exists() {
        fs::create_dir_all(&paths.stat_dir)?;
    }
    if !paths.data_dir.exists() {
        fs::create_dir_all(&paths.data_dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_image_section_with_thresholds() {
        let file = write_temp(
            "[image]\nfilepath = ./s/, ./d/\nBRIGHTNESS = 200, 255\n; a comment\n",
        );
        let config = Config::load(file.path()).unwrap();
        let image = config.image.expect("image section present");
        assert_eq!(image.paths.stat_dir, PathBuf::from("./s/"));
        assert_eq!(image.paths.data_dir, PathBuf::from("./d/"));
        let threshold = image.metrics.get("BRIGHTNESS").unwrap();
        assert_eq!(threshold.lower, 200.0);
        assert_eq!(threshold.upper, 255.0);
    }

    #[test]
    fn unknown_metric_key_is_ignored_not_fatal() {
        let file = write_temp("[image]\nfilepath = ./s/, ./d/\nUNKNOWNMETRIC = 1, 2\n");
        let config = Config::load(file.path()).unwrap();
        let image = config.image.unwrap();
        assert!(!image.metrics.contains_key("UNKNOWNMETRIC"));
    }

    #[test]
    fn parses_uploader_section_with_parallel_lists() {
        let file = write_temp(
            "[publisher]\nhttp_endpoint = https://example.test/ingest\ntoken = abc\nsensorId = sensor-1\nfolderPath = ./s/, ./d/\nfileType = stat, sample\ndeletedata = true, false\nupload_interval = 30\n",
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.uploaders.len(), 1);
        let uploader = &config.uploaders[0];
        assert_eq!(uploader.folders.len(), 2);
        assert!(uploader.folders[0].delete_after_upload);
        assert!(!uploader.folders[1].delete_after_upload);
        assert_eq!(uploader.interval_seconds, 30);
    }

    #[test]
    fn mismatched_uploader_lists_is_an_error() {
        let file = write_temp(
            "[publisher]\nhttp_endpoint = https://example.test/ingest\ntoken = abc\nsensorId = sensor-1\nfolderPath = ./s/, ./d/\nfileType = stat\ndeletedata = true, false\nupload_interval = 30\n",
        );
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MismatchedLists { .. }));
    }

    #[test]
    fn threshold_is_exceeded_outside_range() {
        let threshold = Threshold {
            lower: 200.0,
            upper: 255.0,
        };
        assert!(threshold.is_exceeded(128.0));
        assert!(!threshold.is_exceeded(210.0));
    }
}
