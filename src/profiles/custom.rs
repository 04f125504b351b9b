//! Custom profile: arbitrary named scalar statistics, not a fixed
//! vocabulary, grounded on the original source's `CustomProfile`.
//!
//! Unlike the image/tracker profiles, enablement isn't driven by config
//! keys - any name the caller passes to [`CustomProfile::profile`] gets its
//! own quantile sketch, lazily created on first sight and registered with
//! the saver under `<stat_dir>/<name>.bin`.

use std::time::Duration;

use crate::config::CustomProfileConfig;
use crate::constants::DEFAULT_SKETCH_CAPACITY;
use crate::error::TelemetryError;
use crate::registry::SketchRegistry;
use crate::saver::{SaveObject, Saver};

/// Tracks an open-ended set of named scalar statistics, each backed by its
/// own quantile sketch.
pub struct CustomProfile {
    stat_dir: std::path::PathBuf,
    registry: SketchRegistry,
    saver: Saver,
}

impl CustomProfile {
    pub fn new(config: CustomProfileConfig, save_interval: Duration) -> Result<Self, TelemetryError> {
        crate::config::ensure_dirs(&config.paths).map_err(|source| TelemetryError::Io {
            path: config.paths.stat_dir.display().to_string(),
            source,
        })?;

        let mut saver = Saver::new("CustomProfile", save_interval);
        saver.start();

        Ok(CustomProfile {
            stat_dir: config.paths.stat_dir,
            registry: SketchRegistry::new(),
            saver,
        })
    }

    /// Updates the named statistic's sketch, creating it (and registering
    /// it with the saver) on first sight, mirroring the original source's
    /// `getBox` lazily-create-on-miss behavior.
    pub fn profile(&mut self, name: &str, value: f32) {
        let is_new = self.registry.get(name).is_none();
        let handle = self.registry.quantile(name, DEFAULT_SKETCH_CAPACITY);

        if let Err(err) = handle.update(value) {
            tracing::warn!(metric = name, error = %err, "failed to update custom sketch, skipping");
            return;
        }

        if is_new {
            let path = SketchRegistry::file_path(&self.stat_dir, name);
            self.saver.add_object_to_save(SaveObject::Quantile { path, handle });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilePaths;

    fn test_config(dir: &std::path::Path) -> CustomProfileConfig {
        CustomProfileConfig {
            paths: FilePaths {
                stat_dir: dir.join("stats"),
                data_dir: dir.join("stats"),
            },
        }
    }

    #[test]
    fn profile_creates_sketch_on_first_sight() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = CustomProfile::new(test_config(dir.path()), Duration::from_secs(60)).unwrap();
        profile.profile("queue_depth", 4.0);

        if let Some(crate::registry::RegisteredSketch::Quantile(handle)) = profile.registry.get("queue_depth") {
            assert_eq!(handle.quantile(1.0).unwrap(), Some(4.0));
        } else {
            panic!("custom statistic missing");
        }
    }

    #[test]
    fn repeated_profile_calls_reuse_the_same_sketch() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = CustomProfile::new(test_config(dir.path()), Duration::from_secs(60)).unwrap();
        profile.profile("latency_ms", 1.0);
        profile.profile("latency_ms", 3.0);

        if let Some(crate::registry::RegisteredSketch::Quantile(handle)) = profile.registry.get("latency_ms") {
            assert_eq!(handle.quantile(1.0).unwrap(), Some(3.0));
        } else {
            panic!("custom statistic missing");
        }
    }

    #[test]
    fn independent_names_get_independent_sketches() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = CustomProfile::new(test_config(dir.path()), Duration::from_secs(60)).unwrap();
        profile.profile("a", 1.0);
        profile.profile("b", 2.0);

        assert!(profile.registry.get("a").is_some());
        assert!(profile.registry.get("b").is_some());
    }
}
