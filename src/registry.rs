//! Per-profile sketch registry: maps a metric name to its backing sketch.
//!
//! Each profile (image, model, tracker, custom, sampling) owns one
//! `SketchRegistry` and looks up or lazily creates sketches by metric name,
//! mirroring the original source's per-profile `registerStatistics` step.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::sketches::{FrequencyHandle, QuantileHandle};

/// A named sketch of either supported kind, as tracked by a profile's
/// registry.
#[derive(Debug, Clone)]
pub enum RegisteredSketch {
    Quantile(QuantileHandle),
    Frequency(FrequencyHandle),
}

/// Maps metric names to their backing sketches for a single profile.
#[derive(Debug, Clone, Default)]
pub struct SketchRegistry {
    sketches: HashMap<String, RegisteredSketch>,
}

impl SketchRegistry {
    pub fn new() -> Self {
        SketchRegistry {
            sketches: HashMap::new(),
        }
    }

    /// Registers a quantile sketch under `name` if one isn't already
    /// registered, and returns its handle either way.
    pub fn quantile(&mut self, name: &str, capacity: usize) -> QuantileHandle {
        match self
            .sketches
            .entry(name.to_string())
            .or_insert_with(|| RegisteredSketch::Quantile(QuantileHandle::new(capacity)))
        {
            RegisteredSketch::Quantile(handle) => handle.clone(),
            RegisteredSketch::Frequency(_) => {
                unreachable!("metric '{name}' already registered as a frequency sketch")
            }
        }
    }

    /// Registers a frequency sketch under `name` if one isn't already
    /// registered, and returns its handle either way.
    pub fn frequency(&mut self, name: &str, capacity: usize) -> FrequencyHandle {
        match self
            .sketches
            .entry(name.to_string())
            .or_insert_with(|| RegisteredSketch::Frequency(FrequencyHandle::new(capacity)))
        {
            RegisteredSketch::Frequency(handle) => handle.clone(),
            RegisteredSketch::Quantile(_) => {
                unreachable!("metric '{name}' already registered as a quantile sketch")
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredSketch> {
        self.sketches.get(name)
    }

    /// Names of every currently registered metric, in registration order is
    /// not guaranteed - callers that need a stable save-file path should key
    /// off the name itself, not enumeration order.
    pub fn metric_names(&self) -> Vec<String> {
        self.sketches.keys().cloned().collect()
    }

    /// Resolves the on-disk path a given metric's sketch file would be
    /// saved to under `stat_dir`, mirroring `<metric>.bin` naming.
    pub fn file_path(stat_dir: &Path, metric_name: &str) -> PathBuf {
        stat_dir.join(format!("{metric_name}.bin"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_returns_the_same_handle() {
        let mut registry = SketchRegistry::new();
        let a = registry.quantile("brightness", 200);
        let b = registry.quantile("brightness", 200);
        a.update(1.0).unwrap();
        assert_eq!(b.quantile(1.0).unwrap(), Some(1.0));
    }

    #[test]
    fn file_path_uses_bin_extension() {
        let path = SketchRegistry::file_path(Path::new("/data/stats"), "sharpness");
        assert_eq!(path, Path::new("/data/stats/sharpness.bin"));
    }
}
