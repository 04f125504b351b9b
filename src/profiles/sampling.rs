//! Sampling profile: uncertainty-driven sample selection from a
//! classifier's probability distribution, grounded on the original
//! source's `ImageSampler` (`src/sampling/imagesampler.cpp`).
//!
//! Each of the four confidence formulas in [`crate::stat_fns`] is
//! independently enabled by its `[sampling]` config key
//! ([`crate::config::SAMPLING_METRIC_KEYS`]); enabling one registers its
//! own quantile sketch (`<name>.bin`, lowercased) at construction, matching
//! the original's `registerStatistics` called once per configured key.

use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tracing::warn;

use crate::config::{SamplingConfig, Threshold};
use crate::constants::DEFAULT_SKETCH_CAPACITY;
use crate::error::TelemetryError;
use crate::registry::SketchRegistry;
use crate::sample::Sample;
use crate::saver::{SaveObject, Saver};
use crate::stat_fns::{entropy_confidence, least_confidence, margin_confidence, ratio_confidence};

/// Computes and persists uncertainty-sampling confidence statistics, and
/// selects samples whose confidence falls outside its configured range.
pub struct SamplingProfile {
    registry: SketchRegistry,
    saver: Saver,
    data_dir: std::path::PathBuf,
    metrics: std::collections::HashMap<String, Threshold>,
}

impl SamplingProfile {
    pub fn new(config: SamplingConfig, save_interval: Duration) -> Result<Self, TelemetryError> {
        crate::config::ensure_dirs(&config.paths).map_err(|source| TelemetryError::Io {
            path: config.paths.stat_dir.display().to_string(),
            source,
        })?;

        let mut registry = SketchRegistry::new();
        let mut saver = Saver::new("SamplingProfile", save_interval);

        for name in config.metrics.keys() {
            let sketch_name = name.to_ascii_lowercase();
            let handle = registry.quantile(&sketch_name, DEFAULT_SKETCH_CAPACITY);
            let path = SketchRegistry::file_path(&config.paths.stat_dir, &sketch_name);
            saver.add_object_to_save(SaveObject::Quantile { path, handle });
        }

        saver.start();

        Ok(SamplingProfile {
            registry,
            saver,
            data_dir: config.paths.data_dir,
            metrics: config.metrics,
        })
    }

    /// Computes every enabled confidence metric over `prob_dist`, updates
    /// its sketch, and - when `save_sample` is true and the metric's
    /// threshold is exceeded - queues `img` for one-shot PNG capture under
    /// that metric's name.
    pub fn sample(&mut self, img: &RgbImage, prob_dist: &[f32], save_sample: bool) {
        for (name, threshold) in self.metrics.clone() {
            let confidence = match name.as_str() {
                "MARGINCONFIDENCE" => margin_confidence(prob_dist),
                "LEASTCONFIDENCE" => least_confidence(prob_dist),
                "RATIOCONFIDENCE" => ratio_confidence(prob_dist),
                "ENTROPYCONFIDENCE" => entropy_confidence(prob_dist),
                _ => None,
            };

            let Some(confidence) = confidence else {
                warn!(metric = name, "confidence undefined for this distribution, skipping update");
                continue;
            };

            let sketch_name = name.to_ascii_lowercase();
            let Some(crate::registry::RegisteredSketch::Quantile(handle)) = self.registry.get(&sketch_name) else {
                continue;
            };
            if let Err(err) = handle.update(confidence) {
                warn!(metric = name, error = %err, "failed to update sketch, skipping");
                continue;
            }

            if save_sample && threshold.is_exceeded(confidence) {
                self.queue_sample(img, &name);
            }
        }
    }

    fn queue_sample(&self, img: &RgbImage, metric: &str) {
        let sample = Sample::new(metric, img.clone());
        match sample.encode_png() {
            Ok(bytes) => {
                let path = self.data_dir.join(sample.file_name());
                self.saver.add_object_to_save(SaveObject::Png {
                    path,
                    bytes: Arc::new(bytes),
                });
            }
            Err(err) => warn!(metric, error = %err, "failed to encode sample, skipping save"),
        }
    }
}
