//! Model profile: per-class confidence sketches and a class-frequency
//! sketch over classification results, grounded on the original source's
//! `ModelProfile`.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::ModelProfileConfig;
use crate::constants::{CLASSIFICATION_FREQUENCY_CAPACITY, CLASSIFICATION_SKETCH_CAPACITY};
use crate::error::TelemetryError;
use crate::registry::SketchRegistry;
use crate::saver::{SaveObject, Saver};
use crate::sketches::FrequencyHandle;

/// One classification result: a confidence score paired with a class id.
pub type ClassificationResult = (f32, i64);

/// Tracks per-class confidence distributions and overall class frequency
/// for a single model.
pub struct ModelProfile {
    model_id: String,
    stat_dir: std::path::PathBuf,
    registry: SketchRegistry,
    class_frequency: FrequencyHandle,
    saver: Saver,
}

impl ModelProfile {
    pub fn new(
        model_id: impl Into<String>,
        config: ModelProfileConfig,
        save_interval: Duration,
    ) -> Result<Self, TelemetryError> {
        crate::config::ensure_dirs(&config.paths).map_err(|source| TelemetryError::Io {
            path: config.paths.stat_dir.display().to_string(),
            source,
        })?;

        let mut saver = Saver::new("ModelProfile", save_interval);
        let class_frequency = FrequencyHandle::new(CLASSIFICATION_FREQUENCY_CAPACITY);
        saver.start();

        Ok(ModelProfile {
            model_id: model_id.into(),
            stat_dir: config.paths.stat_dir,
            registry: SketchRegistry::new(),
            class_frequency,
            saver,
        })
    }

    /// Logs one inference's classification results: each `(score, class)`
    /// pair updates that class's confidence sketch (lazily created on
    /// first sight, matching the original's `model_classes_stat_` map) and
    /// the shared class-frequency sketch. `inference_latency` is accepted
    /// for parity with the upstream call signature but, as in the original,
    /// is not currently persisted to a sketch.
    pub fn log_classification_model_stats(
        &mut self,
        _inference_latency: f32,
        results: &[ClassificationResult],
    ) {
        for &(score, class) in results {
            let metric_name = format!("{}{}", self.model_id, class);
            let is_new = self.registry.get(&metric_name).is_none();
            let handle = self.registry.quantile(&metric_name, CLASSIFICATION_SKETCH_CAPACITY);

            if let Err(err) = handle.update(score) {
                tracing::warn!(class, error = %err, "failed to update class sketch, skipping");
                continue;
            }

            if is_new {
                let path = SketchRegistry::file_path(&self.stat_dir, &metric_name);
                self.saver.add_object_to_save(SaveObject::Quantile { path, handle });
            }

            if let Err(err) = self.class_frequency.update(&class.to_string()) {
                tracing::warn!(class, error = %err, "failed to update class frequency sketch, skipping");
            }
        }
    }

    /// Snapshot of current per-class estimated frequencies.
    pub fn class_frequencies(&self) -> HashMap<String, u64> {
        self.class_frequency.items().into_iter().collect()
    }

    /// Updates the embeddings sketch with a reduced scalar from an
    /// embedding vector (its mean), optionally keyed per class so separate
    /// classes get independent distributions. The sketch file is
    /// `embeddings.bin`, or `embeddings_<class_id>.bin` when `class_id` is
    /// given, lazily created on first call exactly like the per-class
    /// confidence sketches in [`Self::log_classification_model_stats`].
    pub fn log_embeddings(&mut self, values: &[f32], class_id: Option<i64>) {
        if values.is_empty() {
            tracing::warn!("empty embedding vector, skipping update");
            return;
        }
        let mean = values.iter().sum::<f32>() / values.len() as f32;

        let metric_name = match class_id {
            Some(class) => format!("embeddings_{class}"),
            None => "embeddings".to_string(),
        };
        let is_new = self.registry.get(&metric_name).is_none();
        let handle = self.registry.quantile(&metric_name, CLASSIFICATION_SKETCH_CAPACITY);

        if let Err(err) = handle.update(mean) {
            tracing::warn!(metric = %metric_name, error = %err, "failed to update embeddings sketch, skipping");
            return;
        }

        if is_new {
            let path = SketchRegistry::file_path(&self.stat_dir, &metric_name);
            self.saver.add_object_to_save(SaveObject::Quantile { path, handle });
        }
    }
}
