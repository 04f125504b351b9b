//! Image quality profile: noise/brightness/sharpness/mean/histogram
//! statistics over inference input frames, grounded on the original
//! source's `ImageProfile`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tracing::warn;

use crate::config::ImageProfileConfig;
use crate::constants::DEFAULT_SKETCH_CAPACITY;
use crate::error::TelemetryError;
use crate::registry::SketchRegistry;
use crate::sample::Sample;
use crate::saver::{SaveObject, Saver};
use crate::stat_fns::{calculate_brightness, calculate_sharpness_laplacian, calculate_snr, channel_means};

const CHANNELS: usize = 3;

/// Computes and persists image-quality statistics for each inference frame.
pub struct ImageProfile {
    registry: SketchRegistry,
    saver: Saver,
    stat_dir: PathBuf,
    data_dir: PathBuf,
    metrics: std::collections::HashMap<String, crate::config::Threshold>,
}

impl ImageProfile {
    pub fn new(config: ImageProfileConfig, save_interval: Duration) -> Result<Self, TelemetryError> {
        crate::config::ensure_dirs(&config.paths).map_err(|source| TelemetryError::Io {
            path: config.paths.stat_dir.display().to_string(),
            source,
        })?;

        let mut registry = SketchRegistry::new();
        let mut saver = Saver::new("ImageProfile", save_interval);

        for name in config.metrics.keys() {
            match name.as_str() {
                "NOISE" => register_scalar(&mut registry, &mut saver, &config.paths.stat_dir, "noise"),
                "BRIGHTNESS" => register_scalar(&mut registry, &mut saver, &config.paths.stat_dir, "brightness"),
                "SHARPNESS" => register_scalar(&mut registry, &mut saver, &config.paths.stat_dir, "sharpness"),
                "MEAN" => {
                    for i in 0..CHANNELS {
                        register_scalar(&mut registry, &mut saver, &config.paths.stat_dir, &format!("mean_{i}"));
                    }
                }
                "HISTOGRAM" => {
                    for i in 0..CHANNELS {
                        register_scalar(&mut registry, &mut saver, &config.paths.stat_dir, &format!("pixel_{i}"));
                    }
                }
                other => warn!(metric = other, "unrecognized image metric, ignoring"),
            }
        }

        saver.start();

        Ok(ImageProfile {
            registry,
            saver,
            stat_dir: config.paths.stat_dir,
            data_dir: config.paths.data_dir,
            metrics: config.metrics,
        })
    }

    /// Computes every configured statistic for `img`, updates its sketch,
    /// and - when `save_sample` is true and the metric's threshold is
    /// exceeded - queues the frame for one-shot PNG capture.
    ///
    /// Per the error handling design, domain errors here (an empty frame, a
    /// flat image with undefined SNR) are logged and skip that metric; they
    /// never abort the whole call, and this method never stops the saver.
    pub fn profile(&mut self, img: &RgbImage, save_sample: bool) {
        for (name, threshold) in self.metrics.clone() {
            match name.as_str() {
                "NOISE" => self.score_and_maybe_save(img, "noise", &name, calculate_snr(img), threshold, save_sample),
                "BRIGHTNESS" => self.score_and_maybe_save(img, "brightness", &name, calculate_brightness(img), threshold, save_sample),
                "SHARPNESS" => self.score_and_maybe_save(img, "sharpness", &name, calculate_sharpness_laplacian(img), threshold, save_sample),
                "MEAN" => self.update_means(img),
                "HISTOGRAM" => self.update_histogram(img),
                _ => {}
            }
        }
    }

    /// `metric` is the lowercased registry/sketch-file key (e.g.
    /// `"brightness"`); `raw_name` is the verbatim config key (e.g.
    /// `"BRIGHTNESS"`) used to name the saved sample file, matching the
    /// original source's `saveImageWithTimestamp` call sites, which pass the
    /// config key through unchanged rather than the lowercased sketch name.
    fn score_and_maybe_save(
        &mut self,
        img: &RgbImage,
        metric: &str,
        raw_name: &str,
        score: Option<f32>,
        threshold: crate::config::Threshold,
        save_sample: bool,
    ) {
        let Some(score) = score else {
            warn!(metric, "metric undefined for this frame, skipping update");
            return;
        };

        let Some(crate::registry::RegisteredSketch::Quantile(handle)) = self.registry.get(metric) else {
            return;
        };
        if let Err(err) = handle.update(score) {
            warn!(metric, error = %err, "failed to update sketch, skipping");
            return;
        }

        if save_sample && threshold.is_exceeded(score) {
            self.queue_sample(img, raw_name);
        }
    }

    fn update_means(&mut self, img: &RgbImage) {
        let Some(means) = channel_means(img) else {
            warn!("empty frame, skipping mean update");
            return;
        };
        for (i, value) in means.into_iter().enumerate() {
            if let Some(crate::registry::RegisteredSketch::Quantile(handle)) =
                self.registry.get(&format!("mean_{i}"))
            {
                let _ = handle.update(value);
            }
        }
    }

    fn update_histogram(&mut self, img: &RgbImage) {
        for pixel in img.pixels() {
            for channel in 0..CHANNELS {
                if let Some(crate::registry::RegisteredSketch::Quantile(handle)) =
                    self.registry.get(&format!("pixel_{channel}"))
                {
                    let _ = handle.update(pixel[channel] as f32);
                }
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

fn register_scalar(registry: &mut SketchRegistry, saver: &mut Saver, stat_dir: &std::path::Path, name: &str) {
    let handle = registry.quantile(name, DEFAULT_SKETCH_CAPACITY);
    let path = SketchRegistry::file_path(stat_dir, name);
    saver.add_object_to_save(SaveObject::Quantile { path, handle });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilePaths, Threshold};
    use std::collections::HashMap;

    fn test_config(dir: &std::path::Path) -> ImageProfileConfig {
        let mut metrics = HashMap::new();
        metrics.insert("BRIGHTNESS".to_string(), Threshold { lower: 50.0, upper: 200.0 });
        ImageProfileConfig {
            paths: FilePaths {
                stat_dir: dir.join("stats"),
                data_dir: dir.join("data"),
            },
            metrics,
        }
    }

    #[test]
    fn profile_updates_brightness_sketch() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut profile = ImageProfile::new(config, Duration::from_secs(60)).unwrap();

        let img = RgbImage::from_pixel(8, 8, image::Rgb([10, 10, 10]));
        profile.profile(&img, false);

        if let Some(crate::registry::RegisteredSketch::Quantile(handle)) = profile.registry.get("brightness") {
            assert_eq!(handle.quantile(1.0).unwrap(), Some(10.0));
        } else {
            panic!("brightness sketch missing");
        }
    }

    #[test]
    fn out_of_range_brightness_with_save_sample_queues_png() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut profile = ImageProfile::new(config, Duration::from_secs(60)).unwrap();

        let img = RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
        profile.profile(&img, true);
        profile.saver.trigger_save();
        std::thread::sleep(Duration::from_millis(150));

        let mut entries = std::fs::read_dir(dir.path().join("data")).unwrap();
        let sample = entries.next().unwrap().unwrap();
        assert!(entries.next().is_none());
        let file_name = sample.file_name();
        let file_name = file_name.to_string_lossy();
        assert!(
            file_name.starts_with("BRIGHTNESS_"),
            "expected sample file to be named after the raw config key, got '{file_name}'"
        );
    }
}
