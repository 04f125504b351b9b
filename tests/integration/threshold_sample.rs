//! Profiling a frame whose brightness falls outside a configured threshold,
//! with `save_sample = true`, queues exactly one PNG sample and still
//! updates the underlying sketch with the out-of-range value.

use std::collections::HashMap;
use std::time::Duration;

use edge_telemetry::config::{FilePaths, ImageProfileConfig, Threshold};
use edge_telemetry::profiles::ImageProfile;
use edge_telemetry::sketches::QuantileSketch;
use edge_telemetry::test_utils::count_files;
use image::RgbImage;

#[test]
fn out_of_range_brightness_queues_one_sample_and_updates_sketch() {
    let dir = tempfile::tempdir().unwrap();
    let stat_dir = dir.path().join("s");
    let data_dir = dir.path().join("d");

    let mut metrics = HashMap::new();
    metrics.insert("BRIGHTNESS".to_string(), Threshold { lower: 200.0, upper: 255.0 });

    let config = ImageProfileConfig {
        paths: FilePaths {
            stat_dir: stat_dir.clone(),
            data_dir: data_dir.clone(),
        },
        metrics,
    };

    let mut profile = ImageProfile::new(config, Duration::from_millis(30)).unwrap();
    let grey = RgbImage::from_pixel(16, 16, image::Rgb([128, 128, 128]));
    profile.profile(&grey, true);

    std::thread::sleep(Duration::from_millis(200));

    assert_eq!(count_files(&data_dir), 1);

    let sketch_path = stat_dir.join("brightness.bin");
    assert!(sketch_path.exists());
    let bytes = std::fs::read(&sketch_path).unwrap();
    let sketch = QuantileSketch::deserialize(bytes.as_slice()).unwrap();
    assert_eq!(sketch.quantile(1.0), Some(128.0));
}
