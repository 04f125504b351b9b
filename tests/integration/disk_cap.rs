//! A stat directory already at its size cap must reject further sketch
//! saves without panicking or corrupting the directory.

use std::collections::HashMap;
use std::time::Duration;

use edge_telemetry::config::{FilePaths, ImageProfileConfig, Threshold};
use edge_telemetry::constants::DEFAULT_MAX_DIR_BYTES;
use edge_telemetry::profiles::ImageProfile;
use image::RgbImage;

#[test]
fn directory_at_cap_drops_new_saves_without_crashing() {
    let dir = tempfile::tempdir().unwrap();
    let stat_dir = dir.path().join("s");
    let data_dir = dir.path().join("d");
    std::fs::create_dir_all(&stat_dir).unwrap();

    let filler = vec![0u8; DEFAULT_MAX_DIR_BYTES as usize];
    std::fs::write(stat_dir.join("filler.bin"), &filler).unwrap();

    let mut metrics = HashMap::new();
    metrics.insert("BRIGHTNESS".to_string(), Threshold { lower: 0.0, upper: 255.0 });

    let config = ImageProfileConfig {
        paths: FilePaths {
            stat_dir: stat_dir.clone(),
            data_dir,
        },
        metrics,
    };

    let mut profile = ImageProfile::new(config, Duration::from_millis(30)).unwrap();
    for _ in 0..100 {
        let img = RgbImage::from_pixel(8, 8, image::Rgb([100, 100, 100]));
        profile.profile(&img, false);
    }

    std::thread::sleep(Duration::from_millis(200));

    assert!(!stat_dir.join("brightness.bin").exists());
    let entries: Vec<_> = std::fs::read_dir(&stat_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
}
