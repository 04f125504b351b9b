//! Logging one inference's classification results and an embedding vector
//! against a `[model]` section produces a quantile sketch file per class
//! plus an embeddings file, each deserialising back to a sketch of n=1.

use std::time::Duration;

use edge_telemetry::config::{FilePaths, ModelProfileConfig};
use edge_telemetry::profiles::ModelProfile;
use edge_telemetry::sketches::QuantileSketch;

fn sketch_count(path: &std::path::Path) -> u64 {
    let bytes = std::fs::read(path).unwrap();
    QuantileSketch::deserialize(bytes.as_slice()).unwrap().count()
}

#[test]
fn classification_and_embeddings_files_appear_within_one_interval() {
    let dir = tempfile::tempdir().unwrap();
    let stat_dir = dir.path().join("s");
    let data_dir = dir.path().join("d");

    let config = ModelProfileConfig {
        paths: FilePaths {
            stat_dir: stat_dir.clone(),
            data_dir,
        },
    };

    let mut model = ModelProfile::new("mdl", config, Duration::from_millis(30)).unwrap();
    model.log_classification_model_stats(0.0, &[(0.9, 0), (0.1, 1)]);
    model.log_embeddings(&[0.2, 0.4, 0.6], None);

    std::thread::sleep(Duration::from_millis(200));

    let mdl0 = stat_dir.join("mdl0.bin");
    let mdl1 = stat_dir.join("mdl1.bin");
    let embeddings = stat_dir.join("embeddings.bin");

    assert!(mdl0.exists(), "expected {}", mdl0.display());
    assert!(mdl1.exists(), "expected {}", mdl1.display());
    assert!(embeddings.exists(), "expected {}", embeddings.display());

    assert_eq!(sketch_count(&mdl0), 1);
    assert_eq!(sketch_count(&mdl1), 1);
    assert_eq!(sketch_count(&embeddings), 1);
}
