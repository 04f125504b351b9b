//! When the ingest endpoint keeps returning a server error, an upload cycle
//! makes exactly `UPLOAD_RETRY_COUNT` attempts, leaves the folder's data
//! untouched, and leaves no residual `.tar`/`.tar.gz` staging file behind.

use std::time::Duration;

use edge_telemetry::config::{FolderUploadSpec, UploaderConfig};
use edge_telemetry::constants::UPLOAD_RETRY_COUNT;
use edge_telemetry::test_utils::spawn_sequenced_mock_server;
use edge_telemetry::uploader::Uploader;

#[test]
fn failed_upload_retries_then_preserves_data_and_cleans_up_staging() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("s");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join("brightness.bin"), b"sketch-a").unwrap();

    let responses = vec!["HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n"; UPLOAD_RETRY_COUNT as usize];
    let (url, handle) = spawn_sequenced_mock_server(responses);

    let config = UploaderConfig {
        name: "publisher".to_string(),
        endpoint_url: url,
        token: "tok".to_string(),
        sensor_id: "sensor-1".to_string(),
        folders: vec![FolderUploadSpec {
            folder_path: folder.clone(),
            file_type: "stat".to_string(),
            delete_after_upload: true,
        }],
        interval_seconds: 5,
    };

    let mut uploader = Uploader::new(config);
    uploader.start();
    std::thread::sleep(Duration::from_millis(3_500));
    uploader.stop();

    let bodies = handle.join().unwrap();
    assert_eq!(bodies.len(), UPLOAD_RETRY_COUNT as usize);

    assert!(folder.join("brightness.bin").exists());

    let trimmed = folder.to_string_lossy().trim_end_matches(['/', '\\']).to_string();
    assert!(!std::path::Path::new(&format!("{trimmed}_archive_lock.tar")).exists());
    assert!(!std::path::Path::new(&format!("{trimmed}_archive_lock.tar.gz")).exists());
}
