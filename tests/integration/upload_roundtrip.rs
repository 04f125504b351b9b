//! Starting an uploader over a folder containing two sketch files produces
//! exactly one multipart POST whose `file` part un-gzips and un-tars to
//! those two files under their original names, and the folder is emptied
//! afterwards.

use std::time::Duration;

use edge_telemetry::archive::{decompress_gz, untar};
use edge_telemetry::config::{FolderUploadSpec, UploaderConfig};
use edge_telemetry::test_utils::{count_files, spawn_mock_server};
use edge_telemetry::uploader::Uploader;

#[test]
fn upload_cycle_ships_exactly_the_folders_files_and_empties_it() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("s");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join("brightness.bin"), b"sketch-a").unwrap();
    std::fs::write(folder.join("sharpness.bin"), b"sketch-b").unwrap();

    let (url, handle) = spawn_mock_server("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");

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
        interval_seconds: 1,
    };

    let mut uploader = Uploader::new(config);
    uploader.start();
    std::thread::sleep(Duration::from_millis(300));
    uploader.stop();

    let body = handle.join().unwrap();
    let body_str = String::from_utf8_lossy(&body);
    assert!(body_str.contains("sensor_id"));
    assert!(body_str.contains("sensor-1"));

    let gz_start = body.windows(2).position(|w| w == [0x1f, 0x8b]).expect("gzip magic in multipart body");
    let gz_tail = &body[gz_start..];
    let gz_path = dir.path().join("captured.tar.gz");
    std::fs::write(&gz_path, gz_tail).unwrap();

    let tar_path = dir.path().join("captured.tar");
    decompress_gz(&gz_path, &tar_path).unwrap();
    let extract_dir = dir.path().join("extracted");
    std::fs::create_dir_all(&extract_dir).unwrap();
    untar(&tar_path, &extract_dir).unwrap();

    assert_eq!(std::fs::read(extract_dir.join("brightness.bin")).unwrap(), b"sketch-a");
    assert_eq!(std::fs::read(extract_dir.join("sharpness.bin")).unwrap(), b"sketch-b");

    assert_eq!(count_files(&folder), 0);
}
