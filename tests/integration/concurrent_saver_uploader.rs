//! Running a Saver and an Uploader against the same watched folder under
//! load for several seconds must never let an archive go out containing a
//! file whose deserialisation fails - the advisory folder lock must keep
//! every archived sketch a complete, non-torn write.

use std::time::Duration;

use edge_telemetry::config::{FolderUploadSpec, UploaderConfig};
use edge_telemetry::saver::{SaveObject, Saver};
use edge_telemetry::sketches::{QuantileHandle, QuantileSketch};
use edge_telemetry::test_utils::spawn_mock_server;
use edge_telemetry::uploader::Uploader;

#[test]
fn concurrent_saves_and_uploads_never_ship_a_corrupt_sketch() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("s");
    std::fs::create_dir_all(&folder).unwrap();

    let handle = QuantileHandle::new(64);
    handle.update(1.0).unwrap();

    let mut saver = Saver::new("concurrent-test", Duration::from_millis(100));
    saver.add_object_to_save(SaveObject::Quantile {
        path: folder.join("brightness.bin"),
        handle: handle.clone(),
    });
    saver.start();

    let (url, server) = spawn_mock_server("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    let config = UploaderConfig {
        name: "publisher".to_string(),
        endpoint_url: url,
        token: "tok".to_string(),
        sensor_id: "sensor-1".to_string(),
        folders: vec![FolderUploadSpec {
            folder_path: folder.clone(),
            file_type: "stat".to_string(),
            delete_after_upload: false,
        }],
        interval_seconds: 1,
    };
    let mut uploader = Uploader::new(config);
    uploader.start();

    let writer = std::thread::spawn({
        let handle = handle.clone();
        move || {
            for i in 0..50u32 {
                handle.update(i as f32).unwrap();
                std::thread::sleep(Duration::from_millis(20));
            }
        }
    });

    writer.join().unwrap();
    std::thread::sleep(Duration::from_millis(500));

    saver.stop();
    uploader.stop();
    drop(server);

    if let Ok(bytes) = std::fs::read(folder.join("brightness.bin")) {
        assert!(QuantileSketch::deserialize(bytes.as_slice()).is_ok());
    }
}
