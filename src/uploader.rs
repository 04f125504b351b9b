//! Background uploader: round-robins over a fixed list of watched folders,
//! archiving and POSTing each in turn, grounded on the original source's
//! `HttpUploader::UploadLoop`/`uploadFolder`/`postFile` - generalized to
//! `reqwest::blocking` multipart requests and the `AtomicBool` + `JoinHandle`
//! shutdown pattern used throughout this crate (see `src/saver.rs`).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::{multipart, Client};
use tracing::{debug, error, info, warn};

use crate::archive::{compress_to_gz, create_tar, empty_folder};
use crate::config::{FolderUploadSpec, UploaderConfig};
use crate::constants::{ARCHIVE_CONTENT_TYPE, ARCHIVE_GZ_SUFFIX, ARCHIVE_TAR_SUFFIX, SHUTDOWN_POLL_INTERVAL, UPLOAD_RETRY_BACKOFF, UPLOAD_RETRY_COUNT};
use crate::error::{ArchiveError, UploadError};
use crate::lock::FolderLock;

/// A single instance's upload worker, cycling over its configured folders.
pub struct Uploader {
    name: String,
    endpoint_url: String,
    token: String,
    sensor_id: String,
    folders: Vec<FolderUploadSpec>,
    interval: Duration,
    cursor: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    client: Client,
}

impl Uploader {
    pub fn new(config: UploaderConfig) -> Self {
        Uploader {
            name: config.name,
            endpoint_url: config.endpoint_url,
            token: config.token,
            sensor_id: config.sensor_id,
            folders: config.folders,
            interval: Duration::from_secs(config.interval_seconds),
            cursor: Arc::new(AtomicUsize::new(0)),
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
            client: Client::new(),
        }
    }

    /// Spawns the worker thread. Idempotent while already running.
    pub fn start(&mut self) {
        if self.handle.is_some() || self.folders.is_empty() {
            return;
        }

        let name = self.name.clone();
        let endpoint_url = self.endpoint_url.clone();
        let token = self.token.clone();
        let sensor_id = self.sensor_id.clone();
        let folders = self.folders.clone();
        let interval = self.interval;
        let cursor = Arc::clone(&self.cursor);
        let stop = Arc::clone(&self.stop);
        let client = self.client.clone();

        self.handle = Some(thread::spawn(move || {
            info!(uploader = %name, "uploader thread started");
            loop {
                if stop.load(Ordering::SeqCst) {
                    break;
                }

                let index = cursor.fetch_add(1, Ordering::SeqCst) % folders.len();
                let spec = &folders[index];
                if let Err(err) = upload_folder(&client, &name, &endpoint_url, &token, &sensor_id, spec) {
                    warn!(uploader = %name, folder = %spec.folder_path.display(), error = %err, "upload cycle failed, logged and skipped");
                }

                if !sleep_interruptible(&stop, interval) {
                    break;
                }
            }
            info!(uploader = %name, "uploader thread stopped");
        }));
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Uploader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sleep_interruptible(stop: &AtomicBool, total: Duration) -> bool {
    let mut slept = Duration::ZERO;
    while slept < total {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let step = SHUTDOWN_POLL_INTERVAL.min(total.saturating_sub(slept));
        thread::sleep(step);
        slept += step;
    }
    true
}

fn upload_folder(
    client: &Client,
    uploader_name: &str,
    endpoint_url: &str,
    token: &str,
    sensor_id: &str,
    spec: &FolderUploadSpec,
) -> Result<(), UploadError> {
    let folder = &spec.folder_path;
    let tar_path = staged_path(folder, ARCHIVE_TAR_SUFFIX);
    let gz_path = staged_path(folder, ARCHIVE_GZ_SUFFIX);

    let _lock = FolderLock::acquire_for_upload(folder)?;

    let result = (|| -> Result<(), UploadError> {
        create_tar(folder, &tar_path).map_err(UploadError::from)?;
        compress_to_gz(&tar_path, &gz_path).map_err(UploadError::from)?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut attempt = 0u32;
        let mut last_status = 0u16;
        loop {
            attempt += 1;
            match post_file(client, endpoint_url, token, sensor_id, &spec.file_type, &gz_path, timestamp) {
                Ok(()) => {
                    debug!(uploader = %uploader_name, folder = %folder.display(), attempt, "upload succeeded");
                    if spec.delete_after_upload {
                        empty_folder(folder).map_err(UploadError::from)?;
                    }
                    return Ok(());
                }
                Err(UploadError::NonSuccess { status, .. }) => {
                    last_status = status;
                }
                Err(other) => return Err(other),
            }

            if attempt >= UPLOAD_RETRY_COUNT {
                return Err(UploadError::NonSuccess {
                    endpoint: endpoint_url.to_string(),
                    attempts: attempt,
                    status: last_status,
                });
            }
            thread::sleep(UPLOAD_RETRY_BACKOFF);
        }
    })();

    cleanup_staged_files(&tar_path, &gz_path);
    result
}

fn staged_path(folder: &PathBuf, suffix: &str) -> PathBuf {
    let trimmed = folder.to_string_lossy().trim_end_matches(['/', '\\']).to_string();
    PathBuf::from(format!("{trimmed}{suffix}"))
}

fn cleanup_staged_files(tar_path: &PathBuf, gz_path: &PathBuf) {
    if tar_path.exists() {
        let _ = std::fs::remove_file(tar_path);
    }
    if gz_path.exists() {
        let _ = std::fs::remove_file(gz_path);
    }
}

fn post_file(
    client: &Client,
    endpoint_url: &str,
    token: &str,
    sensor_id: &str,
    file_type: &str,
    gz_path: &PathBuf,
    timestamp: u64,
) -> Result<(), UploadError> {
    let bytes = std::fs::read(gz_path).map_err(|source| UploadError::Archive(ArchiveError::Compress {
        path: gz_path.display().to_string(),
        source,
    }))?;

    let file_part = multipart::Part::bytes(bytes)
        .file_name(
            gz_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "archive.tar.gz".to_string()),
        )
        .mime_str(ARCHIVE_CONTENT_TYPE)
        .map_err(|source| UploadError::Transport {
            endpoint: endpoint_url.to_string(),
            source,
        })?;

    let form = multipart::Form::new()
        .text("sensor_id", sensor_id.to_string())
        .text("timestamp", timestamp.to_string())
        .text("file_type", file_type.to_string())
        .part("file", file_part);

    let response = client
        .post(endpoint_url)
        .bearer_auth(token)
        .multipart(form)
        .send()
        .map_err(|source| UploadError::Transport {
            endpoint: endpoint_url.to_string(),
            source,
        })?;

    if response.status().is_success() {
        Ok(())
    } else {
        let status = response.status().as_u16();
        error!(endpoint = %endpoint_url, status, "upload attempt received non-success response");
        Err(UploadError::NonSuccess {
            endpoint: endpoint_url.to_string(),
            attempts: 1,
            status,
        })
    }
}
