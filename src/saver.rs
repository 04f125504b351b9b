//! Background saver: a FIFO/circular queue of save jobs drained by a
//! dedicated worker thread, the way the original source's `Saver` class
//! drives `SaveLoop` - generalized here to a tagged `SaveObject` enum
//! instead of a `void*`/type-tag pair, and to the `AtomicBool` + `JoinHandle`
//! shutdown pattern a `StatusRefresher`-style worker uses instead of a
//! condition variable.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::constants::{DEFAULT_MAX_DIR_BYTES, SHUTDOWN_POLL_INTERVAL, SaveKind};
use crate::error::SaveError;
use crate::lock::FolderLock;
use crate::sketches::{FrequencyHandle, QuantileHandle};

/// A single object the saver knows how to (re-)serialize to disk.
#[derive(Clone)]
pub enum SaveObject {
    Quantile { path: PathBuf, handle: QuantileHandle },
    Frequency { path: PathBuf, handle: FrequencyHandle },
    Png { path: PathBuf, bytes: Arc<Vec<u8>> },
}

impl SaveObject {
    pub fn kind(&self) -> SaveKind {
        match self {
            SaveObject::Quantile { .. } => SaveKind::QuantileSketch,
            SaveObject::Frequency { .. } => SaveKind::FrequencySketch,
            SaveObject::Png { .. } => SaveKind::PngImage,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SaveObject::Quantile { path, .. } => path,
            SaveObject::Frequency { path, .. } => path,
            SaveObject::Png { path, .. } => path,
        }
    }

    fn write(&self) -> Result<(), SaveError> {
        match self {
            SaveObject::Quantile { path, handle } => handle
                .serialize_to_file(path)
                .map_err(|_| SaveError::Write {
                    path: path.display().to_string(),
                    source: std::io::Error::other("sketch handle lock poisoned"),
                }),
            SaveObject::Frequency { path, handle } => handle
                .serialize_to_file(path)
                .map_err(|_| SaveError::Write {
                    path: path.display().to_string(),
                    source: std::io::Error::other("sketch handle lock poisoned"),
                }),
            SaveObject::Png { path, bytes } => {
                fs::write(path, bytes.as_slice()).map_err(|source| SaveError::Write {
                    path: path.display().to_string(),
                    source,
                })
            }
        }
    }
}

fn directory_size(dir: &Path) -> u64 {
    let mut total = 0u64;
    let Ok(entries) = fs::read_dir(dir) else {
        return total;
    };
    for entry in entries.flatten() {
        if let Ok(file_type) = entry.file_type() {
            if file_type.is_dir() {
                total += directory_size(&entry.path());
            } else if let Ok(metadata) = entry.metadata() {
                total += metadata.len();
            }
        }
    }
    total
}

/// Background worker draining a queue of [`SaveObject`] jobs at a fixed
/// interval, plus an on-demand trigger.
pub struct Saver {
    name: String,
    queue: Arc<Mutex<VecDeque<SaveObject>>>,
    max_dir_bytes: u64,
    interval: Duration,
    stop: Arc<AtomicBool>,
    wake: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Saver {
    /// Creates a saver that is not yet running. Call [`Self::start`] to
    /// spawn its worker thread.
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Saver {
            name: name.into(),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            max_dir_bytes: DEFAULT_MAX_DIR_BYTES,
            interval,
            stop: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn with_max_dir_bytes(mut self, max_dir_bytes: u64) -> Self {
        self.max_dir_bytes = max_dir_bytes;
        self
    }

    /// Enqueues an object for the worker thread to (re-)save. Safe to call
    /// whether or not the saver has been started yet.
    pub fn add_object_to_save(&self, object: SaveObject) {
        let path = object.path().display().to_string();
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(object);
        }
        debug!(saver = %self.name, path = %path, "added object into saver queue");
    }

    /// Requests an immediate pass over the queue without waiting for the
    /// next interval tick.
    pub fn trigger_save(&self) {
        self.wake.store(true, Ordering::SeqCst);
        debug!(saver = %self.name, "save trigger requested");
    }

    /// Spawns the worker thread. Idempotent: calling it again while already
    /// running is a no-op.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        let queue = Arc::clone(&self.queue);
        let stop = Arc::clone(&self.stop);
        let wake = Arc::clone(&self.wake);
        let max_dir_bytes = self.max_dir_bytes;
        let interval = self.interval;
        let name = self.name.clone();

        self.handle = Some(thread::spawn(move || {
            info!(saver = %name, "saver thread started");
            loop {
                if stop.load(Ordering::SeqCst) {
                    break;
                }

                run_pass(&name, &queue, max_dir_bytes);

                if !sleep_interruptible(&stop, &wake, interval) {
                    break;
                }
            }
            info!(saver = %name, "saver thread stopped");
        }));
    }

    /// Signals the worker thread to stop and joins it. Bounds shutdown
    /// latency to roughly [`SHUTDOWN_POLL_INTERVAL`] plus one in-flight
    /// pass over the queue.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Saver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sleep_interruptible(stop: &AtomicBool, wake: &AtomicBool, total: Duration) -> bool {
    let mut slept = Duration::ZERO;
    while slept < total {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        if wake.swap(false, Ordering::SeqCst) {
            return true;
        }
        let step = SHUTDOWN_POLL_INTERVAL.min(total.saturating_sub(slept));
        thread::sleep(step);
        slept += step;
    }
    true
}

/// Runs one circular pass over the queue: every entry is attempted once per
/// pass, one-shot kinds (PNG samples) are removed on success, rotating
/// kinds (sketches) are rotated to the back so the next pass revisits them.
fn run_pass(name: &str, queue: &Arc<Mutex<VecDeque<SaveObject>>>, max_dir_bytes: u64) {
    let len = match queue.lock() {
        Ok(q) => q.len(),
        Err(_) => {
            error!(saver = %name, "save queue mutex poisoned, skipping pass");
            return;
        }
    };

    for _ in 0..len {
        let object = {
            let mut q = match queue.lock() {
                Ok(q) => q,
                Err(_) => {
                    error!(saver = %name, "save queue mutex poisoned mid-pass");
                    return;
                }
            };
            match q.pop_front() {
                Some(object) => object,
                None => return,
            }
        };

        let one_shot = object.kind().is_one_shot();
        if let Err(err) = save_one(name, &object, max_dir_bytes) {
            warn!(saver = %name, kind = object.kind().as_ref(), path = %object.path().display(), error = %err, "save failed, object logged and skipped");
        }

        if !one_shot {
            if let Ok(mut q) = queue.lock() {
                q.push_back(object);
            }
        }
    }
}

fn save_one(name: &str, object: &SaveObject, max_dir_bytes: u64) -> Result<(), SaveError> {
    let path = object.path();
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(base_dir).map_err(|source| SaveError::CreateDir {
        path: base_dir.display().to_string(),
        source,
    })?;

    if directory_size(base_dir) >= max_dir_bytes {
        debug!(saver = %name, dir = %base_dir.display(), "directory at capacity, skipping save this pass");
        return Ok(());
    }

    let _lock = FolderLock::acquire_for_save(base_dir)?;
    object.write()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketches::QuantileHandle;

    #[test]
    fn queued_sketch_is_rotated_not_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brightness.bin");
        let handle = QuantileHandle::new(16);
        handle.update(0.5).unwrap();

        let mut saver = Saver::new("test", Duration::from_millis(20));
        saver.add_object_to_save(SaveObject::Quantile {
            path: path.clone(),
            handle,
        });
        saver.start();
        saver.trigger_save();
        thread::sleep(Duration::from_millis(100));
        saver.stop();

        assert!(path.exists());
    }

    #[test]
    fn one_shot_png_is_removed_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise_123.png");

        let mut saver = Saver::new("test", Duration::from_millis(20));
        saver.add_object_to_save(SaveObject::Png {
            path: path.clone(),
            bytes: Arc::new(vec![0x89, b'P', b'N', b'G']),
        });
        saver.start();
        saver.trigger_save();
        thread::sleep(Duration::from_millis(100));

        assert_eq!(saver.queue.lock().unwrap().len(), 0);
        saver.stop();
        assert!(path.exists());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut saver = Saver::new("test", Duration::from_secs(5));
        saver.start();
        saver.stop();
        saver.stop();
    }

    #[test]
    fn directory_over_cap_skips_save() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("filler.bin"), vec![0u8; 64]).unwrap();

        let path = dir.path().join("brightness.bin");
        let handle = QuantileHandle::new(16);
        handle.update(1.0).unwrap();

        let saver = Saver::new("test", Duration::from_secs(5)).with_max_dir_bytes(32);
        saver.add_object_to_save(SaveObject::Quantile { path: path.clone(), handle });
        let object = saver.queue.lock().unwrap().pop_front().unwrap();
        save_one("test", &object, 32).unwrap();

        assert!(!path.exists());
    }
}
