//! Advisory cross-process folder locking.
//!
//! Every watched folder `F` has a companion lock file `F_lock` (or
//! `<trailing-slash-stripped>_lock` if `F` ends in `/`). The Saver and any
//! Uploader instance touching the same folder take an exclusive `flock` on
//! that file before reading or writing the folder's contents, so a save in
//! progress can never be archived half-written and an archive in progress
//! can never be appended to.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{SaveError, UploadError};

/// Derives the lock file path for a watched folder, stripping one trailing
/// path separator first so `"samples/"` and `"samples"` lock the same file.
pub fn lock_path_for(folder: &Path) -> PathBuf {
    let trimmed = folder
        .to_string_lossy()
        .trim_end_matches(['/', '\\'])
        .to_string();
    let mut path = PathBuf::from(trimmed);
    let file_name = path
        .file_name()
        .map(|name| format!("{}{}", name.to_string_lossy(), crate::constants::LOCK_FILE_SUFFIX))
        .unwrap_or_else(|| crate::constants::LOCK_FILE_SUFFIX.trim_start_matches('_').to_string());
    path.set_file_name(file_name);
    path
}

/// A held exclusive lock on a folder. Unlocks (and the underlying file
/// handle closes) on drop.
pub struct FolderLock {
    _file: File,
}

impl FolderLock {
    /// Blocks until an exclusive lock on `folder`'s lock file is acquired.
    pub fn acquire_for_save(folder: &Path) -> Result<Self, SaveError> {
        let path = lock_path_for(folder);
        let file = open_lock_file(&path).map_err(|source| SaveError::Lock {
            path: path.display().to_string(),
            source,
        })?;
        file.lock_exclusive().map_err(|source| SaveError::Lock {
            path: path.display().to_string(),
            source,
        })?;
        Ok(FolderLock { _file: file })
    }

    /// Blocks until an exclusive lock on `folder`'s lock file is acquired,
    /// for the upload path (same lock file, different error variant so
    /// callers can tell which subsystem failed to acquire it).
    pub fn acquire_for_upload(folder: &Path) -> Result<Self, UploadError> {
        let path = lock_path_for(folder);
        let file = open_lock_file(&path).map_err(|source| UploadError::Lock {
            path: path.display().to_string(),
            source,
        })?;
        file.lock_exclusive().map_err(|source| UploadError::Lock {
            path: path.display().to_string(),
            source,
        })?;
        Ok(FolderLock { _file: file })
    }
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).write(true).open(path)
}

impl Drop for FolderLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self._file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_strips_trailing_slash() {
        let with_slash = lock_path_for(Path::new("/data/samples/"));
        let without_slash = lock_path_for(Path::new("/data/samples"));
        assert_eq!(with_slash, without_slash);
        assert_eq!(with_slash.file_name().unwrap(), "samples_lock");
    }

    #[test]
    fn acquiring_twice_sequentially_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _lock = FolderLock::acquire_for_save(dir.path()).unwrap();
        }
        let _lock = FolderLock::acquire_for_save(dir.path()).unwrap();
    }

    #[test]
    fn lock_file_is_created_next_to_folder() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("watched");
        std::fs::create_dir_all(&folder).unwrap();
        let _lock = FolderLock::acquire_for_save(&folder).unwrap();
        assert!(dir.path().join("watched_lock").exists());
    }
}
