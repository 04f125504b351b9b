//! Folder archiving: collecting watched files, tarring, gzip-compressing,
//! and clearing a folder after a successful upload.
//!
//! A folder's advisory lock file (anything with `_lock` in its name) is
//! never swept into its own archive and never deleted by [`empty_folder`] -
//! the lock file's lifetime is independent of the data it guards.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder};

use crate::error::ArchiveError;

fn is_lock_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains("_lock"))
}

/// Recursively collects every regular file under `folder`, excluding lock
/// and staged-archive artifacts.
pub fn collect_files_from_folder(folder: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut files = Vec::new();
    walk(folder, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ArchiveError> {
    let entries = fs::read_dir(dir).map_err(|source| ArchiveError::Walk {
        path: dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ArchiveError::Walk {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if is_lock_artifact(&path) {
            continue;
        }

        let file_type = entry.file_type().map_err(|source| ArchiveError::Walk {
            path: path.display().to_string(),
            source,
        })?;

        if file_type.is_dir() {
            walk(&path, out)?;
        } else if file_type.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// Builds a tar archive at `tar_path` containing every non-lock file under
/// `folder`, with entry names relative to `folder`.
pub fn create_tar(folder: &Path, tar_path: &Path) -> Result<(), ArchiveError> {
    let files = collect_files_from_folder(folder)?;

    let tar_file = File::create(tar_path).map_err(|source| ArchiveError::TarFinish {
        path: tar_path.display().to_string(),
        source,
    })?;
    let mut builder = Builder::new(BufWriter::new(tar_file));

    for file_path in &files {
        let relative = file_path.strip_prefix(folder).unwrap_or(file_path);
        builder
            .append_path_with_name(file_path, relative)
            .map_err(|source| ArchiveError::TarAppend {
                path: file_path.display().to_string(),
                source,
            })?;
    }

    builder
        .into_inner()
        .map_err(|source| ArchiveError::TarFinish {
            path: tar_path.display().to_string(),
            source,
        })?;
    Ok(())
}

/// Gzip-compresses `tar_path` into `gz_path`, then removes the intermediate
/// tar file.
pub fn compress_to_gz(tar_path: &Path, gz_path: &Path) -> Result<(), ArchiveError> {
    let tar_file = File::open(tar_path).map_err(|source| ArchiveError::Compress {
        path: tar_path.display().to_string(),
        source,
    })?;
    let gz_file = File::create(gz_path).map_err(|source| ArchiveError::Compress {
        path: gz_path.display().to_string(),
        source,
    })?;

    let mut reader = BufReader::new(tar_file);
    let mut encoder = GzEncoder::new(gz_file, Compression::default());
    std::io::copy(&mut reader, &mut encoder).map_err(|source| ArchiveError::Compress {
        path: gz_path.display().to_string(),
        source,
    })?;
    encoder.finish().map_err(|source| ArchiveError::Compress {
        path: gz_path.display().to_string(),
        source,
    })?;

    fs::remove_file(tar_path).map_err(|source| ArchiveError::Compress {
        path: tar_path.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Decompresses a `.tar.gz` archive at `gz_path` into a plain tar at
/// `tar_path`. Used by round-trip verification tests.
pub fn decompress_gz(gz_path: &Path, tar_path: &Path) -> Result<(), ArchiveError> {
    let gz_file = File::open(gz_path).map_err(|source| ArchiveError::Decompress {
        path: gz_path.display().to_string(),
        source,
    })?;
    let tar_file = File::create(tar_path).map_err(|source| ArchiveError::Decompress {
        path: tar_path.display().to_string(),
        source,
    })?;

    let mut decoder = GzDecoder::new(gz_file);
    let mut writer = BufWriter::new(tar_file);
    std::io::copy(&mut decoder, &mut writer).map_err(|source| ArchiveError::Decompress {
        path: gz_path.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Extracts a plain tar archive into `dest_dir`. Used by round-trip
/// verification tests.
pub fn untar(tar_path: &Path, dest_dir: &Path) -> Result<(), ArchiveError> {
    let tar_file = File::open(tar_path).map_err(|source| ArchiveError::Decompress {
        path: tar_path.display().to_string(),
        source,
    })?;
    let mut archive = Archive::new(BufReader::new(tar_file));
    archive
        .unpack(dest_dir)
        .map_err(|source| ArchiveError::Decompress {
            path: tar_path.display().to_string(),
            source,
        })?;
    Ok(())
}

/// Removes every non-lock regular file under `folder` after a successful
/// upload, preserving the directory structure and the lock file itself.
pub fn empty_folder(folder: &Path) -> Result<(), ArchiveError> {
    let files = collect_files_from_folder(folder)?;
    for file_path in files {
        fs::remove_file(&file_path).map_err(|source| ArchiveError::Empty {
            path: file_path.display().to_string(),
            source,
        })?;
    }
    Ok(())
}
