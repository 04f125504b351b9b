//! Error handling for the telemetry engine.
use thiserror::Error;

/// Top-level error type surfaced from fallible, non-hot-path operations
/// (construction, explicit saves, archive/upload cycles).
///
/// Per the error handling design: construction failures are fatal to the
/// owning profile/uploader instance only. Everything encountered on the
/// inference hot path (`profile()`, `log_*()`) is caught, logged, and
/// absorbed instead of surfacing here.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Error loading or parsing the INI configuration file.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error constructing or updating a sketch.
    #[error(transparent)]
    Sketch(#[from] SketchError),

    /// Error in the background saver.
    #[error(transparent)]
    Save(#[from] SaveError),

    /// Error building or extracting an archive.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Error in the upload path.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Generic filesystem failure not covered by a more specific variant.
    #[error("filesystem error at '{path}': {source}")]
    Io {
        /// Path the operation was attempted on.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A shared mutex was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<std::sync::PoisonError<T>> for TelemetryError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        TelemetryError::LockPoisoned(err.to_string())
    }
}

/// Errors raised while loading or interpreting the INI configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Path of the config file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file contained a line outside the supported INI subset.
    #[error("malformed config line {line}: '{content}'")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// Raw line content.
        content: String,
    },

    /// A required key was missing from a section.
    #[error("section '{section}' is missing required key '{key}'")]
    MissingKey {
        /// Section name.
        section: String,
        /// Missing key.
        key: String,
    },

    /// A key expected to carry two comma-separated thresholds did not.
    #[error("key '{key}' in section '{section}' must have the form 'lower, upper': '{value}'")]
    MalformedThreshold {
        /// Section name.
        section: String,
        /// Key name.
        key: String,
        /// Raw value.
        value: String,
    },

    /// A numeric value failed to parse.
    #[error("invalid numeric value for '{key}': '{value}'")]
    InvalidNumber {
        /// Key name.
        key: String,
        /// Raw value.
        value: String,
    },

    /// Parallel uploader list keys (`folderPath`/`fileType`/`deletedata`) had
    /// mismatched lengths.
    #[error("uploader section '{section}' has mismatched list lengths for folderPath/fileType/deletedata")]
    MismatchedLists {
        /// Section name.
        section: String,
    },
}

/// Errors raised by sketch construction, update, or (de)serialization.
#[derive(Debug, Error)]
pub enum SketchError {
    /// The serialized blob's magic bytes did not match.
    #[error("bad sketch magic bytes")]
    BadMagic,

    /// The serialized blob's version is not supported by this build.
    #[error("unsupported sketch format version {0}")]
    UnsupportedVersion(u8),

    /// The blob was truncated or otherwise malformed.
    #[error("corrupt sketch data: {0}")]
    Corrupt(String),

    /// I/O error while reading or writing a sketch blob.
    #[error("sketch I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the background saver.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Failed to create the target directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Directory path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to acquire the advisory folder lock.
    #[error("failed to acquire lock on '{path}': {source}")]
    Lock {
        /// Lock file path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the serialized object.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// Destination path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Sketch serialization failed.
    #[error(transparent)]
    Sketch(#[from] SketchError),

    /// Image encoding failed.
    #[error("failed to encode image '{path}': {source}")]
    ImageEncode {
        /// Destination path.
        path: String,
        /// Underlying image-crate error.
        #[source]
        source: image::ImageError,
    },
}

/// Errors raised while building, compressing, or extracting archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Failed to enumerate files under a watched folder.
    #[error("failed to walk directory '{path}': {source}")]
    Walk {
        /// Directory path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to append a file to the tar archive.
    #[error("failed to append '{path}' to tar: {source}")]
    TarAppend {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to finish writing the tar archive.
    #[error("failed to finalize tar archive '{path}': {source}")]
    TarFinish {
        /// Archive path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to gzip-compress the tar archive.
    #[error("failed to compress '{path}': {source}")]
    Compress {
        /// Archive path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to gzip-decompress an archive.
    #[error("failed to decompress '{path}': {source}")]
    Decompress {
        /// Archive path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to empty a folder after a successful upload.
    #[error("failed to empty folder '{path}': {source}")]
    Empty {
        /// Folder path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the upload path.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Archive construction failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Failed to acquire the advisory folder lock.
    #[error("failed to acquire lock on '{path}': {source}")]
    Lock {
        /// Lock file path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP transport itself failed (connect/timeout/etc).
    #[error("transport error posting to '{endpoint}': {source}")]
    Transport {
        /// Endpoint URL.
        endpoint: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The server responded with a non-2xx status after exhausting retries.
    #[error("upload to '{endpoint}' failed after {attempts} attempt(s), last status {status}")]
    NonSuccess {
        /// Endpoint URL.
        endpoint: String,
        /// Attempts made.
        attempts: u32,
        /// Last HTTP status code observed.
        status: u16,
    },
}
