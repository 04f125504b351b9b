//! Constants shared across the telemetry engine.
//!
//! Centralizes the magic numbers and file-naming conventions called out in
//! the external interfaces and component design so they are defined exactly
//! once.

use std::time::Duration;

/// Default per-folder on-disk cap for the saver, in bytes (1 MiB).
///
/// The original source expresses this as `max_size * 1024` with a default
/// `max_size` of 1024 KiB; this constant folds that scaling in so callers
/// work in bytes directly.
pub const DEFAULT_MAX_DIR_BYTES: u64 = 1024 * 1024;

/// Quantile sketch capacity used for per-class classification sketches.
/// Controls the quantile-error/memory tradeoff.
pub const CLASSIFICATION_SKETCH_CAPACITY: usize = 200;

/// Frequent-items sketch capacity used for the classification frequency
/// sketch.
pub const CLASSIFICATION_FREQUENCY_CAPACITY: usize = 64;

/// Default quantile sketch capacity used where no other value is specified.
pub const DEFAULT_SKETCH_CAPACITY: usize = 200;

/// Total POST attempts per archive upload (not additional retries).
pub const UPLOAD_RETRY_COUNT: u32 = 2;

/// Backoff between upload retry attempts.
pub const UPLOAD_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Granularity at which worker threads re-check the shutdown flag while
/// sleeping between cycles, bounding `stop()` latency to roughly this value.
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Suffix appended to a watched folder's path (trailing slash stripped) to
/// form its advisory lock file name.
pub const LOCK_FILE_SUFFIX: &str = "_lock";

/// Suffix for the intermediate tar staged during an upload cycle.
pub const ARCHIVE_TAR_SUFFIX: &str = "_archive_lock.tar";

/// Suffix for the gzip-compressed archive POSTed to the ingest endpoint.
pub const ARCHIVE_GZ_SUFFIX: &str = "_archive_lock.tar.gz";

/// Content-Type used for the uploaded archive's multipart `file` part.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/gzip";

/// Tagged variant of object a save job may carry, mirroring the original
/// source's `data_object_type_e` enum. Modeled as a data-carrying enum
/// rather than a virtual base so the saver's dispatch is exhaustive and
/// adding a kind is a compile-time audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SaveKind {
    /// A quantile (KLL-style) sketch over f32 values.
    QuantileSketch,
    /// A frequent-items sketch over string keys.
    FrequencySketch,
    /// A one-shot PNG-encoded image sample.
    PngImage,
    /// A one-shot JPEG-encoded image sample. The external interfaces only
    /// ever produce PNG samples today; this variant exists so the data
    /// model's four-kind enum stays exhaustive for callers matching on it,
    /// even though no code path currently constructs it.
    JpegImage,
}

impl SaveKind {
    /// True for one-shot kinds that are removed from the saver's queue after
    /// a single successful save, rather than rotated for re-serialization.
    pub const fn is_one_shot(&self) -> bool {
        matches!(self, SaveKind::PngImage | SaveKind::JpegImage)
    }
}
