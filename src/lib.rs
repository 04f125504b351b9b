//! On-device ML telemetry and uncertainty-sampling engine for edge inference.
//!
//! Three components compose upward: a per-profile [`registry`] of quantile
//! and frequent-items sketches, a background [`saver`] that durably
//! serializes them (and one-shot raw samples) under a directory-size cap,
//! and a background [`uploader`] that periodically archives and ships a
//! watched folder's contents to a remote ingest endpoint. [`profiles`] are
//! the thin facade an inference loop actually calls into.

#![warn(unused_crate_dependencies)]
// Only the driver binary installs a tracing subscriber; keep library code
// embeddable and silence the unused-dependency lint for bin-only crates.
use tracing_subscriber as _;
// Only `strum_macros::AsRefStr` is used directly; `strum` itself pulls in no
// additional code for that derive but is kept in lockstep with it.
use strum as _;
#[cfg(test)]
use tempfile as _;

/// Archive building: tar, gzip, and folder cleanup for the uploader.
pub mod archive;

/// Command-line argument parsing for the driver binary.
pub mod cli;

/// INI configuration loading.
pub mod config;

/// Shared constants and the save-job kind enum.
pub mod constants;

/// Error hierarchy.
pub mod error;

/// Advisory cross-process folder locking.
pub mod lock;

/// Profiles: the inference-facing facade (image, model, tracker, custom,
/// sampling).
pub mod profiles;

/// Per-profile sketch registry.
pub mod registry;

/// Raw sample capture and PNG encoding.
pub mod sample;

/// Background saver worker.
pub mod saver;

/// Quantile and frequent-items sketches.
pub mod sketches;

/// Opaque metric functions: image-quality statistics and confidence
/// formulas.
pub mod stat_fns;

/// Test-only helpers shared between unit and integration tests.
#[doc(hidden)]
pub mod test_utils;

/// Background uploader worker.
pub mod uploader;
