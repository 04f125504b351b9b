//! Sketch registry building blocks: the two concrete sketch algorithms plus
//! thread-safe handles around them.
//!
//! Per the concurrency design's resolved option (ii), a single `Mutex` per
//! sketch guards both `update` and `serialize` — a metric is never read
//! mid-mutation by a concurrent Saver pass.

mod frequent;
mod kll;

pub use frequent::FrequencySketch;
pub use kll::QuantileSketch;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{SaveError, TelemetryError};

/// Shared, lockable handle to a [`QuantileSketch`].
#[derive(Debug, Clone)]
pub struct QuantileHandle(Arc<Mutex<QuantileSketch>>);

impl QuantileHandle {
    pub fn new(capacity: usize) -> Self {
        QuantileHandle(Arc::new(Mutex::new(QuantileSketch::new(capacity))))
    }

    pub fn update(&self, value: f32) -> Result<(), TelemetryError> {
        let mut sketch = self.0.lock()?;
        sketch.update(value);
        Ok(())
    }

    pub fn quantile(&self, q: f64) -> Result<Option<f32>, TelemetryError> {
        let sketch = self.0.lock()?;
        Ok(sketch.quantile(q))
    }

    /// Serializes the current sketch state to `path`, truncating any
    /// existing file.
    pub fn serialize_to_file(&self, path: &Path) -> Result<(), TelemetryError> {
        let sketch = self.0.lock()?;
        let file = File::create(path).map_err(|source| SaveError::Write {
            path: path.display().to_string(),
            source,
        })?;
        sketch
            .serialize(BufWriter::new(file))
            .map_err(SaveError::from)?;
        Ok(())
    }
}

/// Shared, lockable handle to a [`FrequencySketch`].
#[derive(Debug, Clone)]
pub struct FrequencyHandle(Arc<Mutex<FrequencySketch>>);

impl FrequencyHandle {
    pub fn new(capacity: usize) -> Self {
        FrequencyHandle(Arc::new(Mutex::new(FrequencySketch::new(capacity))))
    }

    pub fn update(&self, key: &str) -> Result<(), TelemetryError> {
        let mut sketch = self.0.lock()?;
        sketch.update(key);
        Ok(())
    }

    pub fn estimate(&self, key: &str) -> Result<u64, TelemetryError> {
        let sketch = self.0.lock()?;
        Ok(sketch.estimate(key))
    }

    /// Current `(key, estimated count)` pairs, unordered.
    pub fn items(&self) -> Vec<(String, u64)> {
        self.0
            .lock()
            .map(|sketch| sketch.items())
            .unwrap_or_default()
    }

    pub fn serialize_to_file(&self, path: &Path) -> Result<(), TelemetryError> {
        let sketch = self.0.lock()?;
        let file = File::create(path).map_err(|source| SaveError::Write {
            path: path.display().to_string(),
            source,
        })?;
        sketch
            .serialize(BufWriter::new(file))
            .map_err(SaveError::from)?;
        Ok(())
    }
}
