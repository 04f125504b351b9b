//! A Space-Saving style frequent-items sketch over string keys.
//!
//! Bounds memory to `capacity` distinct keys: once full, a new key evicts
//! the current minimum-count entry and inherits `min_count + 1`, the
//! standard Space-Saving construction. Counts for tracked keys are
//! therefore overestimates, never underestimates.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::error::SketchError;

const MAGIC: &[u8; 8] = b"EDGEFRQ1";
const FORMAT_VERSION: u8 = 1;

#[derive(Debug, Clone)]
pub struct FrequencySketch {
    capacity: usize,
    counts: HashMap<String, u64>,
}

impl FrequencySketch {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "sketch capacity must be at least 1");
        FrequencySketch {
            capacity,
            counts: HashMap::with_capacity(capacity),
        }
    }

    /// Folds one observation of `key` into the sketch.
    pub fn update(&mut self, key: &str) {
        if let Some(count) = self.counts.get_mut(key) {
            *count += 1;
            return;
        }

        if self.counts.len() < self.capacity {
            self.counts.insert(key.to_string(), 1);
            return;
        }

        let (min_key, min_count) = self
            .counts
            .iter()
            .min_by_key(|(_, count)| **count)
            .map(|(k, v)| (k.clone(), *v))
            .expect("capacity >= 1 guarantees at least one entry once full");
        self.counts.remove(&min_key);
        self.counts.insert(key.to_string(), min_count + 1);
    }

    /// Current `(key, estimated count)` pairs, unordered.
    pub fn items(&self) -> Vec<(String, u64)> {
        self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Estimated count for `key`, zero if it has never been tracked.
    pub fn estimate(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn serialize<W: Write>(&self, mut writer: W) -> Result<(), SketchError> {
        writer.write_all(MAGIC)?;
        writer.write_all(&[FORMAT_VERSION])?;
        writer.write_all(&(self.capacity as u32).to_le_bytes())?;

        let mut entries: Vec<(&String, &u64)> = self.counts.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        writer.write_all(&(entries.len() as u32).to_le_bytes())?;
        for (key, count) in entries {
            let key_bytes = key.as_bytes();
            writer.write_all(&(key_bytes.len() as u32).to_le_bytes())?;
            writer.write_all(key_bytes)?;
            writer.write_all(&count.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn deserialize<R: Read>(mut reader: R) -> Result<Self, SketchError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(SketchError::BadMagic);
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != FORMAT_VERSION {
            return Err(SketchError::UnsupportedVersion(version[0]));
        }

        let capacity = read_u32(&mut reader)? as usize;
        let num_entries = read_u32(&mut reader)? as usize;

        let mut counts = HashMap::with_capacity(num_entries);
        for _ in 0..num_entries {
            let key_len = read_u32(&mut reader)? as usize;
            let mut key_bytes = vec![0u8; key_len];
            reader.read_exact(&mut key_bytes)?;
            let key = String::from_utf8(key_bytes)
                .map_err(|e| SketchError::Corrupt(format!("key is not valid utf-8: {e}")))?;
            let count = read_u64(&mut reader)?;
            counts.insert(key, count);
        }

        Ok(FrequencySketch { capacity, counts })
    }
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_exact_counts_under_capacity() {
        let mut sketch = FrequencySketch::new(10);
        for _ in 0..5 {
            sketch.update("cat");
        }
        for _ in 0..3 {
            sketch.update("dog");
        }
        assert_eq!(sketch.estimate("cat"), 5);
        assert_eq!(sketch.estimate("dog"), 3);
        assert_eq!(sketch.estimate("bird"), 0);
    }

    #[test]
    fn evicts_minimum_when_over_capacity() {
        let mut sketch = FrequencySketch::new(2);
        sketch.update("a");
        sketch.update("b");
        sketch.update("b");
        sketch.update("c");
        assert_eq!(sketch.items().len(), 2);
        assert!(sketch.estimate("b") >= 2);
    }

    #[test]
    fn round_trips_through_serialize() {
        let mut sketch = FrequencySketch::new(50);
        for label in ["car", "truck", "car", "bike", "car", "truck"] {
            sketch.update(label);
        }

        let mut bytes = Vec::new();
        sketch.serialize(&mut bytes).unwrap();
        let restored = FrequencySketch::deserialize(&bytes[..]).unwrap();

        assert_eq!(restored.estimate("car"), sketch.estimate("car"));
        assert_eq!(restored.estimate("truck"), sketch.estimate("truck"));
        assert_eq!(restored.estimate("bike"), sketch.estimate("bike"));
    }

    #[test]
    fn repeated_serialize_is_byte_identical() {
        let mut sketch = FrequencySketch::new(10);
        sketch.update("x");
        sketch.update("y");
        let mut first = Vec::new();
        let mut second = Vec::new();
        sketch.serialize(&mut first).unwrap();
        sketch.serialize(&mut second).unwrap();
        assert_eq!(first, second);
    }
}
