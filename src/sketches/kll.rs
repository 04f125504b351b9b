//! A compactor-cascade quantile sketch over `f32`, in the style of the
//! Karnin-Lang-Liberty (KLL) algorithm.
//!
//! The distilled spec treats the quantile sketch as an opaque library with a
//! minimal `update`/`serialize` contract (see `SPEC_FULL.md` §1). This is a
//! real, from-scratch implementation of that contract rather than a stub:
//! a cascade of bounded buffers where level `i` implicitly represents weight
//! `2^i`, compacted by sorting and keeping every other element once a level
//! overflows. It is not bit-compatible with any particular production KLL
//! library — the serialized format is this crate's own, versioned and
//! self-describing as required by the data model contract.

use std::io::{self, Read, Write};

use rand::Rng;

use crate::error::SketchError;

const MAGIC: &[u8; 8] = b"EDGEKLL1";
const FORMAT_VERSION: u8 = 1;

/// A single compactor level: a buffer of values all carrying weight `2^level`.
#[derive(Debug, Clone, Default)]
struct Level {
    items: Vec<f32>,
}

/// Streaming approximate quantile sketch over `f32` values.
///
/// `update` is not thread-safe; concurrent callers must serialize access
/// themselves (see `crate::sketches::SketchHandle`, which wraps this in a
/// `Mutex` covering both `update` and `serialize` per the concurrency
/// design's recommended option (ii)).
#[derive(Debug, Clone)]
pub struct QuantileSketch {
    capacity: usize,
    levels: Vec<Level>,
    count: u64,
}

impl QuantileSketch {
    /// Creates a sketch with the given per-level capacity. Larger capacity
    /// trades memory for quantile accuracy.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "sketch capacity must be at least 2");
        QuantileSketch {
            capacity,
            levels: vec![Level::default()],
            count: 0,
        }
    }

    /// Total number of values ever passed to [`Self::update`].
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Folds a new value into the sketch.
    pub fn update(&mut self, value: f32) {
        self.count += 1;
        self.levels[0].items.push(value);
        self.compact_from(0);
    }

    fn compact_from(&mut self, mut level_idx: usize) {
        let overflow_at = 2 * self.capacity;
        let mut rng = rand::thread_rng();

        while self.levels[level_idx].items.len() >= overflow_at {
            let mut items = std::mem::take(&mut self.levels[level_idx].items);
            items.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let parity = rng.gen_range(0..2);
            let survivors: Vec<f32> = items
                .into_iter()
                .enumerate()
                .filter(|(i, _)| i % 2 == parity)
                .map(|(_, v)| v)
                .collect();

            if self.levels.len() == level_idx + 1 {
                self.levels.push(Level::default());
            }
            self.levels[level_idx + 1].items.extend(survivors);
            level_idx += 1;
        }
    }

    /// Collects `(value, weight)` pairs across all levels, weight = `2^level`.
    fn weighted_values(&self) -> Vec<(f32, u64)> {
        let mut out = Vec::new();
        for (level_idx, level) in self.levels.iter().enumerate() {
            let weight = 1u64 << level_idx;
            out.extend(level.items.iter().map(|&v| (v, weight)));
        }
        out
    }

    /// Estimates the value at quantile `q` (`0.0..=1.0`).
    ///
    /// Returns `None` if the sketch has never been updated.
    pub fn quantile(&self, q: f64) -> Option<f32> {
        let mut weighted = self.weighted_values();
        if weighted.is_empty() {
            return None;
        }
        weighted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let total_weight: u64 = weighted.iter().map(|(_, w)| w).sum();
        let target = (q.clamp(0.0, 1.0) * total_weight as f64).ceil() as u64;
        let mut cumulative = 0u64;
        for (value, weight) in &weighted {
            cumulative += weight;
            if cumulative >= target.max(1) {
                return Some(*value);
            }
        }
        weighted.last().map(|(v, _)| *v)
    }

    /// Serializes the sketch to `writer` in this crate's self-describing
    /// binary format. Repeated serialization of the same in-memory state
    /// yields byte-identical output.
    pub fn serialize<W: Write>(&self, mut writer: W) -> Result<(), SketchError> {
        writer.write_all(MAGIC)?;
        writer.write_all(&[FORMAT_VERSION])?;
        writer.write_all(&(self.capacity as u32).to_le_bytes())?;
        writer.write_all(&self.count.to_le_bytes())?;
        writer.write_all(&(self.levels.len() as u32).to_le_bytes())?;
        for level in &self.levels {
            writer.write_all(&(level.items.len() as u32).to_le_bytes())?;
            for value in &level.items {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Deserializes a sketch previously written by [`Self::serialize`].
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
        let count = read_u64(&mut reader)?;
        let num_levels = read_u32(&mut reader)? as usize;

        let mut levels = Vec::with_capacity(num_levels);
        for _ in 0..num_levels {
            let len = read_u32(&mut reader)? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(read_f32(&mut reader)?);
            }
            levels.push(Level { items });
        }

        if levels.is_empty() {
            return Err(SketchError::Corrupt("sketch has zero levels".to_string()));
        }

        Ok(QuantileSketch {
            capacity,
            levels,
            count,
        })
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

fn read_f32<R: Read>(reader: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_round_trips() {
        let mut sketch = QuantileSketch::new(200);
        sketch.update(0.9);
        assert_eq!(sketch.count(), 1);

        let mut bytes = Vec::new();
        sketch.serialize(&mut bytes).unwrap();
        let restored = QuantileSketch::deserialize(&bytes[..]).unwrap();
        assert_eq!(restored.count(), 1);
        assert_eq!(restored.quantile(0.5), sketch.quantile(0.5));
    }

    #[test]
    fn quantile_round_trip_matches_after_many_updates() {
        let mut sketch = QuantileSketch::new(32);
        for i in 0..5000u32 {
            sketch.update(i as f32);
        }

        let mut bytes = Vec::new();
        sketch.serialize(&mut bytes).unwrap();
        let restored = QuantileSketch::deserialize(&bytes[..]).unwrap();

        for q in [0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0] {
            assert_eq!(sketch.quantile(q), restored.quantile(q));
        }
    }

    #[test]
    fn approximate_median_is_in_the_right_ballpark() {
        let mut sketch = QuantileSketch::new(200);
        for i in 0..10_000u32 {
            sketch.update(i as f32);
        }
        let median = sketch.quantile(0.5).unwrap();
        assert!((4000.0..6000.0).contains(&median), "median was {median}");
    }

    #[test]
    fn repeated_serialize_is_byte_identical() {
        let mut sketch = QuantileSketch::new(16);
        for i in 0..100 {
            sketch.update(i as f32);
        }
        let mut first = Vec::new();
        let mut second = Vec::new();
        sketch.serialize(&mut first).unwrap();
        sketch.serialize(&mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let err = QuantileSketch::deserialize(&b"not-a-sketch-at-all-x"[..]).unwrap_err();
        assert!(matches!(err, SketchError::BadMagic));
    }
}
