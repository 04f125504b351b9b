//! Raw sample capture and PNG encoding.
//!
//! When a metric crosses its configured threshold, the triggering image is
//! handed to the Saver as a one-shot [`SaveKind::PngImage`](crate::constants::SaveKind)
//! job. This module owns turning the in-memory buffer into a file name and
//! PNG bytes; the Saver owns where and when that write actually happens.

use std::time::{SystemTime, UNIX_EPOCH};

use image::{ImageError, RgbImage};

/// A captured image sample, named after the metric that triggered it.
pub struct Sample {
    /// Name of the metric whose threshold triggered this capture (e.g.
    /// `"brightness"`, `"marginconfidence"`).
    pub metric_name: String,
    image: RgbImage,
}

impl Sample {
    pub fn new(metric_name: impl Into<String>, image: RgbImage) -> Self {
        Sample {
            metric_name: metric_name.into(),
            image,
        }
    }

    /// Builds the file name for this sample: `<metric>_<epoch_seconds><micros>.png`,
    /// with the sub-second component zero-padded to 6 digits so names sort
    /// lexicographically in capture order within the same second.
    pub fn file_name(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        format!(
            "{}_{}{:06}.png",
            self.metric_name,
            now.as_secs(),
            now.subsec_micros()
        )
    }

    /// Encodes the sample to PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}
