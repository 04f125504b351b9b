//! Numeric metric functions: image-quality statistics and the four
//! uncertainty-sampling confidence formulas.
//!
//! The distilled spec treats the actual domain formulas as an opaque
//! collaborator (see `SPEC_FULL.md` §1) - what matters structurally is that
//! each produces a single `f32` score from a frame or probability
//! distribution, feeds a sketch, and can trip a threshold. These are real,
//! working implementations of that contract, not stubs: the confidence
//! formulas are ported faithfully from the original source's
//! `ImageSampler::{margin,least,ratio,entropy}_confidence`; the image-quality
//! formulas are simplified, standard computer-vision approximations (mean
//! luma, a luma-domain SNR estimate, and Laplacian-variance sharpness)
//! standing in for the original's OpenCV-backed `calculateBrightness` /
//! `calculateSNR` / `calculateSharpnessLaplacian`.

use image::RgbImage;

fn luma(pixel: &image::Rgb<u8>) -> f32 {
    0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32
}

fn luma_grid(img: &RgbImage) -> Vec<f32> {
    img.pixels().map(luma).collect()
}

/// Mean luma across the frame. `None` for an empty image.
pub fn calculate_brightness(img: &RgbImage) -> Option<f32> {
    let grid = luma_grid(img);
    if grid.is_empty() {
        return None;
    }
    Some(grid.iter().sum::<f32>() / grid.len() as f32)
}

/// A simple signal-to-noise estimate: mean luma over its standard deviation.
/// `None` for an empty image or a perfectly flat (zero-variance) one.
pub fn calculate_snr(img: &RgbImage) -> Option<f32> {
    let grid = luma_grid(img);
    if grid.is_empty() {
        return None;
    }
    let mean = grid.iter().sum::<f32>() / grid.len() as f32;
    let variance = grid.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / grid.len() as f32;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return None;
    }
    Some(mean / std_dev)
}

/// Laplacian-variance sharpness estimate over the luma plane. `None` if the
/// image is smaller than the 3x3 neighborhood the Laplacian kernel needs.
pub fn calculate_sharpness_laplacian(img: &RgbImage) -> Option<f32> {
    let (width, height) = img.dimensions();
    if width < 3 || height < 3 {
        return None;
    }

    let grid = luma_grid(img);
    let idx = |x: u32, y: u32| (y * width + x) as usize;

    let mut laplacians = Vec::with_capacity(((width - 2) * (height - 2)) as usize);
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = grid[idx(x, y)];
            let neighbor_sum = grid[idx(x - 1, y)]
                + grid[idx(x + 1, y)]
                + grid[idx(x, y - 1)]
                + grid[idx(x, y + 1)];
            laplacians.push(neighbor_sum - 4.0 * center);
        }
    }

    let mean = laplacians.iter().sum::<f32>() / laplacians.len() as f32;
    let variance = laplacians.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / laplacians.len() as f32;
    Some(variance)
}

/// Per-channel means of an RGB image, in R, G, B order.
pub fn channel_means(img: &RgbImage) -> Option<[f32; 3]> {
    let count = img.pixels().count();
    if count == 0 {
        return None;
    }
    let mut totals = [0f64; 3];
    for pixel in img.pixels() {
        for channel in 0..3 {
            totals[channel] += pixel[channel] as f64;
        }
    }
    Some([
        (totals[0] / count as f64) as f32,
        (totals[1] / count as f64) as f32,
        (totals[2] / count as f64) as f32,
    ])
}

/// Margin confidence: `1 - (top probability - second probability)`. Requires
/// at least two class probabilities.
pub fn margin_confidence(prob_dist: &[f32]) -> Option<f32> {
    if prob_dist.len() < 2 {
        return None;
    }
    let mut sorted = prob_dist.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    Some(1.0 - (sorted[0] - sorted[1]))
}

/// Least confidence, normalized by the number of labels. Requires at least
/// two class probabilities (the normalization divides by `n - 1`).
pub fn least_confidence(prob_dist: &[f32]) -> Option<f32> {
    let num_labels = prob_dist.len();
    if num_labels < 2 {
        return None;
    }
    let top = prob_dist.iter().cloned().fold(f32::MIN, f32::max);
    Some((1.0 - top) * (num_labels as f32 / (num_labels - 1) as f32))
}

/// Ratio confidence: second-highest probability over the highest. Requires
/// at least two class probabilities.
pub fn ratio_confidence(prob_dist: &[f32]) -> Option<f32> {
    if prob_dist.len() < 2 {
        return None;
    }
    let mut sorted = prob_dist.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    if sorted[0] == 0.0 {
        return None;
    }
    Some(sorted[1] / sorted[0])
}

/// Shannon entropy of the distribution, normalized to `[0, 1]` by
/// `log2(num_labels)`. Requires at least two labels (a single label has no
/// entropy to normalize by).
pub fn entropy_confidence(prob_dist: &[f32]) -> Option<f32> {
    let num_labels = prob_dist.len();
    if num_labels < 2 {
        return None;
    }
    let raw_entropy: f32 = prob_dist
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum();
    Some(raw_entropy / (num_labels as f32).log2())
}

/// A 2D position, for [`position_error_2d`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position2D {
    pub x: f32,
    pub y: f32,
}

/// A 3D position, for [`position_error_3d`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A unit quaternion `w + xi + yj + zk`, for the orientation-related
/// tracking metrics below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    fn conjugate(self) -> Quaternion {
        Quaternion {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    fn mul(self, other: Quaternion) -> Quaternion {
        Quaternion {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }
}

/// Angular velocity in radians/second about each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AngularVelocity {
    pub roll_rate: f32,
    pub pitch_rate: f32,
    pub yaw_rate: f32,
}

/// Euclidean distance between a predicted and an actual 2D position,
/// ported from the original source's `TrackingMetrics::computePositionError`.
pub fn position_error_2d(predicted: Position2D, actual: Position2D) -> f32 {
    ((predicted.x - actual.x).powi(2) + (predicted.y - actual.y).powi(2)).sqrt()
}

/// Euclidean distance between a predicted and an actual 3D position.
pub fn position_error_3d(predicted: Position3D, actual: Position3D) -> f32 {
    ((predicted.x - actual.x).powi(2)
        + (predicted.y - actual.y).powi(2)
        + (predicted.z - actual.z).powi(2))
    .sqrt()
}

/// Angular orientation error between two quaternions, in radians.
pub fn orientation_error(predicted: Quaternion, actual: Quaternion) -> f32 {
    let error = predicted.mul(actual.conjugate());
    2.0 * error.w.abs().acos()
}

/// Mean absolute per-axis difference between a measured and expected
/// angular velocity.
pub fn angular_velocity_latency(measured: AngularVelocity, expected: AngularVelocity) -> f32 {
    let yaw = (measured.yaw_rate - expected.yaw_rate).abs();
    let pitch = (measured.pitch_rate - expected.pitch_rate).abs();
    let roll = (measured.roll_rate - expected.roll_rate).abs();
    (yaw + pitch + roll) / 3.0
}

/// Angular drift rate between successive orientation estimates, in
/// radians/second. `delta_time` is the elapsed time in seconds.
pub fn quaternion_drift(previous: Quaternion, current: Quaternion, delta_time: f32) -> f32 {
    let delta = current.mul(previous.conjugate());
    let angle = 2.0 * delta.w.abs().acos();
    angle / delta_time
}

/// Sum of the diagonal of a 3x3 covariance matrix (row-major), i.e. the
/// total variance spread across axes.
pub fn covariance_spread(covariance: &[[f32; 3]; 3]) -> f32 {
    covariance[0][0] + covariance[1][1] + covariance[2][2]
}

/// Angular divergence between a predicted and actual quaternion, in
/// radians - half of [`orientation_error`].
pub fn angular_divergence(predicted: Quaternion, actual: Quaternion) -> f32 {
    let error = predicted.mul(actual.conjugate());
    error.w.abs().acos()
}

/// True if `current`'s angular velocity deviates from `historical_average`
/// by more than `threshold` radians/second on any single axis.
pub fn detect_anomalous_rotation(
    current: AngularVelocity,
    historical_average: AngularVelocity,
    threshold: f32,
) -> bool {
    (current.yaw_rate - historical_average.yaw_rate).abs() > threshold
        || (current.pitch_rate - historical_average.pitch_rate).abs() > threshold
        || (current.roll_rate - historical_average.roll_rate).abs() > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_of_uniform_image() {
        let mut img = RgbImage::new(4, 4);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([100, 100, 100]);
        }
        let brightness = calculate_brightness(&img).unwrap();
        assert!((brightness - 100.0).abs() < 0.01);
    }

    #[test]
    fn snr_is_none_for_flat_image() {
        let img = RgbImage::from_pixel(4, 4, image::Rgb([50, 50, 50]));
        assert_eq!(calculate_snr(&img), None);
    }

    #[test]
    fn sharpness_is_none_for_tiny_image() {
        let img = RgbImage::new(2, 2);
        assert_eq!(calculate_sharpness_laplacian(&img), None);
    }

    #[test]
    fn margin_confidence_of_confident_prediction_is_high() {
        let conf = margin_confidence(&[0.9, 0.05, 0.05]).unwrap();
        assert!(conf > 0.8);
    }

    #[test]
    fn margin_confidence_of_uncertain_prediction_is_low() {
        let conf = margin_confidence(&[0.34, 0.33, 0.33]).unwrap();
        assert!(conf < 0.1);
    }

    #[test]
    fn entropy_confidence_of_uniform_distribution_is_one() {
        let conf = entropy_confidence(&[0.25, 0.25, 0.25, 0.25]).unwrap();
        assert!((conf - 1.0).abs() < 0.001);
    }

    #[test]
    fn entropy_confidence_of_certain_prediction_is_zero() {
        let conf = entropy_confidence(&[1.0, 0.0, 0.0]).unwrap();
        assert!(conf.abs() < 0.001);
    }

    #[test]
    fn ratio_confidence_requires_at_least_two_labels() {
        assert_eq!(ratio_confidence(&[1.0]), None);
    }

    #[test]
    fn least_confidence_of_confident_prediction_is_low() {
        let conf = least_confidence(&[0.9, 0.1]).unwrap();
        assert!(conf < 0.3);
    }

    #[test]
    fn position_error_2d_matches_pythagorean_distance() {
        let predicted = Position2D { x: 10.0, y: 20.0 };
        let actual = Position2D { x: 12.0, y: 24.0 };
        assert!((position_error_2d(predicted, actual) - 4.4721).abs() < 0.001);
    }

    #[test]
    fn position_error_3d_matches_pythagorean_distance() {
        let predicted = Position3D { x: 10.0, y: 20.0, z: 5.0 };
        let actual = Position3D { x: 12.0, y: 24.0, z: 7.0 };
        assert!((position_error_3d(predicted, actual) - 5.0).abs() < 0.01);
    }

    #[test]
    fn orientation_error_of_identical_quaternions_is_zero() {
        let q = Quaternion { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };
        assert!(orientation_error(q, q).abs() < 0.001);
    }

    #[test]
    fn angular_velocity_latency_averages_absolute_differences() {
        let measured = AngularVelocity { roll_rate: 2.0, pitch_rate: 3.0, yaw_rate: 1.0 };
        let expected = AngularVelocity { roll_rate: 2.1, pitch_rate: 3.1, yaw_rate: 1.1 };
        assert!((angular_velocity_latency(measured, expected) - 0.1).abs() < 0.001);
    }

    #[test]
    fn covariance_spread_is_the_trace() {
        let covariance = [[1.0, 0.5, 0.3], [0.5, 1.0, 0.4], [0.3, 0.4, 1.0]];
        assert!((covariance_spread(&covariance) - 3.0).abs() < 0.001);
    }

    #[test]
    fn anomalous_rotation_is_detected_past_threshold() {
        let current = AngularVelocity { roll_rate: 0.0, pitch_rate: 0.0, yaw_rate: 5.0 };
        let historical = AngularVelocity { roll_rate: 0.0, pitch_rate: 0.0, yaw_rate: 2.0 };
        assert!(detect_anomalous_rotation(current, historical, 0.5));
        assert!(!detect_anomalous_rotation(current, historical, 10.0));
    }
}
