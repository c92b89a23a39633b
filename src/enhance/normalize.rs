use crate::error::Result;
use crate::models::Matrix;
use crate::utils::stats::{self, rescale_to_u8};

/// Target mean after normalization
pub const DESIRED_MEAN: f32 = 100.0;
/// Target variance after normalization
pub const DESIRED_VARIANCE: f32 = 100.0;

/// Map intensities to mean 100 / variance 100, before any display rescaling
///
/// A flat image has no variance to stretch and comes back as all 100.
pub fn normalize_mean_variance(image: &Matrix<u8>) -> Result<Matrix<f32>> {
    let samples: Vec<f32> = image.as_slice().iter().map(|&v| v as f32).collect();
    let mean = stats::mean(&samples);
    let variance = stats::variance(&samples);

    if variance <= 0.0 {
        log::warn!(
            "normalize: flat {}x{} image, nothing to stretch",
            image.width(),
            image.height()
        );
        return Ok(image.map(|_| DESIRED_MEAN));
    }

    let gain = (DESIRED_VARIANCE as f64 / variance).sqrt();
    Ok(image.map(|p| {
        let deviation = (p as f64 - mean).abs() * gain;
        if p as f64 > mean {
            DESIRED_MEAN + deviation as f32
        } else {
            DESIRED_MEAN - deviation as f32
        }
    }))
}

/// Normalize to mean/variance 100 and stretch the result onto [0, 255]
///
/// A flat image is returned unchanged.
pub fn normalize(image: &Matrix<u8>) -> Result<Matrix<u8>> {
    let normalized = normalize_mean_variance(image)?;
    if stats::min_max(normalized.as_slice()).is_some_and(|(lo, hi)| lo == hi) {
        return Ok(image.clone());
    }
    Ok(rescale_to_u8(&normalized))
}
