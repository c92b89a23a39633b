use image::{ImageBuffer, Luma};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

use crate::error::{FingerprintError, Result, ensure_positive, ensure_same_shape};
use crate::models::Matrix;
use crate::utils::gaussian_blur;

/// Ridge frequency parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyParams {
    /// Sigma of the Gaussian that blends block frequencies, `None` keeps them blocky
    pub blend_sigma: Option<f32>,
    /// Side of the square estimation block
    pub block_size: usize,
    /// Frequencies at or below this are rejected (cycles/pixel)
    pub min_frequency: f32,
    /// Frequencies at or above this are rejected (cycles/pixel)
    pub max_frequency: f32,
}

impl Default for FrequencyParams {
    fn default() -> Self {
        Self {
            blend_sigma: Some(8.0),
            block_size: 36,
            min_frequency: 1.0 / 25.0,
            max_frequency: 1.0 / 3.0,
        }
    }
}

impl FrequencyParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if let Some(sigma) = self.blend_sigma {
            ensure_positive("blend_sigma", sigma)?;
        }
        if self.block_size < 3 {
            return Err(FingerprintError::parameter(
                "block_size",
                format!("must be at least 3, got {}", self.block_size),
            ));
        }
        ensure_positive("min_frequency", self.min_frequency)?;
        if !(self.max_frequency > self.min_frequency && self.max_frequency.is_finite()) {
            return Err(FingerprintError::parameter(
                "max_frequency",
                format!(
                    "must be finite and above min_frequency, got {}",
                    self.max_frequency
                ),
            ));
        }
        Ok(())
    }
}

/// Estimate the per-pixel ridge frequency
///
/// Each full block is rotated so its mean ridge orientation becomes
/// vertical, cropped to its inscribed square, and projected onto the x
/// axis. The mean distance between peaks of that signature gives the
/// ridge period. Blocks with fewer than two peaks, or whose frequency
/// falls outside the accepted band, are set to 0, as are the partial
/// blocks at the right and bottom edges.
pub fn estimate_frequency(
    image: &Matrix<f32>,
    orientation: &Matrix<f32>,
    params: &FrequencyParams,
) -> Result<Matrix<f32>> {
    params.validate()?;
    ensure_same_shape("orientation field", image.dimensions(), orientation.dimensions())?;
    let (width, height) = image.dimensions();
    let block = params.block_size;

    let origins: Vec<(usize, usize)> = (0..height / block)
        .flat_map(|by| (0..width / block).map(move |bx| (bx * block, by * block)))
        .collect();

    let estimates: Vec<Option<f32>> = origins
        .par_iter()
        .map(|&(x0, y0)| block_frequency(image, orientation, x0, y0, params))
        .collect::<Result<_>>()?;

    let mut freq = Matrix::filled(width, height, 0.0f32);
    let mut accepted = 0usize;
    for (&(x0, y0), estimate) in origins.iter().zip(&estimates) {
        let Some(f) = *estimate else { continue };
        accepted += 1;
        for y in y0..y0 + block {
            for x in x0..x0 + block {
                freq.set(x, y, f);
            }
        }
    }
    log::debug!(
        "frequency: {accepted} of {} blocks accepted",
        origins.len()
    );

    match params.blend_sigma {
        Some(sigma) => gaussian_blur(&freq, sigma),
        None => Ok(freq),
    }
}

/// Frequency of one block, `None` when rejected
fn block_frequency(
    image: &Matrix<f32>,
    orientation: &Matrix<f32>,
    x0: usize,
    y0: usize,
    params: &FrequencyParams,
) -> Result<Option<f32>> {
    let block = params.block_size;

    // Step 1: mean orientation via doubled angles
    let (mut sum_cos, mut sum_sin, mut sum_val) = (0.0f64, 0.0f64, 0.0f64);
    let mut pixels = Vec::with_capacity(block * block);
    for y in y0..y0 + block {
        for x in x0..x0 + block {
            let doubled = 2.0 * orientation.get(x, y) as f64;
            sum_cos += doubled.cos();
            sum_sin += doubled.sin();
            let v = image.get(x, y);
            sum_val += v as f64;
            pixels.push(v);
        }
    }
    let angle = (sum_sin.atan2(sum_cos) / 2.0) as f32;
    let fill = (sum_val / (block * block) as f64) as f32;

    // Step 2: rotate counter-clockwise by angle + 90 degrees so ridges run vertically
    let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(block as u32, block as u32, pixels).ok_or_else(|| {
            FingerprintError::InvalidDimensions(format!("cannot view {block}x{block} block"))
        })?;
    let rotated = rotate_about_center(
        &buffer,
        -(angle + FRAC_PI_2),
        Interpolation::Bilinear,
        Luma([fill]),
    );

    // Step 3: crop to the inscribed square and project onto x
    let crop = (block as f32 / std::f32::consts::SQRT_2) as usize;
    let offset = (block - crop) / 2;
    let signature: Vec<f32> = (offset..offset + crop)
        .map(|x| {
            (offset..offset + crop)
                .map(|y| rotated.get_pixel(x as u32, y as u32)[0])
                .sum()
        })
        .collect();

    // Step 4: mean peak spacing
    let peaks = find_peaks(&signature);
    if peaks.len() < 2 {
        return Ok(None);
    }
    let mean_distance = (peaks[peaks.len() - 1] - peaks[0]) as f32 / (peaks.len() - 1) as f32;
    let freq = 1.0 / mean_distance;
    if freq > params.min_frequency && freq < params.max_frequency {
        Ok(Some(freq))
    } else {
        Ok(None)
    }
}

/// Indices of local maxima
///
/// A peak is strictly higher than both neighbours; a flat run is one peak at
/// its (left-rounded) midpoint when both sides fall away. The ends never
/// count.
pub fn find_peaks(signal: &[f32]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }
    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::orientation::{OrientationParams, estimate_orientation};
    use crate::tools::synthetic::parallel_ridges;
    use crate::utils::stats;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_find_peaks() {
        assert_eq!(find_peaks(&[0.0, 2.0, 1.0, 3.0, 0.0]), vec![1, 3]);
        // Plateau midpoint
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0, 1.0, 0.0]), vec![2]);
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0, 0.0]), vec![1]);
        // Ends and rising edges never count
        assert_eq!(find_peaks(&[5.0, 1.0, 2.0, 3.0]), Vec::<usize>::new());
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0]), Vec::<usize>::new());
    }

    #[test]
    fn test_uniform_ridges_give_their_frequency() {
        let image = parallel_ridges(108, 108, 0.5, 8.0);
        let orientation = estimate_orientation(&image, &OrientationParams::default()).unwrap();
        let params = FrequencyParams {
            blend_sigma: None,
            ..FrequencyParams::default()
        };
        let freq = estimate_frequency(&image, &orientation, &params).unwrap();
        assert_abs_diff_eq!(freq.get(54, 54), 0.125, epsilon = 0.02);
    }

    #[test]
    fn test_blending_keeps_uniform_frequency() {
        let image = parallel_ridges(216, 216, 0.5, 8.0);
        let orientation = estimate_orientation(&image, &OrientationParams::default()).unwrap();
        let raw = FrequencyParams {
            blend_sigma: None,
            ..FrequencyParams::default()
        };
        let unblended = estimate_frequency(&image, &orientation, &raw).unwrap();
        let blended = estimate_frequency(&image, &orientation, &FrequencyParams::default()).unwrap();
        assert_abs_diff_eq!(unblended.get(108, 108), 0.125, epsilon = 1e-3);
        assert_abs_diff_eq!(blended.get(108, 108), 0.125, epsilon = 2e-3);

        // A weighted average never leaves the range of its inputs
        let (lo, hi) = stats::min_max(unblended.as_slice()).unwrap();
        for &f in blended.as_slice() {
            assert!(f >= lo - 1e-5 && f <= hi + 1e-5, "{f} outside [{lo}, {hi}]");
        }
    }

    #[test]
    fn test_flat_block_is_rejected() {
        let image = Matrix::filled(72, 72, 100.0f32);
        let orientation = Matrix::filled(72, 72, 0.0f32);
        let freq = estimate_frequency(&image, &orientation, &FrequencyParams::default()).unwrap();
        assert!(freq.as_slice().iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_partial_blocks_stay_zero() {
        let image = parallel_ridges(80, 40, 0.0, 8.0);
        let orientation = Matrix::filled(80, 40, 0.0f32);
        let params = FrequencyParams {
            blend_sigma: None,
            ..FrequencyParams::default()
        };
        let freq = estimate_frequency(&image, &orientation, &params).unwrap();
        assert!(freq.get(10, 10) > 0.0);
        assert_eq!(freq.get(75, 10), 0.0);
        assert_eq!(freq.get(10, 38), 0.0);
    }

    #[test]
    fn test_rejects_mismatched_orientation() {
        let image = Matrix::filled(40, 40, 0.0f32);
        let orientation = Matrix::filled(40, 30, 0.0f32);
        assert!(estimate_frequency(&image, &orientation, &FrequencyParams::default()).is_err());
    }
}
