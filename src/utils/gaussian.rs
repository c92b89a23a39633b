use image::{ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;

use crate::error::{FingerprintError, Result, ensure_positive};
use crate::models::Matrix;

/// Kernel truncated at 4 sigma, weights summing to one
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (4.0 * sigma + 0.5) as usize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let d = i as f32 - radius as f32;
            (-d * d / denom).exp()
        })
        .collect();
    let total: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= total);
    kernel
}

/// Gaussian blur of a float grid with edge-clamped borders
///
/// The kernel is normalized, so constant regions keep their value.
pub fn gaussian_blur(grid: &Matrix<f32>, sigma: f32) -> Result<Matrix<f32>> {
    ensure_positive("sigma", sigma)?;
    let (width, height) = grid.dimensions();
    let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(width as u32, height as u32, grid.as_slice().to_vec()).ok_or_else(
            || FingerprintError::InvalidDimensions(format!("cannot view {width}x{height} grid as an image")),
        )?;
    let blurred = separable_filter_equal(&buffer, &gaussian_kernel(sigma));
    Matrix::from_raw(width, height, blurred.into_raw())
}
