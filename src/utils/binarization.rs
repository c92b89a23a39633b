use serde::{Deserialize, Serialize};

use super::integral::IntegralImage;
use crate::error::{FingerprintError, Result, ensure_same_shape};
use crate::models::{BitMatrix, Matrix};

/// Bradley adaptive threshold parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BradleyParams {
    /// Window side is `width / window_divisor`
    pub window_divisor: usize,
    /// A pixel is foreground above `100 - t` percent of its window mean
    pub t: f32,
}

impl Default for BradleyParams {
    fn default() -> Self {
        Self {
            window_divisor: 12,
            t: 15.0,
        }
    }
}

impl BradleyParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.window_divisor == 0 {
            return Err(FingerprintError::parameter("window_divisor", "must be at least 1"));
        }
        if !self.t.is_finite() || !(0.0..100.0).contains(&self.t) {
            return Err(FingerprintError::parameter(
                "t",
                format!("expected a percentage in [0, 100), got {}", self.t),
            ));
        }
        Ok(())
    }
}

/// Binarize with Bradley's integral-image adaptive threshold
///
/// Returns true where a pixel is above `100 - t` percent of its window
/// mean. Pixels outside `mask`, or whose window leaves the image, are false.
pub fn bradley_binarize(
    image: &Matrix<f32>,
    mask: &BitMatrix,
    params: &BradleyParams,
) -> Result<BitMatrix> {
    params.validate()?;
    ensure_same_shape("mask", image.dimensions(), mask.dimensions())?;
    let (width, height) = image.dimensions();
    let side = width / params.window_divisor;
    if side < 2 {
        return Err(FingerprintError::InvalidDimensions(format!(
            "image width {width} gives a Bradley window of {side} pixels"
        )));
    }

    let integral = IntegralImage::new(width, height, |x, y| image.get(x, y) as f64);
    let half = side as f64 / 2.0;
    let scale = (100.0 - params.t as f64) / 100.0;
    let mut out = BitMatrix::new(width, height);

    for y in 0..height {
        for x in 0..width {
            if !mask.get(x, y) {
                continue;
            }
            // Inclusive window bounds, truncated toward zero
            let y0 = (y as f64 - half) as i64;
            let y1 = (y as f64 + half) as i64;
            let x0 = (x as f64 - half) as i64;
            let x1 = (x as f64 + half) as i64;
            if y0 < 1 || y1 >= height as i64 || x0 < 1 || x1 >= width as i64 {
                continue;
            }
            let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);
            let count = ((y1 - y0) * (x1 - x0)) as f64;
            let sum = integral.sum(x0, y0, x1 + 1, y1 + 1);
            if image.get(x, y) as f64 * count > sum * scale {
                out.set(x, y, true);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bright_stripes_are_foreground() {
        // Vertical bright stripes every 6 pixels on a dark background
        let image = Matrix::from_fn(48, 48, |x, _| if x % 6 < 2 { 200.0 } else { 20.0 });
        let mask = BitMatrix::from_fn(48, 48, |_, _| true);
        let out = bradley_binarize(&image, &mask, &BradleyParams::default()).unwrap();

        assert!(out.get(24, 24)); // 24 % 6 == 0, bright
        assert!(!out.get(27, 24)); // dark
        // Border pixels whose window leaves the image
        assert!(!out.get(0, 0));
        assert!(!out.get(47, 24));
    }

    #[test]
    fn test_mask_suppresses_output() {
        let image = Matrix::from_fn(48, 48, |x, _| if x % 6 < 2 { 200.0 } else { 20.0 });
        let mask = BitMatrix::new(48, 48);
        let out = bradley_binarize(&image, &mask, &BradleyParams::default()).unwrap();
        assert_eq!(out.count_ones(), 0);
    }

    #[test]
    fn test_rejects_tiny_window() {
        let image = Matrix::filled(12, 12, 1.0f32);
        let mask = BitMatrix::new(12, 12);
        assert!(bradley_binarize(&image, &mask, &BradleyParams::default()).is_err());
    }
}
