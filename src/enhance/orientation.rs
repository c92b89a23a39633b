use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

use crate::error::{FingerprintError, Result, ensure_positive};
use crate::models::Matrix;
use crate::utils::{IntegralImage, gaussian_blur};

/// Side of the gradient summation window
pub const ORIENTATION_BLOCK: usize = 16;

/// Ridge orientation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationParams {
    /// Gaussian sigma used to smooth the doubled-angle vector field
    pub blend_sigma: f32,
    /// Mirror the image left to right before estimating
    pub flip: bool,
}

impl Default for OrientationParams {
    fn default() -> Self {
        Self {
            blend_sigma: 7.0,
            flip: false,
        }
    }
}

impl OrientationParams {
    /// Heavier smoothing used ahead of singularity detection
    pub fn for_singularities() -> Self {
        Self {
            blend_sigma: 14.0,
            flip: false,
        }
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        ensure_positive("blend_sigma", self.blend_sigma)
    }
}

/// Estimate the per-pixel ridge orientation in [0, pi)
///
/// Squared gradients are summed over 16x16 windows, converted to a doubled
/// angle, smoothed as a unit vector field and halved back. Angles are
/// measured from the +x axis towards +y (image rows grow downwards).
pub fn estimate_orientation(image: &Matrix<f32>, params: &OrientationParams) -> Result<Matrix<f32>> {
    params.validate()?;
    let (width, height) = image.dimensions();
    if width < 2 || height < 2 {
        return Err(FingerprintError::InvalidDimensions(format!(
            "image is {width}x{height}, gradients need at least 2x2"
        )));
    }

    let flipped;
    let image = if params.flip {
        flipped = image.flip_horizontal();
        &flipped
    } else {
        image
    };

    // Step 1: gradients and their products
    let (dx, dy) = gradients(image);
    let gxy = IntegralImage::new(width, height, |x, y| {
        2.0 * dx.get(x, y) as f64 * dy.get(x, y) as f64
    });
    let gxx_yy = IntegralImage::new(width, height, |x, y| {
        let gx = dx.get(x, y) as f64;
        let gy = dy.get(x, y) as f64;
        gx * gx - gy * gy
    });

    // Step 2: windowed sums ("same" convolution with a 16x16 ones kernel,
    // covering offsets -8..=7) and the doubled-angle vector field
    let half = ORIENTATION_BLOCK / 2;
    let mut phi_x = Matrix::filled(width, height, 0.0f32);
    let mut phi_y = Matrix::filled(width, height, 0.0f32);
    for y in 0..height {
        for x in 0..width {
            let (x0, y0) = (x.saturating_sub(half), y.saturating_sub(half));
            let vx = gxy.sum(x0, y0, x + half, y + half);
            let vy = gxx_yy.sum(x0, y0, x + half, y + half);
            let doubled = vx.atan2(vy) as f32;
            phi_x.set(x, y, doubled.cos());
            phi_y.set(x, y, doubled.sin());
        }
    }

    // Step 3: smooth the vector field and reassemble
    let phi_x = gaussian_blur(&phi_x, params.blend_sigma)?;
    let phi_y = gaussian_blur(&phi_y, params.blend_sigma)?;
    let orientation = Matrix::from_fn(width, height, |x, y| {
        let theta = FRAC_PI_2 + phi_y.get(x, y).atan2(phi_x.get(x, y)) / 2.0;
        if theta >= PI { theta - PI } else { theta.max(0.0) }
    });

    log::debug!(
        "orientation: {}x{} sigma {} flip {}",
        width,
        height,
        params.blend_sigma,
        params.flip
    );
    Ok(orientation)
}

/// Central differences inside, one-sided differences on the borders
pub(crate) fn gradients(image: &Matrix<f32>) -> (Matrix<f32>, Matrix<f32>) {
    let (width, height) = image.dimensions();
    let dx = Matrix::from_fn(width, height, |x, y| {
        if x == 0 {
            image.get(1, y) - image.get(0, y)
        } else if x == width - 1 {
            image.get(x, y) - image.get(x - 1, y)
        } else {
            (image.get(x + 1, y) - image.get(x - 1, y)) / 2.0
        }
    });
    let dy = Matrix::from_fn(width, height, |x, y| {
        if y == 0 {
            image.get(x, 1) - image.get(x, 0)
        } else if y == height - 1 {
            image.get(x, y) - image.get(x, y - 1)
        } else {
            (image.get(x, y + 1) - image.get(x, y - 1)) / 2.0
        }
    });
    (dx, dy)
}

/// Smallest distance between two orientations, modulo pi
pub fn orientation_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(PI);
    d.min(PI - d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::synthetic::parallel_ridges;
    use std::f32::consts::FRAC_PI_3;

    fn assert_interior(orientation: &Matrix<f32>, expected: f32) {
        let (w, h) = orientation.dimensions();
        for y in h / 4..3 * h / 4 {
            for x in w / 4..3 * w / 4 {
                let got = orientation.get(x, y);
                assert!(
                    orientation_distance(got, expected) < 0.05,
                    "({x}, {y}): got {got}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn test_parallel_ridges() {
        let image = parallel_ridges(96, 96, FRAC_PI_3, 8.0);
        let orientation = estimate_orientation(&image, &OrientationParams::default()).unwrap();
        assert_interior(&orientation, FRAC_PI_3);
    }

    #[test]
    fn test_horizontal_ridges() {
        let image = parallel_ridges(80, 80, 0.0, 9.0);
        let orientation = estimate_orientation(&image, &OrientationParams::default()).unwrap();
        assert_interior(&orientation, 0.0);
    }

    #[test]
    fn test_values_in_range() {
        let image = parallel_ridges(64, 48, 2.0, 7.0);
        let orientation =
            estimate_orientation(&image, &OrientationParams::for_singularities()).unwrap();
        assert!(orientation.as_slice().iter().all(|&t| (0.0..PI).contains(&t)));
    }

    #[test]
    fn test_flip_mirrors_angle() {
        let image = parallel_ridges(96, 96, FRAC_PI_3, 8.0);
        let params = OrientationParams {
            flip: true,
            ..OrientationParams::default()
        };
        let orientation = estimate_orientation(&image, &params).unwrap();
        assert_interior(&orientation, PI - FRAC_PI_3);
    }

    #[test]
    fn test_gradients_match_central_differences() {
        let image = Matrix::from_fn(4, 3, |x, y| (x * x + 10 * y) as f32);
        let (dx, dy) = gradients(&image);
        assert_eq!(dx.row(0), &[1.0, 2.0, 4.0, 5.0]);
        assert_eq!(dy.get(2, 1), 10.0);
    }

    #[test]
    fn test_rejects_degenerate_input() {
        let image = Matrix::filled(1, 10, 0.0f32);
        assert!(estimate_orientation(&image, &OrientationParams::default()).is_err());
        let image = Matrix::filled(10, 10, 0.0f32);
        let params = OrientationParams {
            blend_sigma: -1.0,
            flip: false,
        };
        assert!(estimate_orientation(&image, &params).is_err());
    }
}
