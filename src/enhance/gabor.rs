use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::error::{FingerprintError, Result, Stage, ensure_positive, ensure_same_shape};
use crate::models::{BitMatrix, Matrix};
use crate::utils::Deadline;

/// Oriented Gabor filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaborParams {
    /// Kernel side, odd and at least 3
    pub block_size: usize,
    /// Squared spatial spread across the ridges
    pub delta_u_sq: f32,
    /// Squared spatial spread along the ridges
    pub delta_v_sq: f32,
}

impl Default for GaborParams {
    fn default() -> Self {
        Self {
            block_size: 11,
            delta_u_sq: 16.0,
            delta_v_sq: 16.0,
        }
    }
}

impl GaborParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(FingerprintError::parameter(
                "block_size",
                format!("expected an odd size >= 3, got {}", self.block_size),
            ));
        }
        ensure_positive("delta_u_sq", self.delta_u_sq)?;
        ensure_positive("delta_v_sq", self.delta_v_sq)
    }

    /// Kernel weight at offset (dx, dy) for ridge angle `phi` and frequency `freq`
    #[inline]
    pub fn weight(&self, dx: f32, dy: f32, sin_phi: f32, cos_phi: f32, freq: f32) -> f32 {
        let across = dx * sin_phi - dy * cos_phi;
        let along = dx * cos_phi + dy * sin_phi;
        let envelope =
            (-0.5 * (across * across / self.delta_u_sq + along * along / self.delta_v_sq)).exp();
        envelope * (2.0 * PI * freq * across).cos()
    }
}

/// Binarize ridges with a per-pixel oriented Gabor kernel
///
/// `signal` must carry ridges as positive values. Each masked pixel at
/// least `block_size / 2` from the border is convolved with a kernel tuned
/// to its own orientation and frequency, and becomes a ridge when the
/// response is positive.
pub fn gabor_filter(
    signal: &Matrix<f32>,
    orientation: &Matrix<f32>,
    frequency: &Matrix<f32>,
    mask: &BitMatrix,
    params: &GaborParams,
    deadline: &Deadline,
) -> Result<BitMatrix> {
    params.validate()?;
    let dims = signal.dimensions();
    ensure_same_shape("orientation field", dims, orientation.dimensions())?;
    ensure_same_shape("frequency field", dims, frequency.dimensions())?;
    ensure_same_shape("mask", dims, mask.dimensions())?;

    let (width, height) = dims;
    let half = params.block_size / 2;
    if width <= 2 * half || height <= 2 * half {
        return Ok(BitMatrix::new(width, height));
    }

    let rows: Vec<Vec<usize>> = (half..height - half)
        .into_par_iter()
        .map(|y| {
            deadline.check(Stage::Binarize)?;
            let mut ridges = Vec::new();
            for x in half..width - half {
                if !mask.get(x, y) {
                    continue;
                }
                let (sin_phi, cos_phi) = orientation.get(x, y).sin_cos();
                let freq = frequency.get(x, y);
                let mut response = 0.0f32;
                for ky in 0..params.block_size {
                    let dy = ky as f32 - half as f32;
                    let src = signal.row(y + ky - half);
                    for kx in 0..params.block_size {
                        let dx = kx as f32 - half as f32;
                        response +=
                            params.weight(dx, dy, sin_phi, cos_phi, freq) * src[x + kx - half];
                    }
                }
                if response > 0.0 {
                    ridges.push(x);
                }
            }
            Ok(ridges)
        })
        .collect::<Result<_>>()?;

    let mut out = BitMatrix::new(width, height);
    for (row, xs) in rows.iter().enumerate() {
        for &x in xs {
            out.set(x, row + half, true);
        }
    }
    log::debug!(
        "gabor: {} ridge pixels, kernel {}",
        out.count_ones(),
        params.block_size
    );
    Ok(out)
}
