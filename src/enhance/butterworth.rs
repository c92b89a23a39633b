use rayon::prelude::*;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::error::{FingerprintError, Result, ensure_positive};
use crate::models::Matrix;

/// Butterworth band-pass parameters, cutoffs in cycles per pixel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButterworthParams {
    /// Frequencies below this are attenuated (background shading)
    pub low_cutoff: f32,
    /// Frequencies above this are attenuated (pixel noise)
    pub high_cutoff: f32,
    /// Filter order, higher is steeper
    pub order: u32,
}

impl Default for ButterworthParams {
    fn default() -> Self {
        Self {
            low_cutoff: 0.02,
            high_cutoff: 0.35,
            order: 2,
        }
    }
}

impl ButterworthParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        ensure_positive("high_cutoff", self.high_cutoff)?;
        if !self.low_cutoff.is_finite() || self.low_cutoff < 0.0 {
            return Err(FingerprintError::parameter(
                "low_cutoff",
                format!("expected a finite value >= 0, got {}", self.low_cutoff),
            ));
        }
        if self.low_cutoff >= self.high_cutoff {
            return Err(FingerprintError::parameter(
                "low_cutoff",
                format!(
                    "must be below high_cutoff ({} >= {})",
                    self.low_cutoff, self.high_cutoff
                ),
            ));
        }
        if self.order == 0 {
            return Err(FingerprintError::parameter("order", "must be at least 1"));
        }
        Ok(())
    }

    /// Filter gain at radial frequency `r`
    pub fn gain(&self, r: f64) -> f64 {
        if r <= 0.0 {
            return 0.0;
        }
        let n2 = 2 * self.order as i32;
        let low_pass = 1.0 / (1.0 + (r / self.high_cutoff as f64).powi(n2));
        let high_pass = 1.0 / (1.0 + (self.low_cutoff as f64 / r).powi(n2));
        low_pass * high_pass
    }
}

/// Band-pass filter an image in the frequency domain
///
/// The image is mirror-extended to twice its size so the FFT sees a
/// seamless periodic signal. The DC term is removed, so the output is
/// zero mean.
pub fn butterworth_bandpass(image: &Matrix<f32>, params: &ButterworthParams) -> Result<Matrix<f32>> {
    params.validate()?;
    let (width, height) = image.dimensions();
    let ext_w = width * 2;
    let ext_h = height * 2;

    // Step 1: mirror extension
    let mut data: Vec<Complex<f32>> = Vec::with_capacity(ext_w * ext_h);
    for y in 0..ext_h {
        let sy = if y < height { y } else { ext_h - 1 - y };
        for x in 0..ext_w {
            let sx = if x < width { x } else { ext_w - 1 - x };
            data.push(Complex::new(image.get(sx, sy), 0.0));
        }
    }

    let mut planner = FftPlanner::<f32>::new();
    let row_fwd = planner.plan_fft_forward(ext_w);
    let row_inv = planner.plan_fft_inverse(ext_w);
    let col_fwd = planner.plan_fft_forward(ext_h);
    let col_inv = planner.plan_fft_inverse(ext_h);

    // Step 2: forward FFT along rows, then along columns of the transpose
    data.par_chunks_mut(ext_w).for_each(|row| row_fwd.process(row));
    let mut cols = transpose(&data, ext_w, ext_h);
    cols.par_chunks_mut(ext_h).for_each(|col| col_fwd.process(col));

    // Step 3: apply the transfer function (cols is indexed [kx][ky])
    cols.par_chunks_mut(ext_h).enumerate().for_each(|(kx, col)| {
        let fx = signed_frequency(kx, ext_w);
        for (ky, value) in col.iter_mut().enumerate() {
            let fy = signed_frequency(ky, ext_h);
            *value *= params.gain((fx * fx + fy * fy).sqrt()) as f32;
        }
    });

    // Step 4: inverse transforms
    cols.par_chunks_mut(ext_h).for_each(|col| col_inv.process(col));
    let mut rows = transpose(&cols, ext_h, ext_w);
    rows.par_chunks_mut(ext_w).for_each(|row| row_inv.process(row));

    let scale = 1.0 / (ext_w * ext_h) as f32;
    let filtered = Matrix::from_fn(width, height, |x, y| rows[y * ext_w + x].re * scale);
    log::debug!(
        "butterworth: {}x{} band [{}, {}] order {}",
        width,
        height,
        params.low_cutoff,
        params.high_cutoff,
        params.order
    );
    Ok(filtered)
}

/// Frequency in cycles/pixel of FFT bin `k` out of `n`
fn signed_frequency(k: usize, n: usize) -> f64 {
    if k <= n / 2 {
        k as f64 / n as f64
    } else {
        (k as f64 - n as f64) / n as f64
    }
}

/// Transpose a row-major `width` x `height` buffer
fn transpose(data: &[Complex<f32>], width: usize, height: usize) -> Vec<Complex<f32>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    for y in 0..height {
        for x in 0..width {
            out[x * height + y] = data[y * width + x];
        }
    }
    out
}
