//! Synthetic fingerprint-like images with known ground truth

use std::f64::consts::PI;

use crate::models::Matrix;

/// Straight cosine ridges along `angle` (radians from +x towards +y)
///
/// Intensity is `127 + 100 cos(2 pi d / period)` where `d` is the signed
/// distance across the ridges, so the ridge orientation is `angle` mod pi.
pub fn parallel_ridges(width: usize, height: usize, angle: f32, period: f32) -> Matrix<f32> {
    let (sin, cos) = (angle as f64).sin_cos();
    let period = period as f64;
    Matrix::from_fn(width, height, |x, y| {
        let across = -(x as f64) * sin + y as f64 * cos;
        (127.0 + 100.0 * (2.0 * PI * across / period).cos()) as f32
    })
}

/// [`parallel_ridges`] quantized to 8 bits
pub fn parallel_ridges_u8(width: usize, height: usize, angle: f32, period: f32) -> Matrix<u8> {
    parallel_ridges(width, height, angle, period).map(to_u8)
}

/// Plain arch: horizontal ridges with a smooth bump in the middle
///
/// Ridge period 8 px, bump height 12 px with a 40 px Gaussian profile
/// centred on the middle column. The orientation field has no singular
/// points anywhere.
pub fn arch_pattern(width: usize, height: usize) -> Matrix<u8> {
    let centre = width as f64 / 2.0;
    Matrix::from_fn(width, height, |x, y| {
        let bump = 12.0 * (-((x as f64 - centre) / 40.0).powi(2)).exp();
        to_u8((127.0 + 100.0 * (2.0 * PI * (y as f64 + bump) / 8.0).cos()) as f32)
    })
}

/// Dark background with a ridge patch in the centre
///
/// Useful for region of interest checks: the patch covers the middle
/// half of the image in both directions.
pub fn ridge_patch(width: usize, height: usize, angle: f32, period: f32) -> Matrix<u8> {
    let ridges = parallel_ridges(width, height, angle, period);
    Matrix::from_fn(width, height, |x, y| {
        let inside = (width / 4..3 * width / 4).contains(&x) && (height / 4..3 * height / 4).contains(&y);
        if inside { to_u8(ridges.get(x, y)) } else { 127 }
    })
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
