use serde::{Deserialize, Serialize};

use crate::error::{FingerprintError, Result};
use crate::models::{BitMatrix, Matrix};
use crate::utils::IntegralImage;
use crate::utils::stats::min_max;

/// Side of the variance patch and of the decision tile
pub const ROI_BLOCK: usize = 16;

/// Region of interest parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiParams {
    /// Minimum mean normalized variance of a tile, in (0, 1]
    pub threshold: f32,
}

impl Default for RoiParams {
    fn default() -> Self {
        Self { threshold: 0.1 }
    }
}

impl RoiParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(FingerprintError::parameter(
                "threshold",
                format!("expected a value in (0, 1], got {}", self.threshold),
            ));
        }
        Ok(())
    }
}

/// Segment fingerprint texture from background by local variance
///
/// Every 16x16 sliding patch contributes one variance sample. The
/// variance map is min-max normalized, split into 16x16 tiles, and a tile
/// is foreground when its mean exceeds the threshold. The map is 15
/// pixels short on the bottom and right edges, which are filled by
/// replicating the last row and column.
pub fn segment(image: &Matrix<f32>, params: &RoiParams) -> Result<BitMatrix> {
    params.validate()?;
    let (width, height) = image.dimensions();
    if width < ROI_BLOCK || height < ROI_BLOCK {
        return Err(FingerprintError::InvalidDimensions(format!(
            "image is {width}x{height}, region of interest needs at least {ROI_BLOCK}x{ROI_BLOCK}"
        )));
    }

    // Step 1: variance of every patch
    let sums = IntegralImage::new(width, height, |x, y| image.get(x, y) as f64);
    let squares = IntegralImage::squared(width, height, |x, y| image.get(x, y) as f64);
    let var_w = width - ROI_BLOCK + 1;
    let var_h = height - ROI_BLOCK + 1;
    let n = (ROI_BLOCK * ROI_BLOCK) as f64;
    let variance = Matrix::from_fn(var_w, var_h, |x, y| {
        let s = sums.sum(x, y, x + ROI_BLOCK, y + ROI_BLOCK) / n;
        let sq = squares.sum(x, y, x + ROI_BLOCK, y + ROI_BLOCK) / n;
        (sq - s * s).max(0.0) as f32
    });

    // Step 2: min-max normalize
    let (lo, hi) = min_max(variance.as_slice()).unwrap_or((0.0, 0.0));
    let normalized = if hi > lo {
        variance.map(|v| (v - lo) / (hi - lo))
    } else {
        log::debug!("roi: flat variance map ({lo})");
        let fill = if hi > 0.0 { 1.0 } else { 0.0 };
        variance.map(|_| fill)
    };

    // Step 3: tile decisions on the variance map
    let mut tiles = BitMatrix::new(var_w, var_h);
    for ty in (0..var_h).step_by(ROI_BLOCK) {
        for tx in (0..var_w).step_by(ROI_BLOCK) {
            let x1 = (tx + ROI_BLOCK).min(var_w);
            let y1 = (ty + ROI_BLOCK).min(var_h);
            let mut total = 0.0f64;
            for y in ty..y1 {
                for x in tx..x1 {
                    total += normalized.get(x, y) as f64;
                }
            }
            let mean = total / ((x1 - tx) * (y1 - ty)) as f64;
            if mean > params.threshold as f64 {
                for y in ty..y1 {
                    for x in tx..x1 {
                        tiles.set(x, y, true);
                    }
                }
            }
        }
    }

    // Step 4: edge-replicate back to the image size
    let mask = BitMatrix::from_fn(width, height, |x, y| {
        tiles.get(x.min(var_w - 1), y.min(var_h - 1))
    });
    log::debug!(
        "roi: {} of {} pixels in region",
        mask.count_ones(),
        width * height
    );
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Textured left half, flat right half
    fn half_textured(width: usize, height: usize) -> Matrix<f32> {
        Matrix::from_fn(width, height, |x, y| {
            if x < width / 2 {
                if (x / 3 + y / 3) % 2 == 0 { 200.0 } else { 30.0 }
            } else {
                100.0
            }
        })
    }

    #[test]
    fn test_mask_matches_image_size() {
        let image = half_textured(70, 50);
        let mask = segment(&image, &RoiParams::default()).unwrap();
        assert_eq!(mask.dimensions(), (70, 50));
    }

    #[test]
    fn test_texture_is_foreground() {
        let image = half_textured(96, 64);
        let mask = segment(&image, &RoiParams::default()).unwrap();
        assert!(mask.get(5, 5));
        assert!(mask.get(20, 40));
        assert!(!mask.get(90, 10));
        assert!(!mask.get(95, 63));
    }

    #[test]
    fn test_tiles_are_uniform() {
        let image = half_textured(96, 64);
        let mask = segment(&image, &RoiParams::default()).unwrap();
        for ty in (0..64 - ROI_BLOCK + 1).step_by(ROI_BLOCK) {
            for tx in (0..96 - ROI_BLOCK + 1).step_by(ROI_BLOCK) {
                let first = mask.get(tx, ty);
                let x1 = (tx + ROI_BLOCK).min(96 - ROI_BLOCK + 1);
                let y1 = (ty + ROI_BLOCK).min(64 - ROI_BLOCK + 1);
                for y in ty..y1 {
                    for x in tx..x1 {
                        assert_eq!(mask.get(x, y), first);
                    }
                }
            }
        }
    }

    #[test]
    fn test_rejects_small_image_and_bad_threshold() {
        let small = Matrix::filled(10, 40, 0.0f32);
        assert!(matches!(
            segment(&small, &RoiParams::default()),
            Err(FingerprintError::InvalidDimensions(_))
        ));
        let image = Matrix::filled(32, 32, 0.0f32);
        assert!(segment(&image, &RoiParams { threshold: 0.0 }).is_err());
        assert!(segment(&image, &RoiParams { threshold: 1.5 }).is_err());
    }
}
