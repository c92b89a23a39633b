//! Ridgeprint - fingerprint feature extraction
//!
//! A pure Rust pipeline that takes an 8-bit grayscale fingerprint and
//! produces its enhancement grids, skeleton, minutiae, cores and deltas,
//! and a coarse class. Every stage is a pure function of its inputs, so
//! independent images can be processed in parallel.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Stage output memoization owned by the caller
pub mod cache;
/// Pipeline parameters (JSON and environment)
pub mod config;
/// Enhancement stages (normalization, band-pass, ROI, orientation, frequency, Gabor)
pub mod enhance;
/// Error taxonomy
pub mod error;
/// Feature stages (thinning, minutiae, singularities, classification)
pub mod features;
/// Core data structures (Matrix, BitMatrix, Minutia, FingerprintClass, etc.)
pub mod models;
/// Stage composition and batch analysis
pub mod pipeline;
/// IO helpers and synthetic images for binaries, tests and benches
pub mod tools;
/// Utility functions (integral images, smoothing, statistics, deadlines)
pub mod utils;

pub use cache::{Analyzer, DEFAULT_IMAGE_CAPACITY, StageCache};
pub use config::{PipelineParams, RidgeBinarizer, env_params};
pub use error::{FingerprintError, Result, Stage};
pub use models::{
    BitMatrix, FingerprintClass, Matrix, Minutia, MinutiaKind, MinutiaeExport, Point,
    Singularity, SingularityKind,
};
pub use pipeline::{
    Analysis, Classification, analyze_batch, analyze_image, classify_batch, classify_image,
};

use pipeline::grayscale_from_raw;

/// Analyze a grayscale image
///
/// # Arguments
/// * `image` - Raw 8-bit grayscale bytes (1 byte per pixel, row-major)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Returns
/// Every stage grid plus minutiae, singularities and class
///
/// Parameters come from the `FP_*` environment variables on top of the defaults.
pub fn analyze(image: &[u8], width: usize, height: usize) -> Result<Analysis> {
    let gray = grayscale_from_raw(image, width, height)?;
    analyze_image(&gray, env_params())
}

/// Classify a grayscale image, skipping the minutiae branch of the pipeline
///
/// Takes the same raw layout as [`analyze`].
pub fn classify(image: &[u8], width: usize, height: usize) -> Result<FingerprintClass> {
    let gray = grayscale_from_raw(image, width, height)?;
    Ok(classify_image(&gray, env_params())?.class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_buffer_is_rejected() {
        // Three bytes per pixel is not a single-channel image
        let rgb = vec![128u8; 32 * 32 * 3];
        let err = analyze(&rgb, 32, 32).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Normalize));
        assert!(matches!(
            err,
            FingerprintError::StageFailed { ref source, .. }
                if matches!(**source, FingerprintError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_classify_raw_arch() {
        let image = tools::synthetic::arch_pattern(160, 160);
        let class = classify(image.as_slice(), 160, 160).unwrap();
        assert_eq!(class, FingerprintClass::Arch);
    }
}
