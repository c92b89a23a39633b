//! Error types shared by every pipeline stage

use std::fmt;
use thiserror::Error;

/// Pipeline stage, used to report where a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Mean/variance normalization
    Normalize,
    /// Butterworth band-pass enhancement
    Butterworth,
    /// Region of interest segmentation
    RegionOfInterest,
    /// Ridge orientation estimation for enhancement
    Orientation,
    /// Ridge orientation estimation for singularity detection
    SingularityOrientation,
    /// Ridge frequency estimation
    Frequency,
    /// Ridge binarization (Gabor or Bradley)
    Binarize,
    /// Zhang-Suen thinning
    Thinning,
    /// Crossing-number minutiae extraction
    Minutiae,
    /// Poincare singularity detection and cleanup
    Singularities,
    /// Class assignment
    Classification,
}

impl Stage {
    /// Short human readable name
    pub fn name(self) -> &'static str {
        match self {
            Stage::Normalize => "normalization",
            Stage::Butterworth => "butterworth filter",
            Stage::RegionOfInterest => "region of interest",
            Stage::Orientation => "ridge orientation",
            Stage::SingularityOrientation => "singularity orientation",
            Stage::Frequency => "ridge frequency",
            Stage::Binarize => "ridge binarization",
            Stage::Thinning => "thinning",
            Stage::Minutiae => "minutiae extraction",
            Stage::Singularities => "singularity detection",
            Stage::Classification => "classification",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised at stage entry or at the IO boundary
#[derive(Error, Debug)]
pub enum FingerprintError {
    /// Input has the wrong sample type (e.g. 16-bit or float instead of 8-bit gray)
    #[error("Invalid type: {0}")]
    InvalidType(String),
    /// Input is not a single-channel 2D grid of the expected shape
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),
    /// An optional parameter is out of range
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// What was wrong with it
        reason: String,
    },
    /// Time budget elapsed or the analysis was cancelled
    #[error("{stage} exceeded its time budget")]
    DeadlineExceeded {
        /// Stage running when the deadline tripped
        stage: Stage,
    },
    /// A stage rejected its input
    #[error("{stage} failed: {source}")]
    StageFailed {
        /// Failing stage
        stage: Stage,
        /// Underlying error
        source: Box<FingerprintError>,
    },
    /// Image decoding/encoding failure
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// Filesystem failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Parameter or export (de)serialization failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FingerprintError {
    /// Tag the error with the stage that produced it (idempotent)
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            err @ FingerprintError::StageFailed { .. } => err,
            err @ FingerprintError::DeadlineExceeded { .. } => err,
            err => FingerprintError::StageFailed {
                stage,
                source: Box::new(err),
            },
        }
    }

    /// Stage that failed, if known
    pub fn stage(&self) -> Option<Stage> {
        match self {
            FingerprintError::StageFailed { stage, .. } => Some(*stage),
            FingerprintError::DeadlineExceeded { stage } => Some(*stage),
            _ => None,
        }
    }

    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        FingerprintError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate
pub type Result<T, E = FingerprintError> = std::result::Result<T, E>;

/// Reject a parameter that is not a finite, strictly positive number
pub(crate) fn ensure_positive(name: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FingerprintError::parameter(
            name,
            format!("expected a finite value > 0, got {value}"),
        ));
    }
    Ok(())
}

/// Reject a pair of grids whose shapes differ
pub(crate) fn ensure_same_shape(
    what: &str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<()> {
    if expected != actual {
        return Err(FingerprintError::InvalidDimensions(format!(
            "{what} is {}x{}, expected {}x{}",
            actual.0, actual.1, expected.0, expected.1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_stage_wraps_once() {
        let err = FingerprintError::InvalidDimensions("empty".into())
            .in_stage(Stage::Orientation)
            .in_stage(Stage::Frequency);
        assert_eq!(err.stage(), Some(Stage::Orientation));
        assert_eq!(
            err.to_string(),
            "ridge orientation failed: Invalid dimensions: empty"
        );
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("sigma", 1.0).is_ok());
        assert!(ensure_positive("sigma", 0.0).is_err());
        assert!(ensure_positive("sigma", f32::NAN).is_err());
    }
}
