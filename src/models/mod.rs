pub mod fingerprint_class;
pub mod matrix;
pub mod minutia;
pub mod point;
pub mod singularity;

pub use fingerprint_class::FingerprintClass;
pub use matrix::{BitMatrix, Matrix};
pub use minutia::{Minutia, MinutiaKind, MinutiaRecord, MinutiaeExport, MinutiaeMaps};
pub use point::Point;
pub use singularity::{Singularity, SingularityKind, SingularityMaps};

/// 8-bit single-channel source image
pub type GrayscaleImage = Matrix<u8>;
/// Floating point working image
pub type FloatImage = Matrix<f32>;
/// Per-pixel ridge orientation in [0, pi)
pub type OrientationField = Matrix<f32>;
/// Per-pixel ridge frequency in cycles/pixel, 0 where rejected
pub type FrequencyField = Matrix<f32>;
/// Fingerprint (true) vs background (false)
pub type RoiMask = BitMatrix;
/// Binarized ridges (true = ridge)
pub type FilteredImage = BitMatrix;
/// Single-pixel-wide ridge lines
pub type SkeletonImage = BitMatrix;
