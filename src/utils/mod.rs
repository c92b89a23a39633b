//! Numeric helpers shared by the enhancement and feature stages
//!
//! - Summed-area tables for windowed sums and variances
//! - Gaussian smoothing of float grids
//! - Global statistics and display rescaling
//! - Bradley adaptive binarization
//! - Deadlines for long running stages

pub mod binarization;
pub mod deadline;
pub mod gaussian;
pub mod integral;
pub mod stats;

pub use deadline::Deadline;
pub use gaussian::gaussian_blur;
pub use integral::IntegralImage;
pub use stats::rescale_to_u8;
