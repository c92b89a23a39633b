//! Image enhancement stages
//!
//! Each stage is a pure function from grids to a freshly allocated grid,
//! with its parameters validated on entry:
//! - [`normalize`]: mean/variance normalization
//! - [`butterworth`]: frequency-domain band-pass
//! - [`roi`]: variance based region of interest
//! - [`orientation`]: ridge orientation field
//! - [`frequency`]: ridge frequency field
//! - [`gabor`]: oriented Gabor binarization

pub mod butterworth;
pub mod frequency;
pub mod gabor;
pub mod normalize;
pub mod orientation;
pub mod roi;

pub use butterworth::{ButterworthParams, butterworth_bandpass};
pub use frequency::{FrequencyParams, estimate_frequency};
pub use gabor::{GaborParams, gabor_filter};
pub use normalize::{normalize, normalize_mean_variance};
pub use orientation::{OrientationParams, estimate_orientation};
pub use roi::{RoiParams, segment};

pub use crate::utils::binarization::{BradleyParams, bradley_binarize};
