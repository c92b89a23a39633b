//! Feature extraction stages
//!
//! - [`thinning`]: Zhang-Suen skeletonization
//! - [`minutiae`]: crossing-number minutiae
//! - [`singularity`]: Poincare index cores and deltas, with cleanup
//! - [`classify`]: class assignment from singularities

pub mod classify;
pub mod minutiae;
pub mod singularity;
pub mod thinning;

pub use classify::{ClassifierParams, WhorlRule, classify_maps, classify_singularities};
pub use minutiae::extract_minutiae;
pub use singularity::{SingularityParams, cleanup, detect_singularities, poincare_index};
pub use thinning::{ThinningParams, thin};
