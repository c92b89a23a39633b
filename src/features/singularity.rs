use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

use crate::error::{FingerprintError, Result, Stage, ensure_same_shape};
use crate::models::{BitMatrix, Matrix, SingularityMaps};
use crate::utils::Deadline;

/// Ring walked around a pixel (dx, dy), closing back on the first entry
const RING: [(isize, isize); 8] = [
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Slack on the outer bounds of the index ranges to absorb rounding
const INDEX_TOLERANCE: f32 = 1e-4;

/// Singularity detection and cleanup parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingularityParams {
    /// Half side of the square cleanup region
    pub region_size: usize,
    /// Drop singularities whose region leaves the region of interest
    pub use_mask: bool,
    /// Zero the background before estimating the singularity orientation field
    ///
    /// Off by default, so the border of the region of interest adds no
    /// orientation jumps of its own.
    pub mask_orientation_input: bool,
}

impl Default for SingularityParams {
    fn default() -> Self {
        Self {
            region_size: 8,
            use_mask: true,
            mask_orientation_input: false,
        }
    }
}

impl SingularityParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.region_size == 0 {
            return Err(FingerprintError::parameter("region_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// Wrap an orientation difference into (-pi/2, pi/2]
#[inline]
fn wrap_difference(d: f32) -> f32 {
    if d <= -FRAC_PI_2 {
        d + PI
    } else if d > FRAC_PI_2 {
        d - PI
    } else {
        d
    }
}

/// Poincare index of an interior pixel: the wrapped orientation change around
/// its 8-neighbour ring, in units of pi
pub fn poincare_index(orientation: &Matrix<f32>, x: usize, y: usize) -> f32 {
    let sample = |i: usize| {
        let (dx, dy) = RING[i % 8];
        orientation.get((x as isize + dx) as usize, (y as isize + dy) as usize)
    };
    let total: f32 = (0..8).map(|i| wrap_difference(sample(i + 1) - sample(i))).sum();
    total / PI
}

/// Mark cores (index in [-1, -0.5]) and deltas (index in [0.5, 1])
pub fn detect_singularities(orientation: &Matrix<f32>, deadline: &Deadline) -> Result<SingularityMaps> {
    let (width, height) = orientation.dimensions();
    let mut cores = BitMatrix::new(width, height);
    let mut deltas = BitMatrix::new(width, height);
    if width < 3 || height < 3 {
        return Ok(SingularityMaps { cores, deltas });
    }

    let rows: Vec<(Vec<usize>, Vec<usize>)> = (1..height - 1)
        .into_par_iter()
        .map(|y| {
            deadline.check(Stage::Singularities)?;
            let mut row_cores = Vec::new();
            let mut row_deltas = Vec::new();
            for x in 1..width - 1 {
                let index = poincare_index(orientation, x, y);
                if (-1.0 - INDEX_TOLERANCE..=-0.5).contains(&index) {
                    row_cores.push(x);
                } else if (0.5..=1.0 + INDEX_TOLERANCE).contains(&index) {
                    row_deltas.push(x);
                }
            }
            Ok((row_cores, row_deltas))
        })
        .collect::<Result<_>>()?;

    for (offset, (row_cores, row_deltas)) in rows.iter().enumerate() {
        let y = offset + 1;
        for &x in row_cores {
            cores.set(x, y, true);
        }
        for &x in row_deltas {
            deltas.set(x, y, true);
        }
    }
    log::debug!(
        "poincare: {} core and {} delta pixels",
        cores.count_ones(),
        deltas.count_ones()
    );
    Ok(SingularityMaps { cores, deltas })
}

/// Half-open region [x0, x1) x [y0, y1) around a point, clipped to the grid
fn region(x: usize, y: usize, size: usize, width: usize, height: usize) -> (usize, usize, usize, usize) {
    (
        x.saturating_sub(size),
        y.saturating_sub(size),
        (x + size).min(width),
        (y + size).min(height),
    )
}

/// Collapse clusters of one singularity type to their centre of mass
///
/// Points are visited in row-major order of the input. Whenever a region
/// holds more than one point, the region is cleared and its truncated
/// centroid set.
pub fn average_singularities(points: &BitMatrix, region_size: usize) -> BitMatrix {
    let (width, height) = points.dimensions();
    let mut out = points.clone();
    for (x, y) in points.ones() {
        let (x0, y0, x1, y1) = region(x, y, region_size, width, height);
        let members = out.ones_in(x0, y0, x1, y1);
        if members.len() <= 1 {
            continue;
        }
        let n = members.len();
        let cx = members.iter().map(|p| p.0).sum::<usize>() / n;
        let cy = members.iter().map(|p| p.1).sum::<usize>() / n;
        out.clear_in(x0, y0, x1, y1);
        out.set(cx, cy, true);
    }
    out
}

/// Remove core/delta pairs that share a region
///
/// For every core, when both maps have a point in its region, both regions
/// are cleared.
pub fn delete_pairs(
    cores: &BitMatrix,
    deltas: &BitMatrix,
    region_size: usize,
) -> Result<(BitMatrix, BitMatrix)> {
    ensure_same_shape("delta map", cores.dimensions(), deltas.dimensions())?;
    let (width, height) = cores.dimensions();
    let mut cores_out = cores.clone();
    let mut deltas_out = deltas.clone();
    for (x, y) in cores.ones() {
        let (x0, y0, x1, y1) = region(x, y, region_size, width, height);
        if cores_out.count_in(x0, y0, x1, y1) >= 1 && deltas_out.count_in(x0, y0, x1, y1) >= 1 {
            cores_out.clear_in(x0, y0, x1, y1);
            deltas_out.clear_in(x0, y0, x1, y1);
        }
    }
    Ok((cores_out, deltas_out))
}

/// Remove singularities whose region reaches outside the mask
pub fn delete_near_mask(points: &BitMatrix, mask: &BitMatrix, region_size: usize) -> Result<BitMatrix> {
    ensure_same_shape("mask", points.dimensions(), mask.dimensions())?;
    let (width, height) = points.dimensions();
    let mut out = points.clone();
    for (x, y) in points.ones() {
        let (x0, y0, x1, y1) = region(x, y, region_size, width, height);
        let area = (x1 - x0) * (y1 - y0);
        if mask.count_in(x0, y0, x1, y1) != area {
            out.set(x, y, false);
        }
    }
    Ok(out)
}

/// Average clusters, delete core/delta pairs, then (with a mask) drop points near the background
pub fn cleanup(
    maps: &SingularityMaps,
    mask: Option<&BitMatrix>,
    params: &SingularityParams,
) -> Result<SingularityMaps> {
    params.validate()?;
    let size = params.region_size;
    let cores = average_singularities(&maps.cores, size);
    let deltas = average_singularities(&maps.deltas, size);
    let (mut cores, mut deltas) = delete_pairs(&cores, &deltas, size)?;
    if let Some(mask) = mask {
        cores = delete_near_mask(&cores, mask, size)?;
        deltas = delete_near_mask(&deltas, mask, size)?;
    }
    log::debug!(
        "singularity cleanup: {} cores, {} deltas",
        cores.count_ones(),
        deltas.count_ones()
    );
    Ok(SingularityMaps { cores, deltas })
}
