use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{FingerprintError, Result, Stage};
use crate::models::BitMatrix;
use crate::utils::Deadline;

/// Neighbour offsets P2..P9 (dx, dy), clockwise starting north
pub const NEIGHBOURS: [(isize, isize); 8] = [
    (0, -1),  // P2  N
    (1, -1),  // P3  NE
    (1, 0),   // P4  E
    (1, 1),   // P5  SE
    (0, 1),   // P6  S
    (-1, 1),  // P7  SW
    (-1, 0),  // P8  W
    (-1, -1), // P9  NW
];

/// Thinning parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinningParams {
    /// Stop after this many full passes, `None` runs to convergence
    pub max_passes: Option<usize>,
}

impl Default for ThinningParams {
    fn default() -> Self {
        Self {
            max_passes: Some(1000),
        }
    }
}

impl ThinningParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_passes == Some(0) {
            return Err(FingerprintError::parameter("max_passes", "must be at least 1"));
        }
        Ok(())
    }
}

/// The 8 neighbours of an interior pixel in P2..P9 order, as 0/1
#[inline]
pub(crate) fn neighbourhood(image: &BitMatrix, x: usize, y: usize) -> [u8; 8] {
    let mut p = [0u8; 8];
    for (slot, (dx, dy)) in p.iter_mut().zip(NEIGHBOURS) {
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        *slot = (nx >= 0 && ny >= 0 && image.get(nx as usize, ny as usize)) as u8;
    }
    p
}

/// Number of 0 -> 1 steps walking P2..P9 and back to P2
#[inline]
fn zero_to_one_transitions(p: &[u8; 8]) -> usize {
    (0..8).filter(|&i| p[i] == 0 && p[(i + 1) % 8] == 1).count()
}

#[derive(Clone, Copy)]
enum SubIteration {
    First,
    Second,
}

impl SubIteration {
    #[inline]
    fn deletable(self, p: &[u8; 8]) -> bool {
        let count: u8 = p.iter().sum();
        if !(2..=6).contains(&count) || zero_to_one_transitions(p) != 1 {
            return false;
        }
        let [p2, _, p4, _, p6, _, p8, _] = *p;
        match self {
            SubIteration::First => p2 * p4 * p6 == 0 && p4 * p6 * p8 == 0,
            SubIteration::Second => p2 * p4 * p8 == 0 && p2 * p6 * p8 == 0,
        }
    }
}

/// Mark every deletable pixel against one snapshot, then clear them together
///
/// Returns the number of deleted pixels.
fn sub_iteration(image: &mut BitMatrix, step: SubIteration) -> usize {
    let (width, height) = image.dimensions();
    let snapshot: &BitMatrix = image;
    let marked: Vec<(usize, usize)> = (1..height.saturating_sub(1))
        .into_par_iter()
        .flat_map_iter(|y| {
            (1..width.saturating_sub(1))
                .filter(move |&x| {
                    snapshot.get(x, y) && step.deletable(&neighbourhood(snapshot, x, y))
                })
                .map(move |x| (x, y))
        })
        .collect();
    for &(x, y) in &marked {
        image.set(x, y, false);
    }
    marked.len()
}

/// Zhang-Suen thinning down to one-pixel-wide ridges
///
/// The one-pixel border is cleared first. Passes repeat until neither
/// sub-iteration deletes anything, or until `max_passes` is reached, in
/// which case the partially thinned image is returned.
pub fn thin(binary: &BitMatrix, params: &ThinningParams, deadline: &Deadline) -> Result<BitMatrix> {
    params.validate()?;
    let (width, height) = binary.dimensions();
    let mut image = BitMatrix::from_fn(width, height, |x, y| {
        x > 0 && y > 0 && x + 1 < width && y + 1 < height && binary.get(x, y)
    });

    let mut passes = 0usize;
    loop {
        deadline.check(Stage::Thinning)?;
        if params.max_passes.is_some_and(|max| passes >= max) {
            log::warn!("thinning: stopped after {passes} passes without converging");
            break;
        }
        passes += 1;
        let removed = sub_iteration(&mut image, SubIteration::First)
            + sub_iteration(&mut image, SubIteration::Second);
        if removed == 0 {
            break;
        }
    }

    log::debug!(
        "thinning: {} skeleton pixels after {passes} passes",
        image.count_ones()
    );
    Ok(image)
}
