use serde::Serialize;

use super::BitMatrix;

/// Kind of orientation-field singularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SingularityKind {
    /// Poincare index in [-1, -0.5]
    Core,
    /// Poincare index in [0.5, 1]
    Delta,
}

/// A core or delta location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Singularity {
    /// Column
    pub x: usize,
    /// Row
    pub y: usize,
    /// Core or delta
    pub kind: SingularityKind,
}

/// Core and delta maps, both the size of the orientation field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingularityMaps {
    /// Pixels marked as cores
    pub cores: BitMatrix,
    /// Pixels marked as deltas
    pub deltas: BitMatrix,
}

impl SingularityMaps {
    /// Number of cores
    pub fn core_count(&self) -> usize {
        self.cores.count_ones()
    }

    /// Number of deltas
    pub fn delta_count(&self) -> usize {
        self.deltas.count_ones()
    }

    /// Restrict both maps to a region of interest
    pub fn masked(&self, mask: &BitMatrix) -> Self {
        Self {
            cores: self.cores.and(mask),
            deltas: self.deltas.and(mask),
        }
    }

    /// Cores followed by deltas, each in row-major order
    pub fn to_singularities(&self) -> Vec<Singularity> {
        let cores = self.cores.ones().into_iter().map(|(x, y)| Singularity {
            x,
            y,
            kind: SingularityKind::Core,
        });
        let deltas = self.deltas.ones().into_iter().map(|(x, y)| Singularity {
            x,
            y,
            kind: SingularityKind::Delta,
        });
        cores.chain(deltas).collect()
    }
}
