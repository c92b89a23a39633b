use serde::{Deserialize, Serialize};

use crate::error::{Result, ensure_positive};
use crate::models::{BitMatrix, FingerprintClass, Point, SingularityMaps};

/// Which singularity counts make a whorl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhorlRule {
    /// Two cores and two deltas
    #[default]
    CoresAndDeltas,
    /// Two cores, any number of deltas
    CoresOnly,
}

/// Classifier parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    /// Core-to-delta slope magnitude separating loops from tented arches
    pub loop_slope: f32,
    /// Counts accepted as a whorl
    pub whorl_rule: WhorlRule,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            loop_slope: 1.5,
            whorl_rule: WhorlRule::CoresAndDeltas,
        }
    }
}

impl ClassifierParams {
    /// Steeper loop threshold from the later rule revision
    pub fn revised() -> Self {
        Self {
            loop_slope: 2.5,
            whorl_rule: WhorlRule::CoresOnly,
        }
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        ensure_positive("loop_slope", self.loop_slope)
    }
}

/// Assign a class from singularity counts and the core/delta geometry
///
/// One core and one delta split on the slope from core to delta in image
/// coordinates: steeply down-right (or straight down) is a left loop,
/// steeply down-left a right loop, anything flatter a tented arch.
pub fn classify_singularities(
    cores: &[Point],
    deltas: &[Point],
    params: &ClassifierParams,
) -> Result<FingerprintClass> {
    params.validate()?;
    let class = match (cores.len(), deltas.len()) {
        (0, 0) => FingerprintClass::Arch,
        (1, 1) => {
            let slope = cores[0].slope_to(&deltas[0]);
            if slope >= params.loop_slope {
                FingerprintClass::LeftLoop
            } else if slope <= -params.loop_slope {
                FingerprintClass::RightLoop
            } else {
                FingerprintClass::TentedArch
            }
        }
        (2, 2) => FingerprintClass::WhorlOrTwinLoop,
        (2, _) if params.whorl_rule == WhorlRule::CoresOnly => FingerprintClass::WhorlOrTwinLoop,
        _ => FingerprintClass::Unknown,
    };
    Ok(class)
}

/// Classify from singularity maps
pub fn classify_maps(maps: &SingularityMaps, params: &ClassifierParams) -> Result<FingerprintClass> {
    let to_points = |m: &BitMatrix| -> Vec<Point> {
        m.ones()
            .into_iter()
            .map(|(x, y)| Point::new(x as i32, y as i32))
            .collect()
    };
    let cores = to_points(&maps.cores);
    let deltas = to_points(&maps.deltas);
    classify_singularities(&cores, &deltas, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(cores: &[(i32, i32)], deltas: &[(i32, i32)]) -> FingerprintClass {
        let cores: Vec<_> = cores.iter().map(|&(x, y)| Point::new(x, y)).collect();
        let deltas: Vec<_> = deltas.iter().map(|&(x, y)| Point::new(x, y)).collect();
        classify_singularities(&cores, &deltas, &ClassifierParams::default()).unwrap()
    }

    #[test]
    fn test_arch() {
        assert_eq!(classify(&[], &[]), FingerprintClass::Arch);
    }

    #[test]
    fn test_loops() {
        // Delta straight below the core: slope +inf
        assert_eq!(classify(&[(50, 40)], &[(50, 90)]), FingerprintClass::LeftLoop);
        assert_eq!(classify(&[(50, 40)], &[(60, 60)]), FingerprintClass::LeftLoop);
        assert_eq!(classify(&[(50, 40)], &[(40, 60)]), FingerprintClass::RightLoop);
        assert_eq!(classify(&[(50, 40)], &[(70, 50)]), FingerprintClass::TentedArch);
        // Same point gives NaN, which matches no loop rule
        assert_eq!(classify(&[(5, 5)], &[(5, 5)]), FingerprintClass::TentedArch);
    }

    #[test]
    fn test_whorl_and_unknown() {
        assert_eq!(
            classify(&[(1, 1), (9, 9)], &[(3, 3), (7, 7)]),
            FingerprintClass::WhorlOrTwinLoop
        );
        assert_eq!(classify(&[(1, 1), (9, 9)], &[]), FingerprintClass::Unknown);
        assert_eq!(classify(&[(1, 1)], &[]), FingerprintClass::Unknown);
        assert_eq!(classify(&[], &[(1, 1), (2, 2)]), FingerprintClass::Unknown);
    }

    #[test]
    fn test_revised_rules() {
        let params = ClassifierParams::revised();
        let core = [Point::new(50, 40)];
        // Slope 2 is a loop under 1.5 but a tented arch under 2.5
        let delta = [Point::new(60, 60)];
        assert_eq!(
            classify_singularities(&core, &delta, &params).unwrap(),
            FingerprintClass::TentedArch
        );
        let cores = [Point::new(1, 1), Point::new(9, 9)];
        assert_eq!(
            classify_singularities(&cores, &[], &params).unwrap(),
            FingerprintClass::WhorlOrTwinLoop
        );
    }

    #[test]
    fn test_classify_maps() {
        let mut maps = SingularityMaps {
            cores: BitMatrix::new(20, 20),
            deltas: BitMatrix::new(20, 20),
        };
        maps.cores.set(5, 2, true);
        maps.deltas.set(5, 15, true);
        assert_eq!(
            classify_maps(&maps, &ClassifierParams::default()).unwrap(),
            FingerprintClass::LeftLoop
        );
    }
}
