use serde::{Deserialize, Serialize};

use super::{BitMatrix, Matrix};

/// Kind of ridge discontinuity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinutiaKind {
    /// A ridge splitting into two (crossing number 6)
    Bifurcation,
    /// A ridge terminating (crossing number 2)
    RidgeEnding,
}

/// A minutia point feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Minutia {
    /// Column
    pub x: usize,
    /// Row
    pub y: usize,
    /// Bifurcation or ridge ending
    pub kind: MinutiaKind,
    /// Local ridge orientation in whole degrees, 0-179
    pub angle: Option<u16>,
}

/// Bifurcation and ridge-ending maps, both the size of the skeleton
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinutiaeMaps {
    /// Pixels with crossing number 6
    pub bifurcations: BitMatrix,
    /// Pixels with crossing number 2
    pub ridge_endings: BitMatrix,
}

impl MinutiaeMaps {
    /// Turn the maps into point records, attaching angles when an orientation field is given
    ///
    /// Bifurcations come first, each group in row-major order.
    pub fn to_minutiae(&self, orientation: Option<&Matrix<f32>>) -> Vec<Minutia> {
        let mut minutiae = Vec::new();
        for (map, kind) in [
            (&self.bifurcations, MinutiaKind::Bifurcation),
            (&self.ridge_endings, MinutiaKind::RidgeEnding),
        ] {
            for (x, y) in map.ones() {
                minutiae.push(Minutia {
                    x,
                    y,
                    kind,
                    angle: orientation.map(|o| angle_degrees(o.get(x, y))),
                });
            }
        }
        minutiae
    }
}

/// Convert an orientation in radians to truncated whole degrees, folding 180 onto 0
pub fn angle_degrees(theta: f32) -> u16 {
    let degrees = (theta.to_degrees() as i32).rem_euclid(180);
    degrees as u16
}

/// One exported minutia record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinutiaRecord {
    /// Column
    #[serde(rename = "X")]
    pub x: i64,
    /// Row
    #[serde(rename = "Y")]
    pub y: i64,
    /// Ridge orientation in degrees (not direction), 0-179
    pub angle: i64,
}

/// JSON export document: `{"bifurcations": [...], "ridgeEndings": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinutiaeExport {
    /// Bifurcation records
    pub bifurcations: Vec<MinutiaRecord>,
    /// Ridge ending records
    #[serde(rename = "ridgeEndings")]
    pub ridge_endings: Vec<MinutiaRecord>,
}

impl MinutiaeExport {
    /// Split minutiae by kind. Minutiae without an angle export angle 0.
    pub fn from_minutiae(minutiae: &[Minutia]) -> Self {
        let mut export = Self::default();
        for m in minutiae {
            let record = MinutiaRecord {
                x: m.x as i64,
                y: m.y as i64,
                angle: m.angle.unwrap_or(0) as i64,
            };
            match m.kind {
                MinutiaKind::Bifurcation => export.bifurcations.push(record),
                MinutiaKind::RidgeEnding => export.ridge_endings.push(record),
            }
        }
        export
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_angle_folding() {
        assert_eq!(angle_degrees(0.0), 0);
        assert_eq!(angle_degrees(1.0), 57);
        assert_eq!(angle_degrees(3.1416), 0);
        assert_eq!(angle_degrees(PI - 0.001), 179);
    }

    #[test]
    fn test_export_keys() {
        let minutiae = [
            Minutia {
                x: 3,
                y: 4,
                kind: MinutiaKind::Bifurcation,
                angle: Some(45),
            },
            Minutia {
                x: 7,
                y: 1,
                kind: MinutiaKind::RidgeEnding,
                angle: None,
            },
        ];
        let json = MinutiaeExport::from_minutiae(&minutiae).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"bifurcations":[{"X":3,"Y":4,"angle":45}],"ridgeEndings":[{"X":7,"Y":1,"angle":0}]}"#
        );
    }

    #[test]
    fn test_maps_to_minutiae() {
        let mut maps = MinutiaeMaps {
            bifurcations: BitMatrix::new(5, 5),
            ridge_endings: BitMatrix::new(5, 5),
        };
        maps.bifurcations.set(1, 2, true);
        maps.ridge_endings.set(4, 0, true);
        let orientation = Matrix::filled(5, 5, 0.8f32);

        let minutiae = maps.to_minutiae(Some(&orientation));
        assert_eq!(minutiae.len(), 2);
        assert_eq!(minutiae[0].kind, MinutiaKind::Bifurcation);
        assert_eq!((minutiae[0].x, minutiae[0].y), (1, 2));
        assert_eq!(minutiae[1].angle, Some(45)); // 0.8 rad = 45.8 degrees
    }
}
