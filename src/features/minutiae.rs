use crate::error::{Result, ensure_same_shape};
use crate::models::{BitMatrix, MinutiaeMaps};

use super::thinning::neighbourhood;

/// Crossing number marking a bifurcation
pub const BIFURCATION_CROSSINGS: u8 = 6;
/// Crossing number marking a ridge ending
pub const RIDGE_ENDING_CROSSINGS: u8 = 2;

/// Number of 0/1 changes walking the 8 neighbours in a circle
#[inline]
pub fn crossing_number(p: &[u8; 8]) -> u8 {
    (0..8).map(|i| p[i].abs_diff(p[(i + 1) % 8])).sum()
}

/// Find bifurcations and ridge endings in a skeleton
///
/// Border pixels are never minutiae. With a mask, points outside it are
/// dropped.
pub fn extract_minutiae(skeleton: &BitMatrix, mask: Option<&BitMatrix>) -> Result<MinutiaeMaps> {
    if let Some(mask) = mask {
        ensure_same_shape("mask", skeleton.dimensions(), mask.dimensions())?;
    }
    let (width, height) = skeleton.dimensions();
    let mut bifurcations = BitMatrix::new(width, height);
    let mut ridge_endings = BitMatrix::new(width, height);

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            if !skeleton.get(x, y) || mask.is_some_and(|m| !m.get(x, y)) {
                continue;
            }
            match crossing_number(&neighbourhood(skeleton, x, y)) {
                BIFURCATION_CROSSINGS => bifurcations.set(x, y, true),
                RIDGE_ENDING_CROSSINGS => ridge_endings.set(x, y, true),
                _ => {}
            }
        }
    }

    log::debug!(
        "minutiae: {} bifurcations, {} ridge endings",
        bifurcations.count_ones(),
        ridge_endings.count_ones()
    );
    Ok(MinutiaeMaps {
        bifurcations,
        ridge_endings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn y_shape() -> BitMatrix {
        let mut skeleton = BitMatrix::new(21, 21);
        skeleton.set(10, 10, true);
        for y in 11..19 {
            skeleton.set(10, y, true);
        }
        for k in 1..8 {
            skeleton.set(10 - k, 10 - k, true);
            skeleton.set(10 + k, 10 - k, true);
        }
        skeleton
    }

    #[test]
    fn test_straight_line() {
        let line = BitMatrix::from_fn(20, 11, |x, y| y == 5 && (3..17).contains(&x));
        let maps = extract_minutiae(&line, None).unwrap();
        assert_eq!(maps.bifurcations.count_ones(), 0);
        assert_eq!(maps.ridge_endings.ones(), vec![(3, 5), (16, 5)]);
    }

    #[test]
    fn test_y_shape() {
        let maps = extract_minutiae(&y_shape(), None).unwrap();
        assert_eq!(maps.bifurcations.ones(), vec![(10, 10)]);
        assert_eq!(maps.ridge_endings.ones(), vec![(3, 3), (17, 3), (10, 18)]);
    }

    #[test]
    fn test_mask_drops_points() {
        let mask = BitMatrix::from_fn(21, 21, |_, y| y > 5);
        let maps = extract_minutiae(&y_shape(), Some(&mask)).unwrap();
        assert_eq!(maps.bifurcations.count_ones(), 1);
        assert_eq!(maps.ridge_endings.ones(), vec![(10, 18)]);
    }

    #[test]
    fn test_crossing_number() {
        assert_eq!(crossing_number(&[1, 0, 0, 0, 0, 0, 0, 0]), 2);
        assert_eq!(crossing_number(&[1, 0, 0, 1, 0, 1, 0, 0]), 6);
        assert_eq!(crossing_number(&[1; 8]), 0);
    }
}
