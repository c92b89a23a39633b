use crate::models::Matrix;

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Population variance, 0 for an empty slice
pub fn variance(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values
        .iter()
        .map(|&v| {
            let d = v as f64 - m;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64
}

/// (min, max) of the slice, `None` when empty
pub fn min_max(values: &[f32]) -> Option<(f32, f32)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

/// Linearly stretch a float grid onto [0, 255] with rounding
///
/// A flat grid maps to all zeros.
pub fn rescale_to_u8(grid: &Matrix<f32>) -> Matrix<u8> {
    let Some((lo, hi)) = min_max(grid.as_slice()) else {
        return grid.map(|_| 0);
    };
    let range = hi - lo;
    if range <= 0.0 || !range.is_finite() {
        return grid.map(|_| 0);
    }
    grid.map(|v| ((v - lo) * 255.0 / range).round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(variance(&values), 4.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min_max(&[3.0, -1.0, 2.0]), Some((-1.0, 3.0)));
        assert_eq!(min_max(&[]), None);
    }

    #[test]
    fn test_rescale_to_u8() {
        let grid = Matrix::from_raw(3, 1, vec![-1.0f32, 0.0, 1.0]).unwrap();
        assert_eq!(rescale_to_u8(&grid).as_slice(), &[0, 128, 255]);

        let flat = Matrix::filled(2, 2, 7.0f32);
        assert_eq!(rescale_to_u8(&flat).as_slice(), &[0, 0, 0, 0]);
    }
}
