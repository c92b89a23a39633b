/// Summed-area table over a grid of samples
///
/// Stored with one extra leading row and column of zeros so every
/// rectangle sum is four lookups with no edge cases.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    table: Vec<f64>,
}

impl IntegralImage {
    /// Build the table from `sample(x, y)` for every cell of a `width` x `height` grid
    pub fn new(width: usize, height: usize, sample: impl Fn(usize, usize) -> f64) -> Self {
        let stride = width + 1;
        let mut table = vec![0.0f64; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0.0;
            for x in 0..width {
                row_sum += sample(x, y);
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
            }
        }
        Self {
            width,
            height,
            table,
        }
    }

    /// Table over the squares of the samples
    pub fn squared(width: usize, height: usize, sample: impl Fn(usize, usize) -> f64) -> Self {
        Self::new(width, height, |x, y| {
            let v = sample(x, y);
            v * v
        })
    }

    /// Grid width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum over the half-open rectangle [x0, x1) x [y0, y1), clipped to the grid
    #[inline]
    pub fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return 0.0;
        }
        let stride = self.width + 1;
        self.table[y1 * stride + x1] - self.table[y0 * stride + x1] - self.table[y1 * stride + x0]
            + self.table[y0 * stride + x0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_sums() {
        // 1 2 3
        // 4 5 6
        let integral = IntegralImage::new(3, 2, |x, y| (y * 3 + x + 1) as f64);
        assert_eq!(integral.sum(0, 0, 3, 2), 21.0);
        assert_eq!(integral.sum(1, 0, 3, 2), 16.0);
        assert_eq!(integral.sum(1, 1, 2, 2), 5.0);
        assert_eq!(integral.sum(2, 2, 3, 3), 0.0);
        // Clipped to the grid
        assert_eq!(integral.sum(0, 1, 10, 10), 15.0);
    }

    #[test]
    fn test_squared() {
        let integral = IntegralImage::squared(2, 1, |x, _| x as f64 + 2.0);
        assert_eq!(integral.sum(0, 0, 2, 1), 13.0);
    }
}
