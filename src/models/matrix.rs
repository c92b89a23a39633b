use crate::error::{FingerprintError, Result};

/// Dense row-major grid of numeric samples
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Copy> Matrix<T> {
    /// Create a matrix with every cell set to `value`
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wrap a row-major buffer, checking that it holds exactly `width * height` samples
    pub fn from_raw(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FingerprintError::InvalidDimensions(format!(
                "grid must be non-empty, got {width}x{height}"
            )));
        }
        if data.len() != width * height {
            return Err(FingerprintError::InvalidDimensions(format!(
                "buffer holds {} samples, expected {width}x{height} = {} (single channel)",
                data.len(),
                width * height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a matrix by evaluating `f(x, y)` for every cell
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// (width, height)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the sample at (x, y). Panics when out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[y * self.width + x]
    }

    /// Set the sample at (x, y). Panics when out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.data[y * self.width + x] = value;
    }

    /// One row of samples
    pub fn row(&self, y: usize) -> &[T] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Raw samples in row-major order
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume the matrix and return its buffer
    pub fn into_raw(self) -> Vec<T> {
        self.data
    }

    /// Apply `f` to every sample
    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Matrix<U> {
        Matrix {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Mirror the matrix left to right
    pub fn flip_horizontal(&self) -> Self {
        Self::from_fn(self.width, self.height, |x, y| {
            self.get(self.width - 1 - x, y)
        })
    }
}

impl Matrix<f32> {
    /// Multiply every sample by the mask (outside the mask becomes 0)
    pub fn masked(&self, mask: &BitMatrix) -> Self {
        Self::from_fn(self.width, self.height, |x, y| {
            if mask.get(x, y) { self.get(x, y) } else { 0.0 }
        })
    }
}

/// Compact bit matrix for storing binary data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    /// Create a new bit matrix with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Build a bit matrix by evaluating `f(x, y)` for every cell
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut matrix = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    matrix.set(x, y, true);
                }
            }
        }
        matrix
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// (width, height)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get bit at (x, y)
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        (self.data[byte_index] >> bit_index) & 1 == 1
    }

    /// Set bit at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        if value {
            self.data[byte_index] |= 1 << bit_index;
        } else {
            self.data[byte_index] &= !(1 << bit_index);
        }
    }

    /// Clear all bits to 0
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Positions of set bits as (x, y), in row-major order
    pub fn ones(&self) -> Vec<(usize, usize)> {
        let mut points = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    points.push((x, y));
                }
            }
        }
        points
    }

    /// Number of set bits inside the half-open rectangle [x0, x1) x [y0, y1)
    pub fn count_in(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> usize {
        let mut count = 0;
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                if self.get(x, y) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Positions of set bits inside the half-open rectangle [x0, x1) x [y0, y1)
    pub fn ones_in(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> Vec<(usize, usize)> {
        let mut points = Vec::new();
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                if self.get(x, y) {
                    points.push((x, y));
                }
            }
        }
        points
    }

    /// Clear every bit inside the half-open rectangle [x0, x1) x [y0, y1)
    pub fn clear_in(&mut self, x0: usize, y0: usize, x1: usize, y1: usize) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                self.set(x, y, false);
            }
        }
    }

    /// Bitwise AND with another matrix of the same size
    pub fn and(&self, other: &BitMatrix) -> BitMatrix {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        BitMatrix {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a & b)
                .collect(),
        }
    }

    /// Get raw data as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
