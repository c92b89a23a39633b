use serde::Serialize;

/// Integer pixel coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Point {
    /// X coordinate (column)
    pub x: i32,
    /// Y coordinate (row)
    pub y: i32,
}

impl Point {
    /// Create a new point
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Slope of the line from `self` to `other` in image coordinates (y grows downwards)
    ///
    /// A vertical line yields `+inf` when `other` lies below `self`.
    pub fn slope_to(&self, other: &Point) -> f32 {
        (other.y - self.y) as f32 / (other.x - self.x) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slope() {
        let core = Point::new(10, 10);
        assert_eq!(core.slope_to(&Point::new(12, 14)), 2.0);
        assert_eq!(core.slope_to(&Point::new(10, 20)), f32::INFINITY);
        assert_eq!(core.slope_to(&Point::new(10, 0)), f32::NEG_INFINITY);
    }
}
