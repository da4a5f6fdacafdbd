// Plane geometry helpers for point groups.
//
// Angles are in degrees, measured counter-clockwise from the positive x
// axis, matching the way expander templates are authored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    /// Cartesian point for a polar (radius, angle in degrees) pair.
    pub fn from_polar(radius: f32, angle_degrees: f32) -> Self {
        let radians = angle_degrees.to_radians();
        Point {
            x: radius * radians.cos(),
            y: radius * radians.sin(),
        }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn translate(self, by: Point) -> Point {
        Point {
            x: self.x + by.x,
            y: self.y + by.y,
        }
    }

    /// Linear interpolation: `fraction` 0 gives `self`, 1 gives `to`.
    pub fn lerp(self, to: Point, fraction: f32) -> Point {
        Point {
            x: self.x + (to.x - self.x) * fraction,
            y: self.y + (to.y - self.y) * fraction,
        }
    }
}

/// A point with the value it carries in a gamete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuedPoint {
    pub point: Point,
    pub value: u32,
}

pub fn lerp(from: f32, to: f32, fraction: f32) -> f32 {
    from + (to - from) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-5
    }

    #[test]
    fn test_from_polar() {
        assert!(close(Point::from_polar(2.0, 0.0), Point::new(2.0, 0.0)));
        assert!(close(Point::from_polar(1.0, 90.0), Point::new(0.0, 1.0)));
        assert!(close(Point::from_polar(1.0, 180.0), Point::new(-1.0, 0.0)));
    }

    #[test]
    fn test_distance_and_lerp() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
        assert!(close(a.lerp(b, 0.5), Point::new(1.5, 2.0)));
        assert!(close(a.translate(b), b));
        assert_eq!(lerp(2.0, 4.0, 0.25), 2.5);
    }
}
