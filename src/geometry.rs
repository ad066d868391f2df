//! 2D geometry used by plate and river generation.
//!
//! All positions inside a plate are plate-local block coordinates stored as f64,
//! with `y` holding the world Z axis.

use std::ops::{Add, AddAssign, Mul, Sub};

/// A 2D vector / point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(&self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(&self, other: Vec2) -> f64 {
        (*self - other).length()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 1e-9 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            Self::ZERO
        }
    }

    /// Rotated 90 degrees counter-clockwise.
    pub fn perpendicular(&self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    pub fn lerp(&self, other: Vec2, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Unit vector for a heading in degrees (0 = +X, 90 = +Z).
pub fn degrees_to_normal(degrees: f64) -> Vec2 {
    let radians = degrees.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

/// Heading in degrees of a direction vector. Inverse of [`degrees_to_normal`].
pub fn normal_to_degrees(normal: Vec2) -> f64 {
    normal.y.atan2(normal.x).to_degrees()
}

/// Whether segment `a1-a2` touches or crosses segment `b1-b2`.
pub fn line_intersects(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    // Collinear touching cases
    (d1 == 0.0 && on_segment(b1, b2, a1))
        || (d2 == 0.0 && on_segment(b1, b2, a2))
        || (d3 == 0.0 && on_segment(a1, a2, b1))
        || (d4 == 0.0 && on_segment(a1, a2, b2))
}

fn orientation(a: Vec2, b: Vec2, p: Vec2) -> f64 {
    (b - a).cross(p - a)
}

fn on_segment(a: Vec2, b: Vec2, p: Vec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Parameter of `point` projected onto the infinite line `a -> b`.
/// 0 at `a`, 1 at `b`. Degenerate lines project to 0.
pub fn projection(point: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq < 1e-12 {
        return 0.0;
    }
    (point - a).dot(ab) / len_sq
}

/// Distance from `point` to the segment `a-b`.
pub fn distance_to_line(point: Vec2, a: Vec2, b: Vec2) -> f64 {
    let t = projection(point, a, b).clamp(0.0, 1.0);
    point.distance(a.lerp(b, t))
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Where `value` lies between `a` and `b`; unclamped.
pub fn inverse_lerp(value: f64, a: f64, b: f64) -> f64 {
    if (b - a).abs() < 1e-12 {
        return 0.0;
    }
    (value - a) / (b - a)
}

/// Bilinear interpolation across a unit square.
pub fn bilerp(top_left: f64, top_right: f64, bottom_left: f64, bottom_right: f64, fx: f64, fz: f64) -> f64 {
    let top = lerp(top_left, top_right, fx);
    let bottom = lerp(bottom_left, bottom_right, fx);
    lerp(top, bottom, fz)
}
