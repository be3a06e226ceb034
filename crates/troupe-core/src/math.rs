//! Minimal 2D math: vectors, axis-aligned boxes, and world bounds.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A 2D vector of `f64` components.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Create a vector from components.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
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

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned bounding box with inclusive edges.
///
/// Two boxes overlap unless one's min exceeds the other's max on
/// either axis; boundary contact counts as overlap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec2,
    /// Maximum corner.
    pub max: Vec2,
}

impl Aabb {
    /// Build a box from an origin (min corner) and non-negative extents.
    pub fn from_origin_size(origin: Vec2, width: f64, height: f64) -> Self {
        Self {
            min: origin,
            max: Vec2::new(origin.x + width, origin.y + height),
        }
    }

    /// Build a square box of side `size` centered at `center`.
    pub fn square_around(center: Vec2, size: f64) -> Self {
        let half = size / 2.0;
        Self {
            min: Vec2::new(center.x - half, center.y - half),
            max: Vec2::new(center.x + half, center.y + half),
        }
    }

    /// Box width.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Box height.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Center point.
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Inclusive-edge overlap test.
    pub fn intersects(&self, other: &Aabb) -> bool {
        !(self.min.x > other.max.x
            || other.min.x > self.max.x
            || self.min.y > other.max.y
            || other.min.y > self.max.y)
    }
}

/// Rectangular world extent: origin plus width/height.
///
/// The simulation is toroidal over these bounds; an actor whose box has
/// fully exited one edge reappears flush with the opposite edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBounds {
    /// World origin x (minimum edge).
    pub x: f64,
    /// World origin y (minimum edge).
    pub y: f64,
    /// World width; the maximum x edge is `x + width`.
    pub width: f64,
    /// World height; the maximum y edge is `y + height`.
    pub height: f64,
}

impl WorldBounds {
    /// Create bounds from origin and extents.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Minimum x edge.
    pub fn min_x(&self) -> f64 {
        self.x
    }

    /// Minimum y edge.
    pub fn min_y(&self) -> f64 {
        self.y
    }

    /// Maximum x edge.
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Maximum y edge.
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Side of the smallest square covering the bounds. The spatial
    /// index covers a square region regardless of world aspect ratio.
    pub fn square_side(&self) -> f64 {
        self.width.max(self.height)
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1000.0, 1000.0)
    }
}
