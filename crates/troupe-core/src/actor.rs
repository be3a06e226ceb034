//! Actor kinematic state.
//!
//! An [`Actor`] is a positioned, sized, orientable simulated entity.
//! It carries no behavior and no identity of its own; identity lives
//! in the arena handle, and behavior lives in the application layer.

use crate::math::{Aabb, Vec2};

/// Kinematic state of one simulated entity.
///
/// Position is the minimum (top-left) corner of the actor's rectangle.
/// `depth` is a layering coordinate: it controls draw order in the
/// presentation layer and collision eligibility in the physics engine
/// (only exactly-equal depths can collide).
#[derive(Clone, Debug)]
pub struct Actor {
    position: Vec2,
    depth: f64,
    width: f64,
    height: f64,
    velocity: Vec2,
    acceleration: Vec2,
    rotation: f64,
    screen_static: bool,
    x_locked: bool,
    y_locked: bool,
}

impl Actor {
    /// Create an actor at `(x, y)` on layer `depth` with the given size.
    ///
    /// Velocity, acceleration, and rotation start at zero; both axes
    /// are unlocked and the actor is camera-relative.
    pub fn new(x: f64, y: f64, width: f64, height: f64, depth: f64) -> Self {
        Self {
            position: Vec2::new(x, y),
            depth,
            width,
            height,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            rotation: 0.0,
            screen_static: false,
            x_locked: false,
            y_locked: false,
        }
    }

    /// Builder-style velocity.
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder-style acceleration.
    pub fn with_acceleration(mut self, acceleration: Vec2) -> Self {
        self.acceleration = acceleration;
        self
    }

    /// Minimum-corner position.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Set the minimum-corner position.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Layering coordinate.
    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Set the layering coordinate.
    pub fn set_depth(&mut self, depth: f64) {
        self.depth = depth;
    }

    /// Actor width.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Actor height.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Set both extents.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Current velocity. Only meaningful for root actors; attached
    /// actors inherit their root's per-tick delta instead.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Set the velocity.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    /// Current acceleration.
    pub fn acceleration(&self) -> Vec2 {
        self.acceleration
    }

    /// Set the acceleration.
    pub fn set_acceleration(&mut self, acceleration: Vec2) {
        self.acceleration = acceleration;
    }

    /// Rotation in radians. The physics engine never modifies it.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Set the rotation in radians.
    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = rotation;
    }

    /// Whether the actor is pinned to the screen (non-camera-relative).
    /// Carried for the presentation layer; ignored by physics.
    pub fn is_screen_static(&self) -> bool {
        self.screen_static
    }

    /// Pin or unpin the actor to the screen.
    pub fn set_screen_static(&mut self, screen_static: bool) {
        self.screen_static = screen_static;
    }

    /// Whether horizontal movement is locked.
    pub fn x_locked(&self) -> bool {
        self.x_locked
    }

    /// Lock or unlock horizontal movement. A locked axis zeroes that
    /// component of every per-tick delta, inherited ones included.
    pub fn set_x_locked(&mut self, locked: bool) {
        self.x_locked = locked;
    }

    /// Whether vertical movement is locked.
    pub fn y_locked(&self) -> bool {
        self.y_locked
    }

    /// Lock or unlock vertical movement.
    pub fn set_y_locked(&mut self, locked: bool) {
        self.y_locked = locked;
    }

    /// The actor's true bounding rectangle, used for collision tests.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_origin_size(self.position, self.width, self.height)
    }

    /// The square box used for spatial indexing: side `max(width,
    /// height)`, centered on the actor's rectangle center. An actor
    /// whose index box straddles a split boundary legitimately lives
    /// in more than one leaf.
    pub fn index_box(&self) -> Aabb {
        Aabb::square_around(self.aabb().center(), self.width.max(self.height))
    }
}
