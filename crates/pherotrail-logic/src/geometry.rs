//! 3D vector math used by routes, trails and steering.
//!
//! Y is up. `cross(UP, d)` points to the right of a walker facing `d`.

use serde::{Deserialize, Serialize};

/// 3D position / direction vector
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Self = Self { x: 0.0, y: 1.0, z: 0.0 };
    /// Initial facing of a freshly spawned agent.
    pub const FORWARD: Self = Self { x: 0.0, y: 0.0, z: 1.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction, or `ZERO` for a zero-length input.
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
                z: self.z / len,
            }
        } else {
            Self::ZERO
        }
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        *self + (*other - *self) * t
    }

    /// Shrink the vector so its length does not exceed `max_len`.
    pub fn clamp_length(&self, max_len: f32) -> Self {
        let len = self.length();
        if len > max_len && len > 0.0 {
            *self * (max_len / len)
        } else {
            *self
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Perpendicular pointing to the right of `direction` around world up.
    pub fn right_of(direction: &Self) -> Self {
        Self::UP.cross(direction).normalize()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// Rotate `heading` toward `desired` by a fraction `rotation_speed * dt`.
///
/// A zero `desired` keeps the current heading. The result is always unit
/// length unless both inputs are zero.
pub fn turn_toward(heading: Vec3, desired: Vec3, rotation_speed: f32, dt: f32) -> Vec3 {
    let target = desired.normalize();
    if target == Vec3::ZERO {
        return heading;
    }
    let t = (rotation_speed * dt).clamp(0.0, 1.0);
    let blended = heading.normalize().lerp(&target, t).normalize();
    if blended == Vec3::ZERO {
        // Exactly opposite and half-way: snap rather than collapse.
        target
    } else {
        blended
    }
}

/// Displacement for one tick: `direction * speed * dt`, capped at `max_step`.
pub fn capped_step(direction: Vec3, speed: f32, dt: f32, max_step: f32) -> Vec3 {
    (direction * (speed * dt)).clamp_length(max_step)
}
