//! Mathematical types shared between client and server.
//!
//! The arena is a flat XZ plane with Y up. Yaw 0 faces +Z and increases
//! towards +X.

use std::f32::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

/// 3D Vector - position, velocity, direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Distance squared (avoids sqrt)
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// Horizontal (XZ) part of this vector.
    #[must_use]
    pub const fn planar(self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }

    /// True when every component is finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Planar vector on the XZ ground plane.
///
/// `y` of the 2D vector is the world Z axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// World X component
    pub x: f32,
    /// World Z component
    pub z: f32,
}

impl Vec2 {
    /// Creates a new Vec2
    #[must_use]
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.z * other.z
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.x.hypot(self.z)
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let length = self.length();
        if length == 0.0 {
            return Self::ZERO;
        }
        Self::new(self.x / length, self.z / length)
    }

    /// Unit vector facing `yaw`.
    #[must_use]
    pub fn from_yaw(yaw: f32) -> Self {
        let (sin, cos) = yaw.sin_cos();
        Self::new(sin, cos)
    }

    /// This vector rotated 90 degrees clockwise seen from above (forward to right).
    #[must_use]
    pub const fn right(self) -> Self {
        Self::new(self.z, -self.x)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.z * rhs)
    }
}

/// Wraps an angle into `(-PI, PI]`.
#[must_use]
pub fn wrap_radians(value: f32) -> f32 {
    let mut result = value % TAU;
    if result <= -PI {
        result += TAU;
    }
    if result > PI {
        result -= TAU;
    }
    result
}

/// Absolute shortest angle between two yaws.
#[must_use]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    wrap_radians(a - b).abs()
}
