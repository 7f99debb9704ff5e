//! Vector math used by movement and combat checks

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Index, Sub};

/// Tolerance for percentage comparisons
pub const NEARLY_EQUAL_EPSILON: f32 = 1e-4;

/// Compare two floats with an absolute tolerance
pub fn is_nearly_equal(a: f32, b: f32) -> bool {
    (a - b).abs() <= NEARLY_EQUAL_EPSILON
}

/// 3D point in world units; angles are stored the same way but in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    /// Placeholder position that never passes a distance check
    pub const REALLY_WRONG: Vec3 = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn sqr_length(&self) -> f32 {
        self.dot(self)
    }

    pub fn length(&self) -> f32 {
        self.sqr_length().sqrt()
    }

    /// Rotate around the Z axis by `angle_deg` degrees
    pub fn rotate_z(&self, angle_deg: f32) -> Vec3 {
        let rad = angle_deg.to_radians();
        let (sin, cos) = rad.sin_cos();
        Vec3::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
        )
    }

    /// Forward unit vector for an angle triple in degrees (pitch on X, yaw on Z)
    pub fn view_direction(angle: &Vec3) -> Vec3 {
        let pitch = -angle.x.to_radians();
        let yaw = angle.z.to_radians();
        Vec3::new(
            yaw.sin() * pitch.cos(),
            yaw.cos() * pitch.cos(),
            pitch.sin(),
        )
    }

    pub fn is_really_wrong(&self) -> bool {
        self.x == f32::INFINITY && self.y == f32::INFINITY && self.z == f32::INFINITY
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Index<usize> for Vec3 {
    type Output = f32;

    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_z_quarter_turn() {
        let v = Vec3::new(1.0, 0.0, 5.0).rotate_z(90.0);
        assert!(is_nearly_equal(v.x, 0.0));
        assert!(is_nearly_equal(v.y, 1.0));
        assert_eq!(v.z, 5.0);
    }

    #[test]
    fn view_direction_faces_positive_y_at_zero_yaw() {
        let dir = Vec3::view_direction(&Vec3::ZERO);
        assert!(is_nearly_equal(dir.x, 0.0));
        assert!(is_nearly_equal(dir.y, 1.0));
        assert!(is_nearly_equal(dir.z, 0.0));
    }

    #[test]
    fn really_wrong_sentinel() {
        assert!(Vec3::REALLY_WRONG.is_really_wrong());
        assert!(!Vec3::new(f32::INFINITY, 0.0, f32::INFINITY).is_really_wrong());
    }

    #[test]
    fn serde_as_array() {
        let v: Vec3 = serde_json::from_str("[1.0, 2.0, 3.5]").unwrap();
        assert_eq!(v, Vec3::new(1.0, 2.0, 3.5));
        assert_eq!(serde_json::to_string(&v).unwrap(), "[1.0,2.0,3.5]");
    }
}
