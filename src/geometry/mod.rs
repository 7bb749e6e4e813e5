//! World-space value types shared by tracking, placement and interaction.
//!
//! Everything here is `Copy`: a `Pose` read from the tracker or from an
//! object is a snapshot, never a reference into live state.

mod ray;

pub use ray::{ray_aabb_hit_t, ray_hits_obb, Plane, Ray};

use glam::{EulerRot, Mat4, Quat, Vec3};

const TWO_PI: f32 = std::f32::consts::PI * 2.0;

/// Rigid transform: position + orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Pointing direction: local -Z rotated into world space.
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn ray(&self) -> Ray {
        Ray::new(self.position, self.forward())
    }

    pub fn inverse(&self) -> Self {
        let orientation = self.orientation.inverse();
        Self::new(orientation * -self.position, orientation)
    }

    /// `self * other`: express `other` (given in this pose's space) in the parent space.
    pub fn mul_pose(&self, other: &Pose) -> Self {
        Self::new(
            self.position + self.orientation * other.position,
            (self.orientation * other.orientation).normalize(),
        )
    }

    pub fn yaw(&self) -> f32 {
        yaw_of(self.orientation)
    }

    pub fn approx_eq(&self, other: &Pose, epsilon: f32) -> bool {
        self.position.abs_diff_eq(other.position, epsilon)
            && quat_approx_eq(self.orientation, other.orientation, epsilon)
    }
}

/// Full object transform as handed to the scene host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn from_pose(pose: &Pose, uniform_scale: f32) -> Self {
        Self {
            position: pose.position,
            rotation: pose.orientation,
            scale: Vec3::splat(uniform_scale),
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Axis-aligned box in model-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Inverted box; the identity for `union`.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Yaw angle from a YXZ Euler decomposition.
pub fn yaw_of(orientation: Quat) -> f32 {
    let (yaw, _pitch, _roll) = orientation.to_euler(EulerRot::YXZ);
    yaw
}

/// Orientation with the given yaw and fixed pitch/roll, composed in YXZ order.
pub fn upright_with_yaw(yaw: f32, pitch: f32, roll: f32) -> Quat {
    Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll)
}

/// Wrap into `[-PI, PI)`.
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return angle;
    }
    (angle + std::f32::consts::PI).rem_euclid(TWO_PI) - std::f32::consts::PI
}

/// `q` and `-q` encode the same rotation.
pub fn quat_approx_eq(a: Quat, b: Quat, epsilon: f32) -> bool {
    1.0 - a.dot(b).abs() <= epsilon
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn pose_inverse_round_trips_points() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.7));
        let composed = pose.mul_pose(&pose.inverse());
        assert!(composed.approx_eq(&Pose::IDENTITY, 1e-5));
    }

    #[test]
    fn forward_points_down_negative_z() {
        let pose = Pose::IDENTITY;
        assert!(pose.forward().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        let turned = Pose::new(Vec3::ZERO, Quat::from_rotation_y(FRAC_PI_2));
        assert!(turned.forward().abs_diff_eq(Vec3::NEG_X, 1e-6));
    }

    #[test]
    fn yaw_survives_upright_composition() {
        let q = upright_with_yaw(1.2, 0.0, 0.0);
        assert!((yaw_of(q) - 1.2).abs() < 1e-5);
    }

    #[test]
    fn wrap_angle_stays_in_range() {
        assert!((wrap_angle(3.0 * PI + 0.5) - (-PI + 0.5)).abs() < 1e-4);
        assert!((wrap_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-6);
        assert!((wrap_angle(2.0 * PI + 0.25) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn negated_quaternion_is_equal() {
        let q = Quat::from_rotation_z(0.3);
        assert!(quat_approx_eq(q, -q, 1e-6));
    }

    #[test]
    fn aabb_union_from_empty() {
        let a = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 2.0, 1.0));
        let merged = Aabb::EMPTY.union(&a);
        assert_eq!(merged, a);
        assert!(Aabb::EMPTY.is_empty());
        assert!(a.center().abs_diff_eq(Vec3::new(0.0, 1.0, 0.5), 1e-6));
    }
}
