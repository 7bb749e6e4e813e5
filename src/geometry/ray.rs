use glam::{Mat4, Vec3};

use super::Aabb;

const PARALLEL_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Forward-only intersection. `None` when the ray is parallel to the plane
    /// (and not lying in it) or the plane is behind the origin.
    pub fn intersect_plane(&self, plane: &Plane) -> Option<Vec3> {
        let denominator = plane.normal.dot(self.direction);
        if denominator.abs() < PARALLEL_EPSILON {
            if plane.distance_to_point(self.origin).abs() < PARALLEL_EPSILON {
                return Some(self.origin);
            }
            return None;
        }
        let t = -(self.origin.dot(plane.normal) + plane.constant) / denominator;
        if t < 0.0 {
            return None;
        }
        Some(self.at(t))
    }
}

/// Plane in Hessian form: `normal . p + constant = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub constant: f32,
}

impl Plane {
    pub fn from_normal_and_point(normal: Vec3, point: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            constant: -point.dot(normal),
        }
    }

    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.constant
    }
}

/// Ray against a box carried by `object_from_local` (scale, rotation, translation).
/// Returns the world-space ray parameter of the entry point.
pub fn ray_hits_obb(ray: &Ray, object_from_local: Mat4, bounds: &Aabb) -> Option<f32> {
    if bounds.is_empty() {
        return None;
    }
    let inv = object_from_local.inverse();
    let o_local = inv.transform_point3(ray.origin);
    let d_local = inv.transform_vector3(ray.direction);
    ray_aabb_hit_t(o_local, d_local, bounds.min, bounds.max)
}

// Slab-method ray–AABB intersection, returns Some(t) or None
pub fn ray_aabb_hit_t(ray_origin: Vec3, ray_direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut tmin = f32::NEG_INFINITY;
    let mut tmax = f32::INFINITY;

    for axis in 0..3 {
        let origin = ray_origin[axis];
        let direction = ray_direction[axis];
        if direction.abs() < f32::EPSILON {
            // Parallel to this slab: inside or never.
            if origin < min[axis] || origin > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / direction;
        let (mut t0, mut t1) = ((min[axis] - origin) * inv, (max[axis] - origin) * inv);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        tmin = tmin.max(t0);
        tmax = tmax.min(t1);
        if tmin > tmax {
            return None;
        }
    }

    if tmax < 0.0 {
        return None;
    }
    Some(if tmin >= 0.0 { tmin } else { tmax })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn plane_hit_in_front() {
        let plane = Plane::from_normal_and_point(Vec3::Z, Vec3::new(0.0, 0.0, -2.0));
        let ray = Ray::new(Vec3::new(0.5, 0.25, 0.0), Vec3::NEG_Z);
        let hit = ray.intersect_plane(&plane).unwrap();
        assert!(hit.abs_diff_eq(Vec3::new(0.5, 0.25, -2.0), 1e-6));
    }

    #[test]
    fn plane_behind_origin_misses() {
        let plane = Plane::from_normal_and_point(Vec3::Z, Vec3::new(0.0, 0.0, 2.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(ray.intersect_plane(&plane).is_none());
    }

    #[test]
    fn parallel_ray_misses() {
        let plane = Plane::from_normal_and_point(Vec3::Y, Vec3::ZERO);
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X);
        assert!(ray.intersect_plane(&plane).is_none());
    }

    #[test]
    fn slab_hit_from_outside() {
        let t = ray_aabb_hit_t(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::NEG_Z,
            Vec3::splat(-1.0),
            Vec3::splat(1.0),
        );
        assert_eq!(t, Some(4.0));
    }

    #[test]
    fn slab_miss_when_offset() {
        let t = ray_aabb_hit_t(
            Vec3::new(3.0, 0.0, 5.0),
            Vec3::NEG_Z,
            Vec3::splat(-1.0),
            Vec3::splat(1.0),
        );
        assert!(t.is_none());
    }

    #[test]
    fn obb_respects_scale_and_translation() {
        let bounds = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        let xf = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(0.3),
            Vec3::new(0.0, 0.0, -4.0),
        );
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let t = ray_hits_obb(&ray, xf, &bounds).unwrap();
        assert!(t > 2.5 && t < 3.5);

        let wide = Ray::new(Vec3::new(2.0, 0.0, 0.0), Vec3::NEG_Z);
        assert!(ray_hits_obb(&wide, xf, &bounds).is_none());
    }
}
