//! Math utilities and helpers.

use glam::DVec3;

/// Ray for picking and raycasting.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// Ray origin
    pub origin: DVec3,
    /// Ray direction (normalized)
    pub direction: DVec3,
}

impl Ray {
    /// Create a new ray, normalizing the direction
    #[inline]
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Get a point along the ray at distance t
    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Returns true if the direction is usable
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.origin.is_finite() && self.direction != DVec3::ZERO
    }

    /// Distance along the ray to the first intersection with a sphere
    pub fn intersect_sphere(&self, center: DVec3, radius: f64) -> Option<f64> {
        let to_center = center - self.origin;
        let along = to_center.dot(self.direction);
        let closest_sq = to_center.length_squared() - along * along;
        let radius_sq = radius * radius;
        if closest_sq > radius_sq {
            return None;
        }
        let half_chord = (radius_sq - closest_sq).sqrt();
        let near = along - half_chord;
        let far = along + half_chord;
        if far < 0.0 {
            None
        } else {
            Some(near.max(0.0))
        }
    }
}

/// Axis-Aligned Bounding Box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: DVec3,
    /// Maximum corner
    pub max: DVec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    #[inline]
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB around a center with given half-extent on every axis
    #[inline]
    pub fn from_center(center: DVec3, half_extent: f64) -> Self {
        Self {
            min: center - DVec3::splat(half_extent),
            max: center + DVec3::splat(half_extent),
        }
    }

    /// Get the center of the AABB
    #[inline]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the AABB
    #[inline]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// The eight corner points
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }

    /// Check if a point is inside the AABB
    #[inline]
    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Ray-AABB intersection test, returns (t_near, t_far) or None if no intersection
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f64, f64)> {
        let inv_dir = DVec3::ONE / ray.direction;

        let t1 = (self.min - ray.origin) * inv_dir;
        let t2 = (self.max - ray.origin) * inv_dir;

        let t_min = t1.min(t2);
        let t_max = t1.max(t2);

        let t_near = t_min.max_element();
        let t_far = t_max.min_element();

        if t_near <= t_far && t_far >= 0.0 {
            Some((t_near.max(0.0), t_far))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ray_at() {
        let ray = Ray::new(DVec3::ZERO, DVec3::X * 3.0);
        assert_eq!(ray.at(0.0), DVec3::ZERO);
        assert_eq!(ray.at(1.0), DVec3::X);
        assert_eq!(ray.at(5.0), DVec3::new(5.0, 0.0, 0.0));
        assert!(!Ray::new(DVec3::ZERO, DVec3::ZERO).is_valid());
    }

    #[test]
    fn aabb_contains_point() {
        let aabb = Aabb::new(DVec3::ZERO, DVec3::ONE);
        assert!(aabb.contains_point(DVec3::splat(0.5)));
        assert!(aabb.contains_point(DVec3::ZERO));
        assert!(aabb.contains_point(DVec3::ONE));
        assert!(!aabb.contains_point(DVec3::new(2.0, 0.5, 0.5)));
        assert_eq!(aabb.corners().len(), 8);
    }

    #[test]
    fn aabb_ray_intersection() {
        let aabb = Aabb::new(DVec3::ZERO, DVec3::ONE);

        let ray = Ray::new(DVec3::new(-1.0, 0.5, 0.5), DVec3::X);
        let (t_near, t_far) = aabb.intersect_ray(&ray).unwrap();
        assert_relative_eq!(t_near, 1.0);
        assert_relative_eq!(t_far, 2.0);

        // Origin inside clamps the near distance
        let ray = Ray::new(DVec3::splat(0.5), DVec3::Y);
        assert_eq!(aabb.intersect_ray(&ray).unwrap().0, 0.0);

        let ray = Ray::new(DVec3::new(-1.0, 2.0, 0.5), DVec3::X);
        assert!(aabb.intersect_ray(&ray).is_none());
    }

    #[test]
    fn sphere_intersection() {
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);
        let t = ray.intersect_sphere(DVec3::new(0.0, 0.0, 5.0), 0.5).unwrap();
        assert_relative_eq!(t, 4.5);
        assert!(ray.intersect_sphere(DVec3::new(1.0, 0.0, 5.0), 0.5).is_none());
        assert!(ray.intersect_sphere(DVec3::new(0.0, 0.0, -5.0), 0.5).is_none());
    }
}
