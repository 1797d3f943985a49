//! Axis-aligned bounding boxes for the BVH.

use crate::Ray;
use glam::Vec3;

/// Coordinate axis, in the order used to break longest-extent ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Axis-aligned bounding box stored as two corner vectors.
///
/// The canonical empty box ([`Aabb::EMPTY`]) has `min = +inf`, `max = -inf`;
/// it is the identity element for union and fails every containment and ray
/// test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// The box that contains nothing.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Box containing a single point.
    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Box spanned by two diagonal corners, in any order.
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box enclosing both operands. Never shrinks either extent;
    /// `EMPTY` is the identity.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Smallest box enclosing this box and a point.
    pub fn union_point(&self, point: Vec3) -> Aabb {
        Aabb {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.x <= point.x
            && point.x <= self.max.x
            && self.min.y <= point.y
            && point.y <= self.max.y
            && self.min.z <= point.z
            && point.z <= self.max.z
    }

    pub fn centroid(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    pub fn diagonal(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn surface_area(&self) -> f32 {
        let d = self.diagonal();
        2.0 * (d.x * d.y + d.y * d.z + d.x * d.z)
    }

    /// The axis of largest extent; ties go to X, then Y, then Z.
    pub fn longest_axis(&self) -> Axis {
        let d = self.diagonal();
        if d.x >= d.y && d.x >= d.z {
            Axis::X
        } else if d.y >= d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Centroid coordinate along one axis, used to order primitives during
    /// BVH construction.
    pub fn centroid_on(&self, axis: Axis) -> f32 {
        let c = self.centroid();
        match axis {
            Axis::X => c.x,
            Axis::Y => c.y,
            Axis::Z => c.z,
        }
    }

    /// Slab-method ray test using the ray's cached direction reciprocal.
    ///
    /// Per axis the entry/exit parameters are swapped when the direction
    /// component is negative; the ray hits iff the latest entry is not past
    /// the earliest exit and the exit is ahead of the origin. A ray starting
    /// inside the box reports a hit (entry <= 0 <= exit).
    pub fn hit(&self, ray: &Ray) -> bool {
        let mut t_in = (self.min - ray.origin) * ray.inv_direction;
        let mut t_out = (self.max - ray.origin) * ray.inv_direction;

        if ray.direction.x < 0.0 {
            std::mem::swap(&mut t_in.x, &mut t_out.x);
        }
        if ray.direction.y < 0.0 {
            std::mem::swap(&mut t_in.y, &mut t_out.y);
        }
        if ray.direction.z < 0.0 {
            std::mem::swap(&mut t_in.z, &mut t_out.z);
        }

        let t_enter = t_in.x.max(t_in.y).max(t_in.z);
        let t_exit = t_out.x.min(t_out.y).min(t_out.z);

        t_exit >= 0.0 && t_enter <= t_exit
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_reorders() {
        let b = Aabb::from_corners(Vec3::new(5.0, -1.0, 2.0), Vec3::new(-3.0, 4.0, 0.0));

        assert_eq!(b.min, Vec3::new(-3.0, -1.0, 0.0));
        assert_eq!(b.max, Vec3::new(5.0, 4.0, 2.0));
    }

    #[test]
    fn test_union_contains_both() {
        let a = Aabb::from_corners(Vec3::ZERO, Vec3::splat(5.0));
        let b = Aabb::from_corners(Vec3::splat(3.0), Vec3::splat(10.0));
        let u = a.union(&b);

        assert!(u.contains_point(Vec3::ZERO));
        assert!(u.contains_point(Vec3::splat(5.0)));
        assert!(u.contains_point(Vec3::splat(10.0)));
        assert_eq!(u.min, Vec3::ZERO);
        assert_eq!(u.max, Vec3::splat(10.0));
    }

    #[test]
    fn test_union_commutative_associative() {
        let a = Aabb::from_corners(Vec3::new(-2.0, 0.0, 1.0), Vec3::new(0.0, 3.0, 2.0));
        let b = Aabb::from_corners(Vec3::new(1.0, -5.0, 0.0), Vec3::new(4.0, 0.0, 6.0));
        let c = Aabb::from_point(Vec3::new(7.0, 7.0, 7.0));

        assert_eq!(a.union(&b), b.union(&a));
        assert_eq!(a.union(&b).union(&c), a.union(&b.union(&c)));
    }

    #[test]
    fn test_empty_is_union_identity() {
        let a = Aabb::from_corners(Vec3::ZERO, Vec3::ONE);

        assert_eq!(a.union(&Aabb::EMPTY), a);
        assert_eq!(Aabb::EMPTY.union(&a), a);
        assert!(!Aabb::EMPTY.contains_point(Vec3::ZERO));
    }

    #[test]
    fn test_slab_analytic_entry_exit() {
        let b = Aabb::from_corners(Vec3::splat(-1.0), Vec3::splat(1.0));

        // Straight-on hit from z = -5: enters at t = 4, exits at t = 6.
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(b.hit(&ray));

        // Same origin, pointing away.
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::NEG_Z);
        assert!(!b.hit(&ray));

        // Offset so the slab is missed entirely.
        let ray = Ray::new(Vec3::new(10.0, 0.0, -5.0), Vec3::Z);
        assert!(!b.hit(&ray));
    }

    #[test]
    fn test_slab_origin_inside() {
        let b = Aabb::from_corners(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.3, -0.9, 0.1));

        assert!(b.hit(&ray));
    }

    #[test]
    fn test_slab_negative_direction() {
        let b = Aabb::from_corners(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(5.0, 0.5, -0.5), Vec3::NEG_X);

        assert!(b.hit(&ray));
    }

    #[test]
    fn test_empty_box_rejects_rays() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        assert!(!Aabb::EMPTY.hit(&ray));
    }

    #[test]
    fn test_longest_axis_ties() {
        let x = Aabb::from_corners(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0));
        assert_eq!(x.longest_axis(), Axis::X);

        let y = Aabb::from_corners(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(y.longest_axis(), Axis::Y);

        let z = Aabb::from_corners(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0));
        assert_eq!(z.longest_axis(), Axis::Z);

        // Ties break X, then Y, then Z.
        let cube = Aabb::from_corners(Vec3::ZERO, Vec3::ONE);
        assert_eq!(cube.longest_axis(), Axis::X);

        let yz = Aabb::from_corners(Vec3::ZERO, Vec3::new(1.0, 2.0, 2.0));
        assert_eq!(yz.longest_axis(), Axis::Y);
    }

    #[test]
    fn test_centroid() {
        let b = Aabb::from_corners(Vec3::ZERO, Vec3::splat(10.0));

        assert_eq!(b.centroid(), Vec3::splat(5.0));
        assert_eq!(b.centroid_on(Axis::Y), 5.0);
    }
}
