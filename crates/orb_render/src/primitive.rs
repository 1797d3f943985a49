//! Surface primitive capability set and the intersection record.

use crate::{Material, Sphere, Triangle, TriangleMesh};
use orb_math::{Aabb, Ray, Vec3};
use rand::rngs::StdRng;

/// Record of a ray-surface intersection.
///
/// Default-constructed as "no hit" with `t = +inf`, so a miss never wins a
/// nearest-hit comparison. Produced fresh by every traversal; only copied
/// when a light sample needs to retain one.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'a> {
    pub hit: bool,
    pub t: f32,
    pub location: Vec3,
    /// Outward surface normal, unit length.
    pub normal: Vec3,
    pub material: Option<&'a Material>,
    /// Identity used for temporal correspondence across frames; -1 when
    /// nothing was hit.
    pub primitive_id: i32,
}

impl<'a> Intersection<'a> {
    pub fn miss() -> Self {
        Self {
            hit: false,
            t: f32::INFINITY,
            location: Vec3::ZERO,
            normal: Vec3::ZERO,
            material: None,
            primitive_id: -1,
        }
    }
}

impl<'a> Default for Intersection<'a> {
    fn default() -> Self {
        Self::miss()
    }
}

/// A uniform sample drawn on an emissive surface.
#[derive(Debug, Clone, Copy)]
pub struct LightSample {
    pub location: Vec3,
    pub normal: Vec3,
    pub emission: Vec3,
    /// Area density; `1 / total_emissive_area` once normalized by the mesh.
    pub pdf: f32,
}

impl Default for LightSample {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            normal: Vec3::ZERO,
            emission: Vec3::ZERO,
            pdf: 0.0,
        }
    }
}

/// Capability set every surface primitive provides: bounding box, nearest
/// self-intersection, surface area and uniform self-sampling for light
/// primitives.
///
/// The BVH is generic over this trait because it is built at two structural
/// levels: over [`Surface`]s at the scene level and over [`Triangle`]s
/// inside a mesh.
pub trait Primitive {
    fn bounding_box(&self) -> Aabb;

    fn intersect(&self, ray: &Ray) -> Intersection<'_>;

    fn area(&self) -> f32;

    fn sample(&self, rng: &mut StdRng) -> LightSample;

    fn is_emissive(&self) -> bool;
}

/// Closed set of scene-level surfaces, dispatched by `match` rather than
/// through a vtable in the traversal loop.
pub enum Surface {
    Sphere(Sphere),
    Triangle(Triangle),
    Mesh(TriangleMesh),
}

impl Primitive for Surface {
    fn bounding_box(&self) -> Aabb {
        match self {
            Surface::Sphere(s) => s.bounding_box(),
            Surface::Triangle(t) => t.bounding_box(),
            Surface::Mesh(m) => m.bounding_box(),
        }
    }

    fn intersect(&self, ray: &Ray) -> Intersection<'_> {
        match self {
            Surface::Sphere(s) => s.intersect(ray),
            Surface::Triangle(t) => t.intersect(ray),
            Surface::Mesh(m) => m.intersect(ray),
        }
    }

    fn area(&self) -> f32 {
        match self {
            Surface::Sphere(s) => s.area(),
            Surface::Triangle(t) => t.area(),
            Surface::Mesh(m) => m.area(),
        }
    }

    fn sample(&self, rng: &mut StdRng) -> LightSample {
        match self {
            Surface::Sphere(s) => s.sample(rng),
            Surface::Triangle(t) => t.sample(rng),
            Surface::Mesh(m) => m.sample(rng),
        }
    }

    fn is_emissive(&self) -> bool {
        match self {
            Surface::Sphere(s) => s.is_emissive(),
            Surface::Triangle(t) => t.is_emissive(),
            Surface::Mesh(m) => m.is_emissive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_never_wins_nearest() {
        let miss = Intersection::miss();

        assert!(!miss.hit);
        assert_eq!(miss.t, f32::INFINITY);
        assert_eq!(miss.primitive_id, -1);
        assert!(!(miss.t < 123.0));
    }
}
