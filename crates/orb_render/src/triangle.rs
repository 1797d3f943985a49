//! Triangle primitive with Möller-Trumbore intersection.

use crate::{Intersection, LightSample, Material, Primitive};
use orb_math::{Aabb, Ray, Vec3};
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

/// Determinants below this are treated as "ray parallel to the triangle
/// plane" and rejected, instead of dividing by a near-zero value.
const DETERMINANT_EPSILON: f32 = 1e-8;

/// A single triangle. Vertices are expected in counter-clockwise order so
/// the precomputed face normal points outward.
pub struct Triangle {
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    normal: Vec3,
    area: f32,
    material: Arc<Material>,
    id: i32,
}

impl Triangle {
    pub fn new(id_count: &mut i32, v0: Vec3, v1: Vec3, v2: Vec3, material: Arc<Material>) -> Self {
        let cross = (v1 - v0).cross(v2 - v0);
        let id = *id_count;
        *id_count += 1;

        Self {
            v0,
            v1,
            v2,
            normal: cross.normalize(),
            area: 0.5 * cross.length(),
            material,
            id,
        }
    }
}

impl Primitive for Triangle {
    fn bounding_box(&self) -> Aabb {
        Aabb::from_corners(self.v0, self.v1).union_point(self.v2)
    }

    /// Möller-Trumbore: solve for `(t, u, v)` via the ray/edge cross-product
    /// system; accept only `t > 0` with barycentrics strictly inside.
    fn intersect(&self, ray: &Ray) -> Intersection<'_> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let p = ray.direction.cross(edge2);
        let determinant = p.dot(edge1);

        if determinant.abs() < DETERMINANT_EPSILON {
            return Intersection::miss();
        }
        let inv_determinant = 1.0 / determinant;

        let s = ray.origin - self.v0;
        let q = s.cross(edge1);

        let t = q.dot(edge2) * inv_determinant;
        let u = p.dot(s) * inv_determinant;
        let v = q.dot(ray.direction) * inv_determinant;

        if t > 0.0 && u > 0.0 && v > 0.0 && u + v < 1.0 {
            Intersection {
                hit: true,
                t,
                location: ray.at(t),
                normal: self.normal,
                material: Some(&self.material),
                primitive_id: self.id,
            }
        } else {
            Intersection::miss()
        }
    }

    fn area(&self) -> f32 {
        self.area
    }

    /// Uniform barycentric point on the triangle; area pdf `1 / area`.
    fn sample(&self, rng: &mut StdRng) -> LightSample {
        // sqrt keeps the first coordinate from biasing toward the v0 corner
        let x = 1.0 - rng.gen::<f32>().sqrt();
        let y = rng.gen::<f32>();

        LightSample {
            location: x * self.v0
                + ((1.0 - x) * y) * self.v1
                + ((1.0 - x) * (1.0 - y)) * self.v2,
            normal: self.normal,
            emission: self.material.emission(),
            pdf: 1.0 / self.area,
        }
    }

    fn is_emissive(&self) -> bool {
        self.material.is_emitting()
    }
}
