//! Sphere primitive.

use crate::{Intersection, LightSample, Material, Primitive};
use orb_math::{Aabb, Ray, Vec3};
use rand::rngs::StdRng;
use std::sync::Arc;

pub struct Sphere {
    center: Vec3,
    radius: f32,
    radius_squared: f32,
    material: Arc<Material>,
    id: i32,
    bbox: Aabb,
}

impl Sphere {
    pub fn new(id_count: &mut i32, center: Vec3, radius: f32, material: Arc<Material>) -> Self {
        let radius = radius.max(0.0);
        let id = *id_count;
        *id_count += 1;

        Self {
            center,
            radius,
            radius_squared: radius * radius,
            material,
            id,
            bbox: Aabb::from_corners(center - Vec3::splat(radius), center + Vec3::splat(radius)),
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl Primitive for Sphere {
    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn intersect(&self, ray: &Ray) -> Intersection<'_> {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        let half_b = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius_squared;

        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return Intersection::miss();
        }
        let sqrtd = discriminant.sqrt();

        // Nearest positive root; fall back to the far one when the origin is
        // inside the sphere.
        let mut root = (-half_b - sqrtd) / a;
        if root < 0.0 {
            root = (-half_b + sqrtd) / a;
        }
        if root < 0.0 {
            return Intersection::miss();
        }

        let location = ray.at(root);
        Intersection {
            hit: true,
            t: root,
            location,
            normal: (location - self.center).normalize(),
            material: Some(&self.material),
            primitive_id: self.id,
        }
    }

    fn area(&self) -> f32 {
        // Spheres are not sampleable as area lights in this renderer.
        0.0
    }

    fn sample(&self, _rng: &mut StdRng) -> LightSample {
        LightSample::default()
    }

    fn is_emissive(&self) -> bool {
        self.material.is_emitting()
    }
}
