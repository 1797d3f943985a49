//! Triangle mesh: a surface made of triangles with a shared material and a
//! nested BVH of its own, so a scene-level traversal can descend through two
//! structural levels.

use crate::{Bvh, Intersection, LightSample, Material, Primitive, SceneError, Triangle};
use orb_math::{Aabb, Ray, Vec3};
use rand::rngs::StdRng;
use std::sync::Arc;

pub struct TriangleMesh {
    triangles: Vec<Triangle>,
    bvh: Bvh,
    bounds: Aabb,
    total_area: f32,
    material: Arc<Material>,
}

impl TriangleMesh {
    /// Build from externally parsed position/index buffers. Every three
    /// indices form one triangle; each triangle takes the next primitive id
    /// from `id_count`.
    pub fn from_buffers(
        id_count: &mut i32,
        positions: &[Vec3],
        indices: &[u32],
        material: Arc<Material>,
    ) -> Result<Self, SceneError> {
        if indices.is_empty() || indices.len() % 3 != 0 {
            return Err(SceneError::InvalidIndexCount(indices.len()));
        }
        if let Some(&out_of_range) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(SceneError::IndexOutOfRange {
                index: out_of_range,
                vertex_count: positions.len(),
            });
        }

        let triangles: Vec<Triangle> = indices
            .chunks_exact(3)
            .map(|tri| {
                Triangle::new(
                    id_count,
                    positions[tri[0] as usize],
                    positions[tri[1] as usize],
                    positions[tri[2] as usize],
                    material.clone(),
                )
            })
            .collect();

        let bounds = positions
            .iter()
            .fold(Aabb::EMPTY, |acc, &p| acc.union_point(p));
        let total_area = triangles.iter().map(|t| t.area()).sum();
        let bvh = Bvh::build(&triangles);

        log::debug!(
            "mesh built: {} triangles, area {:.3}, {} BVH nodes",
            triangles.len(),
            total_area,
            bvh.node_count()
        );

        Ok(Self {
            triangles,
            bvh,
            bounds,
            total_area,
            material,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

impl Primitive for TriangleMesh {
    fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    fn intersect(&self, ray: &Ray) -> Intersection<'_> {
        self.bvh.traverse(&self.triangles, ray)
    }

    fn area(&self) -> f32 {
        self.total_area
    }

    /// Uniform sample over the whole mesh; the pdf is normalized to
    /// `1 / total_area` here so the integrator can divide by it directly.
    fn sample(&self, rng: &mut StdRng) -> LightSample {
        let mut sample = self.bvh.sample(&self.triangles, rng);
        sample.emission = self.material.emission();
        sample.pdf = 1.0 / self.total_area;
        sample
    }

    fn is_emissive(&self) -> bool {
        self.material.is_emitting()
    }
}
