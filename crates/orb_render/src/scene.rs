//! Scene: the primitive table, its acceleration structure, and lights.

use crate::{Bvh, Color, Intersection, LightSample, Primitive, Surface};
use orb_math::{Ray, Vec3};
use rand::rngs::StdRng;
use thiserror::Error;

/// Construction-time validation failures. The render core itself never
/// fails: a built scene always produces some image.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("index buffer length {0} is not a positive multiple of 3")]
    InvalidIndexCount(usize),
    #[error("vertex index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Point light for the legacy Whitted integrator.
#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub position: Vec3,
    pub radiance: Color,
}

/// Night-sky radiance returned for primary and specular rays that miss.
const DEFAULT_SKY: Color = Color::new(12.0 / 255.0, 20.0 / 255.0, 69.0 / 255.0);

/// Owns the surfaces and the BVH built over them.
///
/// Surfaces are added first, then [`build_bvh`](Scene::build_bvh) is called
/// exactly once before rendering; afterwards the scene is read-only and can
/// be shared across worker threads.
pub struct Scene {
    surfaces: Vec<Surface>,
    point_lights: Vec<PointLight>,
    bvh: Bvh,
    pub sky: Color,
    id_count: i32,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            surfaces: Vec::new(),
            point_lights: Vec::new(),
            bvh: Bvh::build::<Surface>(&[]),
            sky: DEFAULT_SKY,
            id_count: 1, // primitive ids start from 1; -1 is the miss sentinel
        }
    }

    /// Counter handed to primitive constructors so every primitive in the
    /// scene gets a distinct id for temporal correspondence.
    pub fn id_counter(&mut self) -> &mut i32 {
        &mut self.id_count
    }

    pub fn add(&mut self, surface: Surface) {
        self.surfaces.push(surface);
    }

    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    /// Build the acceleration structure. Called once, after all surfaces
    /// have been added.
    pub fn build_bvh(&mut self) {
        self.bvh = Bvh::build(&self.surfaces);
        log::info!(
            "scene BVH built: {} surfaces, {} nodes",
            self.surfaces.len(),
            self.bvh.node_count()
        );
    }

    /// Nearest surface intersection, or the miss record. An empty scene is a
    /// valid state in which every ray misses.
    pub fn intersect(&self, ray: &Ray) -> Intersection<'_> {
        self.bvh.traverse(&self.surfaces, ray)
    }

    /// Uniform area sample on the scene's emissive surface.
    ///
    /// Known scope limit: the search stops at the first emissive surface
    /// found, so scenes with several area lights sample only one of them.
    pub fn sample_light(&self, rng: &mut StdRng) -> Option<LightSample> {
        self.surfaces
            .iter()
            .find(|s| s.is_emissive())
            .map(|light| light.sample(rng))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
