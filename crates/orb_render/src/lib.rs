//! orb_render - CPU path tracing core.
//!
//! Shoots one ray per pixel through a BVH-accelerated scene, shades it with
//! either Monte Carlo path tracing (next-event estimation + Russian
//! roulette) or the legacy Whitted-style recursion, and cleans the result up
//! with a joint-bilateral spatial filter and a reprojecting temporal filter
//! driven by per-pixel G-buffer data.

mod bvh;
mod camera;
mod denoiser;
mod gbuffer;
mod integrator;
mod material;
mod mesh;
mod primitive;
mod renderer;
mod scene;
mod sphere;
mod triangle;

pub use bvh::Bvh;
pub use camera::RenderCamera;
pub use denoiser::{Denoiser, DenoiserSettings, SpatialKernel, TemporalKernel};
pub use gbuffer::{FrameBuffer, GBuffer};
pub use integrator::{trace_path, trace_whitted, PathConfig, ShadedPixel};
pub use material::{fresnel, reflect, refract, Material, MaterialKind};
pub use mesh::TriangleMesh;
pub use primitive::{Intersection, LightSample, Primitive, Surface};
pub use renderer::{pack_rgba, IntegratorMode, RenderSettings, Renderer};
pub use scene::{PointLight, Scene, SceneError};
pub use sphere::Sphere;
pub use triangle::Triangle;

/// Re-export math types used throughout the public API.
pub use orb_math::{Aabb, Axis, Mat4, Ray, Vec2, Vec3, Vec4};

/// Color type alias (linear RGB, typically 0-1).
pub type Color = Vec3;
