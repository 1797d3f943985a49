//! Frame orchestration: shade every pixel in parallel, run the denoising
//! passes in order, and pack the result for display or disk.

use crate::denoiser::{Denoiser, DenoiserSettings};
use crate::gbuffer::GBuffer;
use crate::integrator::{trace_path, trace_whitted, PathConfig};
use crate::{Color, RenderCamera, Scene};
use orb_math::{Ray, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// Which integrator shades primary rays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegratorMode {
    /// Monte Carlo path tracing with next-event estimation.
    PathTracing,
    /// Deterministic Whitted recursion; fast, point lights only.
    Whitted,
}

/// Everything the render loop needs besides the scene and camera.
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub integrator: IntegratorMode,
    pub path: PathConfig,
    pub denoiser: DenoiserSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            integrator: IntegratorMode::PathTracing,
            path: PathConfig::default(),
            denoiser: DenoiserSettings::default(),
        }
    }
}

/// Pack a linear color into a `0xABGR` pixel word: alpha in the top byte,
/// red in the bottom. The little-endian byte order is then R, G, B, A.
#[inline]
pub fn pack_rgba(color: Color) -> u32 {
    let r = (color.x.clamp(0.0, 1.0) * 255.0) as u32;
    let g = (color.y.clamp(0.0, 1.0) * 255.0) as u32;
    let b = (color.z.clamp(0.0, 1.0) * 255.0) as u32;
    (0xFF << 24) | (b << 16) | (g << 8) | r
}

/// Owns the scene, the G-buffer and the denoiser, and turns a camera into
/// packed frames.
pub struct Renderer {
    scene: Scene,
    pub settings: RenderSettings,
    gbuffer: GBuffer,
    denoiser: Denoiser,
    image: Vec<u32>,
    frame_index: u64,
}

impl Renderer {
    pub fn new(scene: Scene, settings: RenderSettings) -> Self {
        Self {
            scene,
            settings,
            gbuffer: GBuffer::new(0, 0),
            denoiser: Denoiser::new(),
            image: Vec::new(),
            frame_index: 0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Reallocate the frame storage. History from the old size is useless,
    /// so it is dropped. A zero-area viewport is valid; rendering into it
    /// produces an empty image.
    pub fn resize_viewport(&mut self, width: u32, height: u32) {
        if width as usize == self.gbuffer.width() && height as usize == self.gbuffer.height() {
            return;
        }
        log::info!("viewport resized to {width}x{height}");
        self.gbuffer.resize(width as usize, height as usize);
        self.image.clear();
        self.image.resize(width as usize * height as usize, 0);
        self.denoiser.reset_history();
    }

    /// Drop temporal history without touching the viewport, e.g. after
    /// teleporting the camera.
    pub fn reset_temporal_history(&mut self) {
        self.denoiser.reset_history();
    }

    /// Render one frame: shade, spatial filter, temporal filter, pack.
    /// Returns the packed `0xABGR` pixels, row-major from the first ray.
    pub fn render(&mut self, camera: &RenderCamera) -> &[u32] {
        let (width, height) = (camera.width() as usize, camera.height() as usize);
        if width != self.gbuffer.width() || height != self.gbuffer.height() {
            self.resize_viewport(camera.width(), camera.height());
        }
        if width == 0 || height == 0 {
            return &self.image;
        }
        let started = Instant::now();

        // Shade. Each pixel gets its own generator, seeded from the frame
        // and pixel index, so a frame is reproducible regardless of how
        // rayon schedules it.
        let frame_seed = self.frame_index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let scene = &self.scene;
        let settings = &self.settings;
        let origin = camera.position();
        let shaded: Vec<_> = camera
            .ray_directions()
            .par_iter()
            .enumerate()
            .map(|(i, &direction)| {
                let ray = Ray::new(origin, direction);
                match settings.integrator {
                    IntegratorMode::PathTracing => {
                        let mut rng = StdRng::seed_from_u64(frame_seed ^ i as u64);
                        trace_path(scene, &ray, &settings.path, &mut rng)
                    }
                    IntegratorMode::Whitted => trace_whitted(scene, &ray, &settings.path),
                }
            })
            .collect();

        for (i, pixel) in shaded.into_iter().enumerate() {
            let (x, y) = (i % width, i / width);
            // The denoising passes operate on [0, 1] colors.
            self.gbuffer
                .color
                .set(x, y, pixel.color.clamp(Vec3::ZERO, Vec3::ONE));
            self.gbuffer.world_position.set(x, y, pixel.world_position);
            self.gbuffer.world_normal.set(x, y, pixel.world_normal);
            self.gbuffer.primitive_id.set(x, y, pixel.primitive_id);
            self.gbuffer.contributor.set(x, y, pixel.contributor);
        }
        self.gbuffer.projection = camera.projection_matrix();
        self.gbuffer.view = camera.view_matrix();

        // Denoise, then hand the frame to the temporal accumulator as the
        // next frame's history.
        self.denoiser
            .spatial(&mut self.gbuffer, &self.settings.denoiser);
        self.denoiser
            .temporal(&mut self.gbuffer, &self.settings.denoiser);

        for (dst, &color) in self.image.iter_mut().zip(self.gbuffer.color.as_slice()) {
            *dst = pack_rgba(color);
        }

        log::debug!(
            "frame {} rendered in {:.1} ms ({}x{})",
            self.frame_index,
            started.elapsed().as_secs_f64() * 1e3,
            width,
            height
        );
        self.frame_index += 1;
        &self.image
    }

    /// The last packed frame, row-major `0xABGR` words.
    pub fn frame(&self) -> &[u32] {
        &self.image
    }

    /// Write the last rendered frame as a PNG.
    pub fn write_png<P: AsRef<Path>>(&self, path: P) -> image::ImageResult<()> {
        let width = self.gbuffer.width() as u32;
        let height = self.gbuffer.height() as u32;
        let bytes: Vec<u8> = self
            .image
            .iter()
            .flat_map(|px| px.to_le_bytes())
            .collect();
        // to_le_bytes turns the 0xABGR word into R, G, B, A bytes.
        let buffer = image::RgbaImage::from_raw(width, height, bytes)
            .ok_or_else(|| {
                image::ImageError::Parameter(image::error::ParameterError::from_kind(
                    image::error::ParameterErrorKind::DimensionMismatch,
                ))
            })?;
        buffer.save(path)
    }
}
