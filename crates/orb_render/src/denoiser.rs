//! Image-space denoising: an edge-aware joint bilateral filter inside the
//! frame and a reprojecting temporal accumulator across frames. Both lean on
//! the G-buffer's geometry channels so filtering never bleeds across object
//! boundaries.

use crate::gbuffer::GBuffer;
use crate::Color;
use orb_math::{Vec3, Vec4Swizzles};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// Falloff widths of the four bilateral terms.
const SIGMA_PIXEL: f32 = 32.0;
const SIGMA_COLOR: f32 = 0.6;
const SIGMA_NORMAL: f32 = 0.1;
const SIGMA_PLANE: f32 = 0.1;

/// Spatial kernel footprint, named by half-size. `Half16` filters a 33x33
/// pixel window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialKernel {
    Disabled,
    Half3,
    Half16,
    Half32,
}

impl SpatialKernel {
    fn half_size(self) -> Option<isize> {
        match self {
            SpatialKernel::Disabled => None,
            SpatialKernel::Half3 => Some(3),
            SpatialKernel::Half16 => Some(16),
            SpatialKernel::Half32 => Some(32),
        }
    }
}

/// Window over which the temporal filter measures the current frame's color
/// variance when clamping history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalKernel {
    Disabled,
    Half3,
    Half7,
    Half16,
}

impl TemporalKernel {
    fn half_size(self) -> Option<isize> {
        match self {
            TemporalKernel::Disabled => None,
            TemporalKernel::Half3 => Some(3),
            TemporalKernel::Half7 => Some(7),
            TemporalKernel::Half16 => Some(16),
        }
    }
}

/// Denoiser configuration, serializable so hosts can persist presets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DenoiserSettings {
    #[serde(default = "default_spatial")]
    pub spatial: SpatialKernel,
    #[serde(default = "default_temporal")]
    pub temporal: TemporalKernel,
    /// Width of the accepted history range, in multiples of the neighborhood
    /// color deviation around the current pixel's color.
    #[serde(default = "default_variance_tolerance")]
    pub variance_tolerance: f32,
    /// Blend weight of the current frame against accumulated history.
    #[serde(default = "default_frame_weight")]
    pub current_frame_weight: f32,
    /// Clamp the spatial filter's output to [0, 1] per channel.
    #[serde(default = "default_immediate_clamp")]
    pub immediate_clamp: bool,
}

fn default_spatial() -> SpatialKernel {
    SpatialKernel::Half16
}
fn default_temporal() -> TemporalKernel {
    TemporalKernel::Half7
}
fn default_variance_tolerance() -> f32 {
    1.0
}
fn default_frame_weight() -> f32 {
    0.2
}
fn default_immediate_clamp() -> bool {
    true
}

impl Default for DenoiserSettings {
    fn default() -> Self {
        Self {
            spatial: default_spatial(),
            temporal: default_temporal(),
            variance_tolerance: default_variance_tolerance(),
            current_frame_weight: default_frame_weight(),
            immediate_clamp: default_immediate_clamp(),
        }
    }
}

/// Owns the previous frame's G-buffer for temporal reprojection.
pub struct Denoiser {
    previous: GBuffer,
    history_valid: bool,
}

impl Denoiser {
    pub fn new() -> Self {
        Self {
            previous: GBuffer::new(0, 0),
            history_valid: false,
        }
    }

    /// Drop accumulated history, e.g. after a viewport resize or a scene
    /// edit. The next frame passes through unblended.
    pub fn reset_history(&mut self) {
        self.history_valid = false;
    }

    /// Replace every contributing pixel's color with the joint bilateral
    /// average of its neighborhood. Geometry channels are left untouched.
    pub fn spatial(&self, gbuffer: &mut GBuffer, settings: &DenoiserSettings) {
        let Some(half) = settings.spatial.half_size() else {
            return;
        };
        let (width, height) = (gbuffer.width(), gbuffer.height());
        if width == 0 || height == 0 {
            return;
        }

        let filtered: Vec<Color> = (0..width * height)
            .into_par_iter()
            .map(|i| {
                let (x, y) = (i % width, i / width);
                filter_pixel(gbuffer, x, y, half, settings.immediate_clamp)
            })
            .collect();
        gbuffer.color.fill_from(filtered);
    }

    /// Blend the frame against reprojected history, then adopt it as the new
    /// history. Pixels whose reprojection fails, falls off screen, or lands
    /// on a different primitive restart from the current frame alone.
    pub fn temporal(&mut self, gbuffer: &mut GBuffer, settings: &DenoiserSettings) {
        let (width, height) = (gbuffer.width(), gbuffer.height());
        if width == 0 || height == 0 {
            self.history_valid = false;
            return;
        }
        let Some(half) = settings.temporal.half_size() else {
            // Disabling the filter also forgets what it had accumulated.
            self.history_valid = false;
            return;
        };

        let usable_history = self.history_valid
            && self.previous.width() == width
            && self.previous.height() == height;

        if usable_history {
            let blended: Vec<Color> = (0..width * height)
                .into_par_iter()
                .map(|i| {
                    let (x, y) = (i % width, i / width);
                    self.blend_pixel(gbuffer, x, y, half, settings)
                })
                .collect();
            gbuffer.color.fill_from(blended);
        }

        self.previous = gbuffer.clone();
        self.history_valid = true;
    }

    fn blend_pixel(
        &self,
        gbuffer: &GBuffer,
        x: usize,
        y: usize,
        half: isize,
        settings: &DenoiserSettings,
    ) -> Color {
        let current = *gbuffer.color.get(x, y);
        if !*gbuffer.contributor.get(x, y) {
            return current;
        }

        // Reproject this frame's surface point through last frame's camera.
        let world = *gbuffer.world_position.get(x, y);
        let clip = self.previous.projection * self.previous.view * world.extend(1.0);
        if clip.w <= 0.0 {
            return current;
        }
        let ndc = clip.xyz() / clip.w;
        let px = (ndc.x + 1.0) / 2.0 * gbuffer.width() as f32;
        let py = (ndc.y + 1.0) / 2.0 * gbuffer.height() as f32;
        if px < 0.0 || py < 0.0 || px >= gbuffer.width() as f32 || py >= gbuffer.height() as f32 {
            return current;
        }
        let (hx, hy) = (px as usize, py as usize);

        // The history pixel must show the same primitive, otherwise this is
        // a disocclusion and history would ghost.
        if *self.previous.primitive_id.get(hx, hy) != *gbuffer.primitive_id.get(x, y) {
            return current;
        }
        let mut history = *self.previous.color.get(hx, hy);

        // Rein history in against the current frame's local color spread so
        // stale accumulation cannot linger. The envelope is centered on this
        // pixel's own filtered color.
        if let Some(deviation) = neighborhood_deviation(gbuffer, x, y, half, current) {
            let lo = current - settings.variance_tolerance * deviation;
            let hi = current + settings.variance_tolerance * deviation;
            history = history.clamp(lo, hi);
        }

        let w = settings.current_frame_weight;
        current * w + history * (1.0 - w)
    }
}

impl Default for Denoiser {
    fn default() -> Self {
        Self::new()
    }
}

/// Joint bilateral average at one pixel. Non-contributing pixels pass
/// through unclamped; non-contributing neighbors are excluded. The center
/// pixel always participates with weight 1.
fn filter_pixel(gbuffer: &GBuffer, x: usize, y: usize, half: isize, clamp: bool) -> Color {
    if !*gbuffer.contributor.get(x, y) {
        return *gbuffer.color.get(x, y);
    }
    let center_color = *gbuffer.color.get(x, y);
    let center_normal = *gbuffer.world_normal.get(x, y);
    let center_position = *gbuffer.world_position.get(x, y);

    let mut sum = center_color;
    let mut weight_sum = 1.0;

    let (width, height) = (gbuffer.width() as isize, gbuffer.height() as isize);
    let (cx, cy) = (x as isize, y as isize);
    for ny in (cy - half).max(0)..=(cy + half).min(height - 1) {
        for nx in (cx - half).max(0)..=(cx + half).min(width - 1) {
            if nx == cx && ny == cy {
                continue;
            }
            let (qx, qy) = (nx as usize, ny as usize);
            if !*gbuffer.contributor.get(qx, qy) {
                continue;
            }

            let w = bilateral_weight(
                (cx - nx) as f32,
                (cy - ny) as f32,
                center_color,
                *gbuffer.color.get(qx, qy),
                center_normal,
                *gbuffer.world_normal.get(qx, qy),
                center_position,
                *gbuffer.world_position.get(qx, qy),
            );
            sum += *gbuffer.color.get(qx, qy) * w;
            weight_sum += w;
        }
    }
    let filtered = sum / weight_sum;
    if clamp {
        filtered.clamp(Vec3::ZERO, Vec3::ONE)
    } else {
        filtered
    }
}

#[allow(clippy::too_many_arguments)]
fn bilateral_weight(
    dx: f32,
    dy: f32,
    color_p: Color,
    color_q: Color,
    normal_p: Vec3,
    normal_q: Vec3,
    position_p: Vec3,
    position_q: Vec3,
) -> f32 {
    let d_pixel = dx * dx + dy * dy;
    let d_color = (color_q - color_p).length_squared();
    // Angle between the normals, not just the dot product, so grazing
    // differences register.
    let d_normal = normal_p.dot(normal_q).clamp(-1.0, 1.0).acos().powi(2);
    // Distance of the neighbor's point from the center's tangent plane.
    let d_plane = normal_p.dot(position_q - position_p).powi(2);

    (-(d_pixel / (2.0 * SIGMA_PIXEL * SIGMA_PIXEL)
        + d_color / (2.0 * SIGMA_COLOR * SIGMA_COLOR)
        + d_normal / (2.0 * SIGMA_NORMAL * SIGMA_NORMAL)
        + d_plane / (2.0 * SIGMA_PLANE * SIGMA_PLANE)))
        .exp()
}

/// Per-channel root-mean-square deviation of the contributing colors in a
/// window, measured about the window's center color rather than the window
/// mean. `None` when no contributor lies inside it.
fn neighborhood_deviation(
    gbuffer: &GBuffer,
    x: usize,
    y: usize,
    half: isize,
    center: Color,
) -> Option<Color> {
    let (width, height) = (gbuffer.width() as isize, gbuffer.height() as isize);
    let (cx, cy) = (x as isize, y as isize);

    let mut sum_sq = Vec3::ZERO;
    let mut count = 0;
    for ny in (cy - half).max(0)..=(cy + half).min(height - 1) {
        for nx in (cx - half).max(0)..=(cx + half).min(width - 1) {
            let (qx, qy) = (nx as usize, ny as usize);
            if !*gbuffer.contributor.get(qx, qy) {
                continue;
            }
            let d = *gbuffer.color.get(qx, qy) - center;
            sum_sq += d * d;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    let mean_sq = sum_sq / count as f32;
    Some(Vec3::new(mean_sq.x.sqrt(), mean_sq.y.sqrt(), mean_sq.z.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_math::Mat4;

    // A flat G-buffer whose world positions reproject onto their own pixel
    // under identity camera matrices.
    fn flat_gbuffer(width: usize, height: usize, color: Color) -> GBuffer {
        let mut g = GBuffer::new(width, height);
        g.projection = Mat4::IDENTITY;
        g.view = Mat4::IDENTITY;
        for y in 0..height {
            for x in 0..width {
                let ndc_x = 2.0 * (x as f32 + 0.5) / width as f32 - 1.0;
                let ndc_y = 2.0 * (y as f32 + 0.5) / height as f32 - 1.0;
                g.color.set(x, y, color);
                g.world_position.set(x, y, Vec3::new(ndc_x, ndc_y, 0.5));
                g.world_normal.set(x, y, Vec3::Z);
                g.primitive_id.set(x, y, 1);
                g.contributor.set(x, y, true);
            }
        }
        g
    }

    fn spatial_settings(kernel: SpatialKernel) -> DenoiserSettings {
        DenoiserSettings {
            spatial: kernel,
            ..DenoiserSettings::default()
        }
    }

    #[test]
    fn test_spatial_identity_on_uniform_image() {
        let denoiser = Denoiser::new();
        let mut g = flat_gbuffer(8, 8, Color::splat(0.4));
        denoiser.spatial(&mut g, &spatial_settings(SpatialKernel::Half3));

        for c in g.color.as_slice() {
            assert!((*c - Color::splat(0.4)).length() < 1e-5);
        }
    }

    #[test]
    fn test_spatial_disabled_is_noop() {
        let denoiser = Denoiser::new();
        let mut g = flat_gbuffer(4, 4, Color::splat(0.4));
        g.color.set(2, 2, Color::splat(9.0));
        denoiser.spatial(&mut g, &spatial_settings(SpatialKernel::Disabled));

        assert_eq!(*g.color.get(2, 2), Color::splat(9.0));
    }

    #[test]
    fn test_spatial_pulls_outlier_toward_neighbors() {
        // A mild outlier within the color falloff gets averaged down; a
        // bilateral filter deliberately preserves extreme ones as edges.
        let denoiser = Denoiser::new();
        let mut g = flat_gbuffer(9, 9, Color::splat(0.4));
        g.color.set(4, 4, Color::splat(0.7));
        denoiser.spatial(&mut g, &spatial_settings(SpatialKernel::Half3));

        let filtered = g.color.get(4, 4).x;
        assert!(filtered < 0.45, "outlier not smoothed: {filtered}");
        assert!(filtered > 0.4);
    }

    #[test]
    fn test_spatial_skips_sky_pixels() {
        let denoiser = Denoiser::new();
        let mut g = flat_gbuffer(5, 5, Color::splat(0.4));
        // Left half is sky with an absurd color; it must not leak into the
        // surface pixels, and it must pass through unchanged.
        for y in 0..5 {
            for x in 0..2 {
                g.contributor.set(x, y, false);
                g.color.set(x, y, Color::splat(50.0));
            }
        }
        denoiser.spatial(&mut g, &spatial_settings(SpatialKernel::Half3));

        assert!((g.color.get(2, 2).x - 0.4).abs() < 1e-4);
        assert_eq!(*g.color.get(0, 0), Color::splat(50.0));
    }

    #[test]
    fn test_spatial_respects_normal_edges() {
        let denoiser = Denoiser::new();
        let mut g = flat_gbuffer(8, 8, Color::splat(0.2));
        // Right half: a differently oriented, differently lit surface.
        for y in 0..8 {
            for x in 4..8 {
                g.world_normal.set(x, y, Vec3::X);
                g.color.set(x, y, Color::splat(0.9));
            }
        }
        denoiser.spatial(&mut g, &spatial_settings(SpatialKernel::Half3));

        // The orthogonal-normal weight is ~exp(-123), so the halves do not
        // mix measurably.
        assert!((g.color.get(3, 4).x - 0.2).abs() < 1e-3);
        assert!((g.color.get(4, 4).x - 0.9).abs() < 1e-3);
    }

    #[test]
    fn test_spatial_clamps_output_to_unit_range() {
        let denoiser = Denoiser::new();
        let mut g = flat_gbuffer(5, 5, Color::splat(40.0));
        denoiser.spatial(&mut g, &spatial_settings(SpatialKernel::Half3));

        assert_eq!(*g.color.get(2, 2), Color::splat(1.0));
    }

    #[test]
    fn test_spatial_without_immediate_clamp_keeps_overbright_output() {
        let denoiser = Denoiser::new();
        let mut g = flat_gbuffer(5, 5, Color::splat(40.0));
        let settings = DenoiserSettings {
            immediate_clamp: false,
            ..spatial_settings(SpatialKernel::Half3)
        };
        denoiser.spatial(&mut g, &settings);

        assert_eq!(*g.color.get(2, 2), Color::splat(40.0));
    }

    #[test]
    fn test_temporal_first_frame_passes_through() {
        let mut denoiser = Denoiser::new();
        let settings = DenoiserSettings::default();
        let mut g = flat_gbuffer(4, 4, Color::splat(0.8));
        denoiser.temporal(&mut g, &settings);

        assert_eq!(*g.color.get(1, 1), Color::splat(0.8));
    }

    #[test]
    fn test_temporal_blends_static_history() {
        let mut denoiser = Denoiser::new();
        let settings = DenoiserSettings {
            // Wide tolerance so the clamp stays out of this test's way.
            variance_tolerance: 100.0,
            ..DenoiserSettings::default()
        };

        let mut first = flat_gbuffer(4, 4, Color::splat(1.0));
        denoiser.temporal(&mut first, &settings);

        // A few bright pixels give the frame a nonzero color deviation, so
        // the wide tolerance admits the history untouched.
        let mut second = flat_gbuffer(4, 4, Color::splat(0.0));
        for (x, y) in [(0, 0), (0, 3), (3, 0), (3, 3)] {
            second.color.set(x, y, Color::splat(2.0));
        }
        denoiser.temporal(&mut second, &settings);

        // 0.2 * current + 0.8 * history
        assert!((second.color.get(2, 2).x - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_temporal_rejects_history_of_other_primitive() {
        let mut denoiser = Denoiser::new();
        let settings = DenoiserSettings {
            variance_tolerance: 100.0,
            ..DenoiserSettings::default()
        };

        let mut first = flat_gbuffer(4, 4, Color::splat(1.0));
        denoiser.temporal(&mut first, &settings);

        let mut second = flat_gbuffer(4, 4, Color::splat(0.0));
        for y in 0..4 {
            for x in 0..4 {
                second.primitive_id.set(x, y, 2);
            }
        }
        denoiser.temporal(&mut second, &settings);

        assert_eq!(*second.color.get(2, 2), Color::splat(0.0));
    }

    #[test]
    fn test_temporal_clamps_stale_history() {
        let mut denoiser = Denoiser::new();
        let settings = DenoiserSettings::default();

        // History is far brighter than anything in the current frame.
        let mut first = flat_gbuffer(4, 4, Color::splat(40.0));
        denoiser.temporal(&mut first, &settings);

        let mut second = flat_gbuffer(4, 4, Color::splat(0.5));
        denoiser.temporal(&mut second, &settings);

        // Uniform current frame: zero deviation about the pixel, so history
        // clamps onto the current value and the blend returns it.
        assert!((second.color.get(1, 1).x - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_temporal_disabled_clears_history() {
        let mut denoiser = Denoiser::new();
        let settings = DenoiserSettings {
            variance_tolerance: 100.0,
            ..DenoiserSettings::default()
        };

        let mut first = flat_gbuffer(4, 4, Color::splat(1.0));
        denoiser.temporal(&mut first, &settings);

        let disabled = DenoiserSettings {
            temporal: TemporalKernel::Disabled,
            ..settings
        };
        let mut second = flat_gbuffer(4, 4, Color::splat(0.5));
        denoiser.temporal(&mut second, &disabled);
        assert_eq!(*second.color.get(1, 1), Color::splat(0.5));

        // Re-enabling starts from scratch: the old history is gone.
        let mut third = flat_gbuffer(4, 4, Color::splat(0.0));
        denoiser.temporal(&mut third, &settings);
        assert_eq!(*third.color.get(1, 1), Color::splat(0.0));
    }

    #[test]
    fn test_temporal_reset_forgets_history() {
        let mut denoiser = Denoiser::new();
        let settings = DenoiserSettings {
            variance_tolerance: 100.0,
            ..DenoiserSettings::default()
        };

        let mut first = flat_gbuffer(4, 4, Color::splat(1.0));
        denoiser.temporal(&mut first, &settings);
        denoiser.reset_history();

        let mut second = flat_gbuffer(4, 4, Color::splat(0.0));
        denoiser.temporal(&mut second, &settings);

        assert_eq!(*second.color.get(2, 2), Color::splat(0.0));
    }

    #[test]
    fn test_temporal_resize_invalidates_history() {
        let mut denoiser = Denoiser::new();
        let settings = DenoiserSettings {
            variance_tolerance: 100.0,
            ..DenoiserSettings::default()
        };

        let mut first = flat_gbuffer(4, 4, Color::splat(1.0));
        denoiser.temporal(&mut first, &settings);

        let mut second = flat_gbuffer(8, 8, Color::splat(0.0));
        denoiser.temporal(&mut second, &settings);

        assert_eq!(*second.color.get(2, 2), Color::splat(0.0));
    }

    #[test]
    fn test_settings_roundtrip_through_serde() {
        let settings = DenoiserSettings {
            spatial: SpatialKernel::Half32,
            temporal: TemporalKernel::Half16,
            variance_tolerance: 2.0,
            current_frame_weight: 0.1,
            immediate_clamp: false,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: DenoiserSettings = serde_json::from_str(&json).unwrap();

        assert_eq!(back.spatial, SpatialKernel::Half32);
        assert_eq!(back.temporal, TemporalKernel::Half16);
        assert!(!back.immediate_clamp);
    }
}
