//! Light transport: Monte Carlo path tracing with next-event estimation and
//! Russian roulette, plus the legacy Whitted-style recursion kept for fast
//! previews and point-lit scenes.

use crate::{fresnel, reflect, refract, Color, Intersection, MaterialKind, Scene};
use orb_math::{Ray, Vec3};
use rand::rngs::StdRng;
use rand::Rng;

/// Distance slack when testing a shadow ray against the light's own surface.
const OCCLUSION_TOLERANCE: f32 = 0.01;

/// Knobs of the path integrator, threaded explicitly through every call.
#[derive(Debug, Clone, Copy)]
pub struct PathConfig {
    /// Russian roulette continuation probability after each diffuse bounce.
    pub rr_survival: f32,
    /// Hard recursion cap; roulette terminates most paths long before this.
    pub max_depth: u32,
    /// Offset applied along a secondary ray's direction so it cannot
    /// re-intersect the surface it just left.
    pub correction: f32,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            rr_survival: 0.8,
            max_depth: 32,
            correction: 1e-2,
        }
    }
}

/// Result of shading one primary ray: the radiance estimate plus the
/// geometry channels the denoiser keys on.
#[derive(Debug, Clone, Copy)]
pub struct ShadedPixel {
    pub color: Color,
    pub world_position: Vec3,
    pub world_normal: Vec3,
    pub primitive_id: i32,
    /// False when the primary ray escaped to the sky; such pixels carry no
    /// usable geometry and the filters leave them untouched.
    pub contributor: bool,
}

impl ShadedPixel {
    fn sky(color: Color) -> Self {
        Self {
            color,
            world_position: Vec3::ZERO,
            world_normal: Vec3::ZERO,
            primitive_id: -1,
            contributor: false,
        }
    }

    fn surface(color: Color, hit: &Intersection<'_>, view_direction: Vec3) -> Self {
        // The stored normal faces the viewer so the denoiser compares
        // consistent orientations on two-sided surfaces.
        let normal = if hit.normal.dot(view_direction) > 0.0 {
            -hit.normal
        } else {
            hit.normal
        };
        Self {
            color,
            world_position: hit.location,
            world_normal: normal,
            primitive_id: hit.primitive_id,
            contributor: true,
        }
    }
}

/// Shade one primary ray with the path integrator. The direction need not
/// be unit length; a zero direction shades black.
pub fn trace_path(
    scene: &Scene,
    ray: &Ray,
    config: &PathConfig,
    rng: &mut StdRng,
) -> ShadedPixel {
    if ray.direction == Vec3::ZERO {
        return ShadedPixel::sky(Color::ZERO);
    }
    let ray = Ray::new(ray.origin, ray.direction.normalize());
    let hit = scene.intersect(&ray);
    if !hit.hit {
        return ShadedPixel::sky(scene.sky);
    }
    let color = shade_path(scene, &hit, -ray.direction, 0, config, rng);
    ShadedPixel::surface(color, &hit, ray.direction)
}

fn shade_path(
    scene: &Scene,
    hit: &Intersection<'_>,
    w_out: Vec3,
    depth: u32,
    config: &PathConfig,
    rng: &mut StdRng,
) -> Color {
    let Some(material) = hit.material else {
        return Color::ZERO;
    };

    match material.kind {
        MaterialKind::Reflective => {
            if depth >= config.max_depth {
                return Color::ZERO;
            }
            let kr = fresnel(-w_out, hit.normal, material.refractive_index);
            kr * trace_specular(scene, hit.location, reflect(-w_out, hit.normal), depth, config, rng)
        }
        MaterialKind::ReflectiveRefractive => {
            if depth >= config.max_depth {
                return Color::ZERO;
            }
            let kr = fresnel(-w_out, hit.normal, material.refractive_index);
            let reflected =
                trace_specular(scene, hit.location, reflect(-w_out, hit.normal), depth, config, rng);
            let transmitted = refract(-w_out, hit.normal, material.refractive_index);
            if transmitted == Vec3::ZERO {
                // total internal reflection
                kr * reflected
            } else {
                kr * reflected
                    + (1.0 - kr) * trace_specular(scene, hit.location, transmitted, depth, config, rng)
            }
        }
        MaterialKind::DiffuseGlossy => {
            // Emitters return their radiance directly; indirect rays never
            // reach here because the bounce loop skips emissive hits.
            if material.is_emitting() {
                return material.emission();
            }

            // Diffuse surfaces are two-sided: shade about the normal on the
            // viewer's side.
            let normal = facing_normal(hit.normal, w_out);
            let mut radiance = direct_light(scene, hit, normal, w_out, config, rng);

            // Roulette decides continuation; the hard cap is a backstop.
            if depth >= config.max_depth || rng.gen::<f32>() >= config.rr_survival {
                return radiance;
            }

            let w_in = material.sample(w_out, normal, rng);
            let bounce = Ray::new(hit.location + w_in * config.correction, w_in);
            let next = scene.intersect(&bounce);
            if next.hit && !next.material.map_or(false, |m| m.is_emitting()) {
                let incoming = shade_path(scene, &next, -w_in, depth + 1, config, rng);
                radiance += incoming * material.brdf(w_out, w_in, normal)
                    * w_in.dot(normal).max(0.0)
                    / material.pdf(w_out, w_in, normal)
                    / config.rr_survival;
            }
            radiance
        }
    }
}

/// Geometric normal flipped onto the side the viewer sees.
#[inline]
fn facing_normal(normal: Vec3, w_out: Vec3) -> Vec3 {
    if normal.dot(w_out) < 0.0 {
        -normal
    } else {
        normal
    }
}

/// Follow a mirror or transmission direction one level deeper. Specular rays
/// that escape see the sky.
fn trace_specular(
    scene: &Scene,
    origin: Vec3,
    direction: Vec3,
    depth: u32,
    config: &PathConfig,
    rng: &mut StdRng,
) -> Color {
    let ray = Ray::new(origin + direction * config.correction, direction);
    let hit = scene.intersect(&ray);
    if !hit.hit {
        return scene.sky;
    }
    shade_path(scene, &hit, -direction, depth + 1, config, rng)
}

/// Next-event estimation: one uniform area sample on the emissive surface,
/// weighted by the geometry term and the sample density.
fn direct_light(
    scene: &Scene,
    hit: &Intersection<'_>,
    normal: Vec3,
    w_out: Vec3,
    config: &PathConfig,
    rng: &mut StdRng,
) -> Color {
    let Some(light) = scene.sample_light(rng) else {
        return Color::ZERO;
    };
    let Some(material) = hit.material else {
        return Color::ZERO;
    };

    let to_light = light.location - hit.location;
    let distance_sq = to_light.length_squared();
    let distance = distance_sq.sqrt();
    let w_light = to_light / distance;

    // Absolute cosines: the emitter radiates from both faces, and the BRDF
    // already zeroes directions below the shading normal.
    let cos_surface = w_light.dot(normal).abs();
    let cos_light = w_light.dot(light.normal).abs();
    if light.pdf <= 0.0 {
        return Color::ZERO;
    }

    let shadow = Ray::new(hit.location + w_light * config.correction, w_light);
    let blocker = scene.intersect(&shadow);
    if blocker.hit && blocker.t + OCCLUSION_TOLERANCE < distance {
        return Color::ZERO;
    }

    light.emission * material.brdf(w_out, w_light, normal) * cos_surface * cos_light
        / distance_sq
        / light.pdf
}

/// Shade one primary ray with the Whitted-style recursion: deterministic
/// specular branches and Blinn-Phong shading under the scene's point lights.
pub fn trace_whitted(scene: &Scene, ray: &Ray, config: &PathConfig) -> ShadedPixel {
    if ray.direction == Vec3::ZERO {
        return ShadedPixel::sky(Color::ZERO);
    }
    let ray = Ray::new(ray.origin, ray.direction.normalize());
    let hit = scene.intersect(&ray);
    if !hit.hit {
        return ShadedPixel::sky(scene.sky);
    }
    let color = shade_whitted(scene, &hit, -ray.direction, 0, config);
    ShadedPixel::surface(color, &hit, ray.direction)
}

fn shade_whitted(
    scene: &Scene,
    hit: &Intersection<'_>,
    w_out: Vec3,
    depth: u32,
    config: &PathConfig,
) -> Color {
    let Some(material) = hit.material else {
        return Color::ZERO;
    };

    match material.kind {
        MaterialKind::Reflective => {
            if depth >= config.max_depth {
                return Color::ZERO;
            }
            let kr = fresnel(-w_out, hit.normal, material.refractive_index);
            kr * whitted_secondary(scene, hit.location, reflect(-w_out, hit.normal), depth, config)
        }
        MaterialKind::ReflectiveRefractive => {
            if depth >= config.max_depth {
                return Color::ZERO;
            }
            let kr = fresnel(-w_out, hit.normal, material.refractive_index);
            let reflected =
                whitted_secondary(scene, hit.location, reflect(-w_out, hit.normal), depth, config);
            let transmitted = refract(-w_out, hit.normal, material.refractive_index);
            if transmitted == Vec3::ZERO {
                kr * reflected
            } else {
                kr * reflected
                    + (1.0 - kr)
                        * whitted_secondary(scene, hit.location, transmitted, depth, config)
            }
        }
        MaterialKind::DiffuseGlossy => {
            if material.is_emitting() {
                return material.emission();
            }

            let normal = facing_normal(hit.normal, w_out);
            let mut color = Color::ZERO;
            for light in scene.point_lights() {
                let to_light = light.position - hit.location;
                let distance_sq = to_light.length_squared();
                let distance = distance_sq.sqrt();
                let w_light = to_light / distance;

                let shadow = Ray::new(hit.location + w_light * config.correction, w_light);
                let blocker = scene.intersect(&shadow);
                if blocker.hit && blocker.t + OCCLUSION_TOLERANCE < distance {
                    continue;
                }

                let attenuated = light.radiance / distance_sq;
                let diffuse = w_light.dot(normal).max(0.0);
                let half = (w_light + w_out).normalize();
                let specular = half
                    .dot(normal)
                    .max(0.0)
                    .powf(material.specular_exponent);

                color += attenuated
                    * (material.phong_diffuse * diffuse * material.albedo
                        + material.phong_specular * specular);
            }
            color
        }
    }
}

fn whitted_secondary(
    scene: &Scene,
    origin: Vec3,
    direction: Vec3,
    depth: u32,
    config: &PathConfig,
) -> Color {
    let ray = Ray::new(origin + direction * config.correction, direction);
    let hit = scene.intersect(&ray);
    if !hit.hit {
        return scene.sky;
    }
    shade_whitted(scene, &hit, -direction, depth + 1, config)
}
