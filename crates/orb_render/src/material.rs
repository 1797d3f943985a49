//! Material model and the optics helpers shared by both integrators.

use crate::Color;
use glam::Vec3;
use rand::Rng;
use std::f32::consts::PI;

/// Emission lengths below this are treated as "not emitting".
const EMISSION_EPSILON: f32 = 1e-5;

/// Surface nature. Exactly one is active per material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Perfect mirror; contribution weighted by exact Fresnel reflectance.
    Reflective,
    /// Dielectric splitting into reflected and refracted rays.
    ReflectiveRefractive,
    /// Lambertian diffuse, possibly emissive (area light).
    DiffuseGlossy,
}

/// Tagged material variant.
///
/// Directions passed to [`brdf`](Material::brdf), [`pdf`](Material::pdf) and
/// [`sample`](Material::sample) are unit vectors oriented outward from the
/// shading point, following the direction photons travel.
#[derive(Debug, Clone)]
pub struct Material {
    pub kind: MaterialKind,
    /// Albedo of the diffuse lobe.
    pub albedo: Color,
    pub refractive_index: f32,
    /// Blinn-Phong weights for the legacy Whitted integrator.
    pub phong_diffuse: f32,
    pub phong_specular: f32,
    /// Larger exponent means a tighter specular highlight.
    pub specular_exponent: f32,
    emission: Color,
    emitting: bool,
}

impl Material {
    pub fn new(kind: MaterialKind, albedo: Color, emission: Color) -> Self {
        Self {
            kind,
            albedo,
            refractive_index: 1.0,
            phong_diffuse: 0.8,
            phong_specular: 0.2,
            specular_exponent: 25.0,
            emission,
            // decided once here so the integrator never re-measures it
            emitting: emission.length() > EMISSION_EPSILON,
        }
    }

    pub fn diffuse(albedo: Color) -> Self {
        Self::new(MaterialKind::DiffuseGlossy, albedo, Color::ZERO)
    }

    pub fn emissive(albedo: Color, emission: Color) -> Self {
        Self::new(MaterialKind::DiffuseGlossy, albedo, emission)
    }

    pub fn mirror(refractive_index: f32) -> Self {
        let mut m = Self::new(MaterialKind::Reflective, Color::ZERO, Color::ZERO);
        m.refractive_index = refractive_index;
        m
    }

    pub fn dielectric(refractive_index: f32) -> Self {
        let mut m = Self::new(MaterialKind::ReflectiveRefractive, Color::ZERO, Color::ZERO);
        m.refractive_index = refractive_index;
        m
    }

    #[inline]
    pub fn is_emitting(&self) -> bool {
        self.emitting
    }

    #[inline]
    pub fn emission(&self) -> Color {
        self.emission
    }

    /// Lambertian BRDF: `albedo / pi` when `w_in` is on the normal's side,
    /// zero otherwise.
    pub fn brdf(&self, _w_out: Vec3, w_in: Vec3, normal: Vec3) -> Color {
        if w_in.dot(normal) >= 0.0 {
            self.albedo / PI
        } else {
            Color::ZERO
        }
    }

    /// Density of [`sample`](Material::sample): uniform over the hemisphere.
    pub fn pdf(&self, _w_out: Vec3, _w_in: Vec3, _normal: Vec3) -> f32 {
        1.0 / (2.0 * PI)
    }

    /// Draw an incoming direction from the uniform hemisphere about the
    /// normal.
    pub fn sample<R: Rng + ?Sized>(&self, _w_out: Vec3, normal: Vec3, rng: &mut R) -> Vec3 {
        let z = rng.gen::<f32>();
        let radius = (1.0 - z * z).max(0.0).sqrt();
        let phi = 2.0 * PI * rng.gen::<f32>();
        let local = Vec3::new(radius * phi.cos(), radius * phi.sin(), z);

        // Orthonormal basis about the normal; pick whichever tangent
        // construction avoids a degenerate cross product.
        let tangent = if normal.x.abs() > normal.y.abs() {
            Vec3::new(normal.z, 0.0, -normal.x).normalize()
        } else {
            Vec3::new(0.0, normal.z, -normal.y).normalize()
        };
        let bitangent = tangent.cross(normal);

        local.x * bitangent + local.y * tangent + local.z * normal
    }
}

/// Mirror reflection about the surface normal. Works from either side since
/// the normal always points outward.
#[inline]
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * incident.dot(normal) * normal
}

/// Refraction direction by Snell's law.
///
/// `incident` points toward the surface, `normal` outward; both unit length.
/// Returns the zero vector on total internal reflection; the caller treats
/// that as a sample that contributes no radiance.
pub fn refract(incident: Vec3, normal: Vec3, refractive_index: f32) -> Vec3 {
    let mut eta_in = 1.0;
    let mut eta_out = refractive_index;
    let mut n = normal;
    let mut cos_incident = incident.dot(normal).clamp(-1.0, 1.0);
    if cos_incident < 0.0 {
        // entering the medium
        cos_incident = -cos_incident;
    } else {
        // leaving: swap the indices and flip the working normal
        std::mem::swap(&mut eta_in, &mut eta_out);
        n = -n;
    }
    let eta_ratio = eta_in / eta_out;
    let cos_refract_sq = 1.0 - eta_ratio * eta_ratio * (1.0 - cos_incident * cos_incident);
    if cos_refract_sq < 0.0 {
        Vec3::ZERO
    } else {
        eta_ratio * incident + (eta_ratio * cos_incident - cos_refract_sq.sqrt()) * n
    }
}

/// Exact (polarization-aware) Fresnel reflectance, not Schlick's
/// approximation: the perpendicular and parallel terms are averaged, and the
/// relative indices swap when the ray leaves the denser medium. Total
/// internal reflection yields 1.
pub fn fresnel(incident: Vec3, normal: Vec3, refractive_index: f32) -> f32 {
    let mut eta_in = 1.0;
    let mut eta_out = refractive_index;
    let mut cos_incident = incident.dot(normal).clamp(-1.0, 1.0);
    if cos_incident < 0.0 {
        cos_incident = -cos_incident;
    } else {
        std::mem::swap(&mut eta_in, &mut eta_out);
    }
    let sin_refract = eta_in / eta_out * (1.0 - cos_incident * cos_incident).max(0.0).sqrt();
    if sin_refract > 1.0 {
        return 1.0;
    }
    let cos_refract = (1.0 - sin_refract * sin_refract).max(0.0).sqrt();
    let r_s = (eta_in * cos_incident - eta_out * cos_refract)
        / (eta_in * cos_incident + eta_out * cos_refract);
    let r_p = (eta_in * cos_refract - eta_out * cos_incident)
        / (eta_in * cos_refract + eta_out * cos_incident);
    (r_s * r_s + r_p * r_p) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_emitting_flag() {
        let lamp = Material::emissive(Color::splat(0.7), Color::new(47.8, 38.6, 31.1));
        assert!(lamp.is_emitting());

        let wall = Material::diffuse(Color::splat(0.7));
        assert!(!wall.is_emitting());
        assert_eq!(wall.emission(), Color::ZERO);
    }

    #[test]
    fn test_brdf_hemisphere() {
        let m = Material::diffuse(Color::splat(0.5));
        let n = Vec3::Y;

        let above = m.brdf(Vec3::Y, Vec3::new(0.3, 0.8, 0.0).normalize(), n);
        assert!((above.x - 0.5 / PI).abs() < 1e-6);

        let below = m.brdf(Vec3::Y, Vec3::new(0.3, -0.8, 0.0).normalize(), n);
        assert_eq!(below, Color::ZERO);
    }

    #[test]
    fn test_pdf_uniform_hemisphere() {
        let m = Material::diffuse(Color::ONE);
        assert!((m.pdf(Vec3::Y, Vec3::Y, Vec3::Y) - 1.0 / (2.0 * PI)).abs() < 1e-7);
    }

    #[test]
    fn test_sample_stays_above_surface() {
        let m = Material::diffuse(Color::ONE);
        let mut rng = StdRng::seed_from_u64(7);

        for normal in [Vec3::Y, Vec3::NEG_Z, Vec3::new(1.0, 2.0, -0.5).normalize()] {
            for _ in 0..200 {
                let w_in = m.sample(normal, normal, &mut rng);
                assert!((w_in.length() - 1.0).abs() < 1e-4);
                assert!(w_in.dot(normal) >= -1e-4);
            }
        }
    }

    #[test]
    fn test_reflect() {
        let incident = Vec3::new(1.0, -1.0, 0.0).normalize();
        let reflected = reflect(incident, Vec3::Y);
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();

        assert!((reflected - expected).length() < 1e-6);
    }

    #[test]
    fn test_refract_bends_toward_normal() {
        // Entering a denser medium at 45 degrees.
        let incident = Vec3::new(1.0, -1.0, 0.0).normalize();
        let refracted = refract(incident, Vec3::Y, 1.5);

        assert!((refracted.length() - 1.0).abs() < 1e-4);
        // sin(theta_t) = sin(45) / 1.5
        let sin_t = (0.5f32).sqrt() / 1.5;
        assert!((refracted.x - sin_t).abs() < 1e-4);
        assert!(refracted.y < 0.0);
    }

    #[test]
    fn test_refract_total_internal_reflection() {
        // Leaving glass at a grazing angle: past the critical angle.
        let incident = Vec3::new(0.9, 0.436, 0.0).normalize();
        let refracted = refract(incident, Vec3::Y, 1.5);

        assert_eq!(refracted, Vec3::ZERO);
        assert_eq!(fresnel(incident, Vec3::Y, 1.5), 1.0);
    }

    #[test]
    fn test_fresnel_normal_incidence() {
        // R0 = ((n1 - n2) / (n1 + n2))^2 = 0.04 for glass.
        let r = fresnel(Vec3::NEG_Y, Vec3::Y, 1.5);
        assert!((r - 0.04).abs() < 1e-3);
    }

    #[test]
    fn test_fresnel_grazing_reflectance() {
        let incident = Vec3::new(0.9999, -0.0141, 0.0).normalize();
        let r = fresnel(incident, Vec3::Y, 1.5);
        assert!(r > 0.9);
    }
}
