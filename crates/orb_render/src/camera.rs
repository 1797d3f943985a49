//! Camera collaborator: supplies the eye position, one ray direction per
//! pixel, and the view/projection matrices the temporal filter reprojects
//! through.

use orb_math::{Mat4, Vec3, Vec4, Vec4Swizzles};

/// A pinhole camera with cached per-pixel ray directions.
///
/// The render core only consumes [`position`](Self::position),
/// [`ray_directions`](Self::ray_directions) and the two matrices; how they
/// are produced (interactive controls, animation) is the host's business.
#[derive(Debug, Clone)]
pub struct RenderCamera {
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    vertical_fov_degrees: f32,
    near_clip: f32,
    far_clip: f32,

    width: u32,
    height: u32,
    projection: Mat4,
    view: Mat4,
    ray_directions: Vec<Vec3>,
}

impl RenderCamera {
    pub fn new(vertical_fov_degrees: f32, near_clip: f32, far_clip: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 6.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            vertical_fov_degrees,
            near_clip,
            far_clip,
            width: 0,
            height: 0,
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            ray_directions: Vec::new(),
        }
    }

    /// Place the camera. Takes effect on the next [`resize`](Self::resize).
    pub fn look_at(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.position = position;
        self.forward = (target - position).normalize();
        self.up = up;
    }

    /// Recompute matrices and per-pixel ray directions for a viewport.
    /// A zero-area viewport is valid and leaves no directions.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.ray_directions.clear();
        if width == 0 || height == 0 {
            return;
        }

        self.view = Mat4::look_at_rh(self.position, self.position + self.forward, self.up);
        self.projection = Mat4::perspective_rh(
            self.vertical_fov_degrees.to_radians(),
            width as f32 / height as f32,
            self.near_clip,
            self.far_clip,
        );

        let inverse_projection = self.projection.inverse();
        let inverse_view = self.view.inverse();

        self.ray_directions.reserve(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let ndc_x = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
                let ndc_y = (y as f32 + 0.5) / height as f32 * 2.0 - 1.0;

                // Unproject a far-plane point, then rotate the view-space
                // direction into world space.
                let target = inverse_projection * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
                let view_direction = (target.xyz() / target.w).normalize();
                let world_direction = (inverse_view * view_direction.extend(0.0)).xyz();
                self.ray_directions.push(world_direction);
            }
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// One world-space direction per pixel, row-major.
    pub fn ray_directions(&self) -> &[Vec3] {
        &self.ray_directions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_count_matches_viewport() {
        let mut camera = RenderCamera::new(45.0, 0.1, 100.0);
        camera.resize(16, 9);

        assert_eq!(camera.ray_directions().len(), 144);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let mut camera = RenderCamera::new(45.0, 0.1, 100.0);
        camera.look_at(Vec3::ZERO, Vec3::new(0.0, 0.0, -10.0), Vec3::Y);
        camera.resize(64, 64);

        // Pixels adjacent to the image center should look almost straight
        // down -Z.
        let dir = camera.ray_directions()[32 * 64 + 32];
        assert!(dir.z < -0.99);
    }

    #[test]
    fn test_reprojection_roundtrip() {
        let mut camera = RenderCamera::new(45.0, 0.1, 100.0);
        camera.look_at(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO, Vec3::Y);
        camera.resize(80, 60);

        // March along a pixel's ray, then project the point back: it must
        // land in the same pixel.
        let (x, y) = (17usize, 42usize);
        let dir = camera.ray_directions()[y * 80 + x];
        let world = camera.position() + dir * 7.3;

        let clip = camera.projection_matrix() * camera.view_matrix() * world.extend(1.0);
        let ndc = clip.xyz() / clip.w;
        let px = (ndc.x + 1.0) / 2.0 * 80.0;
        let py = (ndc.y + 1.0) / 2.0 * 60.0;

        assert_eq!(px as usize, x);
        assert_eq!(py as usize, y);
    }

    #[test]
    fn test_zero_area_resize() {
        let mut camera = RenderCamera::new(45.0, 0.1, 100.0);
        camera.resize(0, 10);

        assert!(camera.ray_directions().is_empty());
    }
}
