//! Renders a Cornell box with the path integrator, accumulates a few frames
//! through the temporal filter, and writes the result to cornell.png.

use anyhow::Result;
use orb_render::{
    Color, Material, RenderCamera, RenderSettings, Renderer, Scene, Surface, TriangleMesh, Vec3,
};
use std::sync::Arc;

const WIDTH: u32 = 400;
const HEIGHT: u32 = 400;
const FRAMES: u32 = 16;

fn quad(
    scene: &mut Scene,
    corners: [Vec3; 4],
    material: Arc<Material>,
) -> Result<()> {
    let mesh = TriangleMesh::from_buffers(scene.id_counter(), &corners, &[0, 1, 2, 0, 2, 3], material)?;
    scene.add(Surface::Mesh(mesh));
    Ok(())
}

fn build_scene() -> Result<Scene> {
    let mut scene = Scene::new();

    let white = Arc::new(Material::diffuse(Color::splat(0.73)));
    let red = Arc::new(Material::diffuse(Color::new(0.65, 0.05, 0.05)));
    let green = Arc::new(Material::diffuse(Color::new(0.12, 0.45, 0.15)));
    let lamp = Arc::new(Material::emissive(Color::splat(0.78), Color::splat(47.0)));
    let glass = Arc::new(Material::dielectric(1.5));

    let (l, r, b, t, back, front) = (-2.0, 2.0, 0.0, 4.0, -6.0, -2.0);

    // Floor, ceiling, back wall (wound to face the camera).
    quad(
        &mut scene,
        [
            Vec3::new(l, b, front),
            Vec3::new(r, b, front),
            Vec3::new(r, b, back),
            Vec3::new(l, b, back),
        ],
        white.clone(),
    )?;
    quad(
        &mut scene,
        [
            Vec3::new(l, t, back),
            Vec3::new(r, t, back),
            Vec3::new(r, t, front),
            Vec3::new(l, t, front),
        ],
        white.clone(),
    )?;
    quad(
        &mut scene,
        [
            Vec3::new(l, b, back),
            Vec3::new(r, b, back),
            Vec3::new(r, t, back),
            Vec3::new(l, t, back),
        ],
        white,
    )?;
    // Colored side walls.
    quad(
        &mut scene,
        [
            Vec3::new(l, b, front),
            Vec3::new(l, b, back),
            Vec3::new(l, t, back),
            Vec3::new(l, t, front),
        ],
        red,
    )?;
    quad(
        &mut scene,
        [
            Vec3::new(r, b, back),
            Vec3::new(r, b, front),
            Vec3::new(r, t, front),
            Vec3::new(r, t, back),
        ],
        green,
    )?;
    // Ceiling lamp, slightly below the ceiling, facing down.
    quad(
        &mut scene,
        [
            Vec3::new(-0.7, t - 0.01, -4.7),
            Vec3::new(0.7, t - 0.01, -4.7),
            Vec3::new(0.7, t - 0.01, -3.3),
            Vec3::new(-0.7, t - 0.01, -3.3),
        ],
        lamp,
    )?;

    let ball = orb_render::Sphere::new(scene.id_counter(), Vec3::new(0.7, 0.8, -4.2), 0.8, glass);
    scene.add(Surface::Sphere(ball));
    let matte = orb_render::Sphere::new(
        scene.id_counter(),
        Vec3::new(-0.9, 0.6, -4.8),
        0.6,
        Arc::new(Material::diffuse(Color::splat(0.73))),
    );
    scene.add(Surface::Sphere(matte));

    scene.build_bvh();
    Ok(scene)
}

fn main() -> Result<()> {
    env_logger::init();

    let scene = build_scene()?;
    let mut renderer = Renderer::new(scene, RenderSettings::default());

    let mut camera = RenderCamera::new(50.0, 0.1, 100.0);
    camera.look_at(Vec3::new(0.0, 2.0, 1.5), Vec3::new(0.0, 2.0, -4.0), Vec3::Y);
    camera.resize(WIDTH, HEIGHT);

    for frame in 0..FRAMES {
        renderer.render(&camera);
        log::info!("frame {}/{FRAMES} done", frame + 1);
    }
    renderer.write_png("cornell.png")?;
    println!("wrote cornell.png ({WIDTH}x{HEIGHT}, {FRAMES} accumulated frames)");
    Ok(())
}
