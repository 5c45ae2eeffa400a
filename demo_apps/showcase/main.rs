//! Showcase
//!
//! Builds a small scene (a spinning box on a checkered floor behind a glass
//! pane, lit by a shadowed spot light through god-ray fog), renders a few
//! deferred frames and writes the last one to a PNG.
//!
//! Usage: `showcase [output.png] [settings.json]`

use std::f32::consts::FRAC_PI_2;
use std::time::Instant;

use anyhow::{Context, Result};
use glam::{Quat, UVec2, Vec2, Vec3};
use prism::resources::material::MaterialRef;
use prism::resources::mesh::{Face, Vertex};
use prism::resources::texture::{ProceduralTexture, TexturedColor};
use prism::scene::light::ShadowConfig;
use prism::scene::{Background, Rotator};
use prism::{
    Camera, Color, Light, Material, MaterialFlags, Mesh, Node, PhongMaterial, PhysicalMaterial, RenderTarget,
    Renderer, RendererSettings, Scene, Texture, Volume,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 400;
const FRAMES: usize = 8;

fn quad(half: Vec2, material: &MaterialRef) -> Result<Mesh> {
    let n = Vec3::Z;
    let vertices = vec![
        Vertex::new(Vec3::new(-half.x, -half.y, 0.0), n, Vec2::new(0.0, 0.0)),
        Vertex::new(Vec3::new(half.x, -half.y, 0.0), n, Vec2::new(1.0, 0.0)),
        Vertex::new(Vec3::new(half.x, half.y, 0.0), n, Vec2::new(1.0, 1.0)),
        Vertex::new(Vec3::new(-half.x, half.y, 0.0), n, Vec2::new(0.0, 1.0)),
    ];
    let faces = vec![Face::new([0, 1, 2], material.clone()), Face::new([0, 2, 3], material.clone())];
    Ok(Mesh::new("quad", vertices, faces)?)
}

fn cube(half: f32, material: &MaterialRef) -> Result<Mesh> {
    let vertices = (0..8u32)
        .map(|i| {
            let sign = |bit: u32| if i & bit == 0 { -half } else { half };
            let p = Vec3::new(sign(1), sign(2), sign(4));
            Vertex::new(p, p.normalize(), Vec2::new(sign(1), sign(2)))
        })
        .collect();
    let faces = [
        [4, 5, 7], [4, 7, 6], [0, 2, 3], [0, 3, 1], [1, 3, 7], [1, 7, 5],
        [0, 4, 6], [0, 6, 2], [2, 6, 7], [2, 7, 3], [0, 1, 5], [0, 5, 4],
    ]
    .iter()
    .map(|&f| Face::new(f, material.clone()))
    .collect();
    Ok(Mesh::new("cube", vertices, faces)?.with_flat_shading(true))
}

fn build_scene() -> Result<(Scene, prism::NodeHandle)> {
    let mut scene = Scene::new();
    scene.environment.background = Background::Color(Color::rgb(0.02, 0.03, 0.05));
    scene.environment.fog = Some(
        Volume::new(Color::splat(0.6), Color::TRANSPARENT, Color::rgb(0.93, 0.94, 0.96), 0.3).with_god_rays(0.2),
    );

    // Floor
    let checker = Texture::Procedural(ProceduralTexture::checker(
        Color::rgb(0.8, 0.8, 0.8),
        Color::rgb(0.2, 0.2, 0.25),
        8.0,
    ))
    .shared();
    let mut floor_material = PhysicalMaterial::new(Color::WHITE, 0.0, 0.6);
    floor_material.albedo = TexturedColor::textured(Color::WHITE, checker);
    let floor_material = Material::from(floor_material).with_name("floor").shared();
    let mut floor = Node::new("floor");
    floor.transform.position = Vec3::new(0.0, -1.0, 0.0);
    floor.transform.rotation = Quat::from_rotation_x(-FRAC_PI_2);
    let floor = scene.add_node(floor);
    scene.set_mesh(floor, quad(Vec2::splat(6.0), &floor_material)?.shared());

    // Spinning box
    let box_material = Material::from(
        PhongMaterial::new(Color::rgb(0.9, 0.35, 0.2)).with_specular(Color::new(1.0, 1.0, 1.0, 0.35)),
    )
    .with_name("box")
    .shared();
    let spinner = scene.add_node(Node::new("box").with_behavior(Rotator::new(Vec3::new(0.3, 0.8, 0.0))));
    scene.set_mesh(spinner, cube(0.6, &box_material)?.shared());

    // Glass pane in front
    let glass = Material::from(PhongMaterial::new(Color::new(0.05, 0.08, 0.1, 0.5)).with_tint(Color::new(0.6, 0.8, 1.0, 0.9)))
        .with_name("glass")
        .with_flags(MaterialFlags::TRANSPARENT | MaterialFlags::DOUBLE_SIDED)
        .shared();
    let mut pane = Node::new("pane");
    pane.transform.position = Vec3::new(1.2, -0.2, 1.5);
    pane.transform.rotation = Quat::from_rotation_y(-0.5);
    let pane = scene.add_node(pane);
    scene.set_mesh(pane, quad(Vec2::new(0.6, 0.8), &glass)?.shared());

    // Lights
    let mut lamp = Node::new("spot");
    lamp.transform.position = Vec3::new(-2.0, 4.0, 2.0);
    lamp.transform.look_at(Vec3::ZERO, Vec3::Y);
    let lamp = scene.add_node(lamp);
    scene.set_light(
        lamp,
        Light::new_spot(Color::rgb(1.0, 0.95, 0.85), 40.0, 0.25, 0.4).with_shadows(ShadowConfig::default()),
    );

    let mut fill = Node::new("fill");
    fill.transform.position = Vec3::new(3.0, 1.0, 3.0);
    let fill = scene.add_node(fill);
    scene.set_light(fill, Light::new_point(Color::rgb(0.3, 0.4, 0.6), 4.0));

    // Camera
    let mut eye = Node::new("camera");
    eye.transform.position = Vec3::new(0.0, 1.2, 5.5);
    eye.transform.look_at(Vec3::new(0.0, -0.2, 0.0), Vec3::Y);
    let eye = scene.add_node(eye);
    let target = RenderTarget::new(UVec2::new(WIDTH, HEIGHT), true)?;
    let mut camera = Camera::new_perspective(55.0, 0.1, 50.0).with_target(target);
    camera.white_point = 0.0;
    scene.set_camera(eye, camera);

    Ok((scene, eye))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "showcase.png".to_string());
    let settings = match args.next() {
        Some(path) => RendererSettings::load(&path).with_context(|| format!("loading settings from {path}"))?,
        None => RendererSettings::default(),
    };

    let (mut scene, eye) = build_scene()?;
    let mut renderer = Renderer::new(settings);
    log::info!("Rendering {FRAMES} frames at {WIDTH}x{HEIGHT}");

    for frame in 0..FRAMES {
        let started = Instant::now();
        scene.update(1.0 / 30.0);
        let stats = renderer.render(&mut scene, eye)?;
        log::info!(
            "Frame {frame}: {} fragments, {} shadow maps, peak {:.2} in {:?}",
            stats.fragments,
            stats.shadow_maps,
            stats.max_luminance,
            started.elapsed()
        );
    }

    let camera = scene.camera(eye).context("camera disappeared")?;
    let pixels = camera.display_rgba8();
    image::save_buffer(&output, &pixels, WIDTH, HEIGHT, image::ExtendedColorType::Rgba8)
        .with_context(|| format!("writing {output}"))?;
    log::info!("Wrote {output}");

    renderer.shutdown();
    Ok(())
}
