//! Lighting tests
//!
//! Tests for:
//! - Resolving scene lights into world space
//! - Spot cone falloff, including the exact outer boundary
//! - Spot shadow maps and occlusion queries
//! - Fog extinction and god-ray shafts

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, UVec2, Vec2, Vec3};
use prism::renderer::fog::sample_fog;
use prism::renderer::shadow::render_shadow_map;
use prism::renderer::{ResolvedKind, ResolvedLight};
use prism::resources::material::MaterialRef;
use prism::resources::mesh::{Face, Vertex};
use prism::scene::light::ShadowConfig;
use prism::scene::transform::Transform;
use prism::{
    Camera, Color, Light, Material, Mesh, Node, NodeHandle, PhongMaterial, RenderTarget, Renderer, RendererSettings,
    Scene, Volume,
};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

fn spot(cos_inner: f32, cos_outer: f32) -> ResolvedLight {
    ResolvedLight {
        radiance: Color::WHITE,
        kind: ResolvedKind::Spot {
            position: Vec3::ZERO,
            facing: Vec3::NEG_Z,
            cos_inner,
            cos_outer,
        },
        shadow: None,
    }
}

fn cube(half: f32, material: &MaterialRef) -> Mesh {
    let vertices = (0..8u32)
        .map(|i| {
            let sign = |bit: u32| if i & bit == 0 { -half } else { half };
            let p = Vec3::new(sign(1), sign(2), sign(4));
            Vertex::new(p, p.normalize(), Vec2::ZERO)
        })
        .collect();
    let indices: [[u32; 3]; 12] = [
        [4, 5, 7], [4, 7, 6],
        [0, 2, 3], [0, 3, 1],
        [1, 3, 7], [1, 7, 5],
        [0, 4, 6], [0, 6, 2],
        [2, 6, 7], [2, 7, 3],
        [0, 1, 5], [0, 5, 4],
    ];
    let faces = indices.iter().map(|&f| Face::new(f, material.clone())).collect();
    Mesh::new("cube", vertices, faces).unwrap()
}

/// Unit cube at the origin under a spot light at `(0, 0, 5)` facing `-Z`.
fn shadowed_scene() -> (Scene, NodeHandle) {
    let mut scene = Scene::new();
    let blocker = scene.add_node(Node::new("blocker"));
    let material = Material::from(PhongMaterial::default()).shared();
    scene.set_mesh(blocker, cube(0.5, &material).shared());

    let mut lamp = Node::new("lamp");
    lamp.transform.position = Vec3::new(0.0, 0.0, 5.0);
    let lamp = scene.add_node(lamp);
    let light = Light::new_spot(Color::WHITE, 10.0, 0.3, 0.5).with_shadows(ShadowConfig {
        map_size: 128,
        ..ShadowConfig::default()
    });
    scene.set_light(lamp, light);
    scene.update(0.0);
    (scene, lamp)
}

fn shadowed_light(scene: &Scene, lamp: NodeHandle) -> ResolvedLight {
    let light = scene.light(lamp).unwrap();
    let transform = &scene.get_node(lamp).unwrap().transform;
    let map = render_shadow_map(scene, light, transform).unwrap().unwrap();
    ResolvedLight::resolve(light, transform).with_shadow(map)
}

// ============================================================================
// Light Resolution
// ============================================================================

#[test]
fn directional_light_points_back_along_node_forward() {
    let mut transform = Transform::new();
    let light = Light::new_directional(Color::WHITE, 2.0);
    let resolved = ResolvedLight::resolve(&light, &transform);
    match resolved.kind {
        ResolvedKind::Directional { direction } => assert!(vec3_approx(direction, Vec3::Z)),
        other => panic!("unexpected {other:?}"),
    }
    assert!(approx_eq(resolved.radiance.r, 2.0));

    // Rotated through the scene so the world rotation is set.
    let mut scene = Scene::new();
    transform.rotation = Quat::from_rotation_x(-FRAC_PI_2);
    let node = scene.add_node(Node::new("sun").with_transform(transform));
    scene.set_light(node, light);
    scene.update(0.0);

    let (light, transform) = scene.iter_lights().next().unwrap();
    let resolved = ResolvedLight::resolve(light, transform);
    // Shining straight down: the light is above.
    match resolved.kind {
        ResolvedKind::Directional { direction } => assert!(vec3_approx(direction, Vec3::Y)),
        other => panic!("unexpected {other:?}"),
    }
    let sample = resolved.sample(Vec3::new(3.0, -2.0, 1.0)).unwrap();
    assert!(approx_eq(sample.radiance.g, 2.0));
}

#[test]
fn misordered_spot_cones_are_swapped() {
    let light = Light::new_spot(Color::WHITE, 1.0, 0.4, 0.2);
    let resolved = ResolvedLight::resolve(&light, &Transform::new());
    match resolved.kind {
        ResolvedKind::Spot { cos_inner, cos_outer, facing, .. } => {
            assert!(cos_inner > cos_outer);
            assert!(approx_eq(cos_inner, 0.2f32.cos()));
            assert!(approx_eq(cos_outer, 0.4f32.cos()));
            assert!(vec3_approx(facing, Vec3::NEG_Z));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn black_lights_contribute_nothing() {
    let light = Light::new_point(Color::BLACK, 5.0);
    let resolved = ResolvedLight::resolve(&light, &Transform::new());
    assert!(resolved.sample(Vec3::new(0.0, 0.0, -1.0)).is_none());
}

// ============================================================================
// Spot Falloff
// ============================================================================

#[test]
fn spot_full_inside_inner_cone() {
    let light = spot(0.2f32.cos(), 0.4f32.cos());
    let sample = light.sample(Vec3::new(0.0, 0.0, -2.0)).unwrap();
    assert!(approx_eq(sample.radiance.r, 0.25));
    assert!(vec3_approx(sample.direction, Vec3::Z));
}

#[test]
fn spot_is_dark_exactly_on_outer_boundary() {
    let point = Vec3::new(2.0 * 0.4f32.sin(), 0.0, -2.0 * 0.4f32.cos());
    // Same arithmetic the light uses, so the boundary is hit exactly.
    let to_light = Vec3::ZERO - point;
    let direction = to_light / to_light.length_squared().sqrt();
    let cos_at_point = (-direction).dot(Vec3::NEG_Z);

    let light = spot(1.0, cos_at_point);
    assert!(light.sample(point).is_none());
}

#[test]
fn spot_is_dark_outside_outer_cone() {
    let light = spot(0.2f32.cos(), 0.4f32.cos());
    assert!(light.sample(Vec3::new(2.0, 0.0, -1.0)).is_none());
    assert!(light.sample(Vec3::new(0.0, 0.0, 2.0)).is_none());
}

#[test]
fn spot_falls_off_smoothly_between_cones() {
    let light = spot(0.2f32.cos(), 0.4f32.cos());
    let at = |angle: f32| {
        let p = Vec3::new(angle.sin(), 0.0, -angle.cos());
        light.sample(p).map_or(0.0, |s| s.radiance.r)
    };

    let samples: Vec<f32> = [0.19, 0.25, 0.3, 0.35, 0.39].iter().map(|&a| at(a)).collect();
    assert!(approx_eq(samples[0], 1.0));
    assert!(samples.windows(2).all(|w| w[1] < w[0]), "{samples:?}");
    assert!(samples[4] > 0.0);
}

// ============================================================================
// Shadow Maps
// ============================================================================

#[test]
fn only_spot_lights_render_shadow_maps() {
    let scene = Scene::new();
    let light = Light::new_point(Color::WHITE, 1.0).with_shadows(ShadowConfig::default());
    assert!(render_shadow_map(&scene, &light, &Transform::new()).unwrap().is_none());
}

#[test]
fn shadow_map_occludes_points_behind_the_blocker() {
    let (scene, lamp) = shadowed_scene();
    let light = shadowed_light(&scene, lamp);
    let map = light.shadow.as_ref().unwrap();
    assert_eq!(map.size(), 128);
    assert!(map.depth().iter().any(|&z| z > 0.0));

    assert!(map.occludes(Vec3::new(0.0, 0.0, -2.0)));
    assert!(map.occludes(Vec3::new(0.1, -0.1, -0.6)));
    assert!(!map.occludes(Vec3::new(0.0, 0.0, 1.0)));
    // Inside the map but beside the blocker.
    assert!(!map.occludes(Vec3::new(2.0, 0.0, -2.0)));
    // Outside the map entirely.
    assert!(!map.occludes(Vec3::new(0.0, 0.0, 10.0)));
}

#[test]
fn shadowed_spot_delivers_no_light() {
    let (scene, lamp) = shadowed_scene();
    let light = shadowed_light(&scene, lamp);
    assert!(light.sample(Vec3::new(0.0, 0.0, -2.0)).is_none());
    assert!(light.sample(Vec3::new(0.0, 0.0, 1.0)).is_some());
}

#[test]
fn renderer_counts_shadow_maps() {
    for shadows in [true, false] {
        let (mut scene, _) = shadowed_scene();
        let mut eye = Node::new("camera");
        eye.transform.position = Vec3::new(4.0, 0.0, 4.0);
        eye.transform.look_at(Vec3::ZERO, Vec3::Y);
        let eye = scene.add_node(eye);
        let target = RenderTarget::new(UVec2::splat(16), false).unwrap();
        scene.set_camera(eye, Camera::new_perspective(60.0, 0.1, 100.0).with_target(target));
        scene.update(0.0);

        let mut renderer = Renderer::new(RendererSettings { shadows, ..RendererSettings::default() });
        let stats = renderer.render(&mut scene, eye).unwrap();
        assert_eq!(stats.lights, 1);
        assert_eq!(stats.shadow_maps, usize::from(shadows));
    }
}

// ============================================================================
// Fog
// ============================================================================

#[test]
fn zero_absorption_fog_returns_background() {
    let volume = Volume::new(Color::WHITE, Color::WHITE, Color::WHITE, 3.0);
    assert!(volume.is_clear());
    let bg = Color::rgb(0.1, 0.2, 0.3);
    let c = sample_fog(Vec3::ZERO, Vec3::new(0.0, 0.0, 50.0), bg, &[], &volume);
    assert!(c.max_difference(bg) < EPSILON);
}

#[test]
fn thick_fog_converges_to_medium_color() {
    let volume = Volume::new(Color::splat(0.4), Color::TRANSPARENT, Color::splat(0.1), 2.0);
    let bg = Color::rgb(1.0, 0.0, 0.0);

    let near = sample_fog(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.1), bg, &[], &volume);
    let far = sample_fog(Vec3::ZERO, Vec3::new(0.0, 0.0, 100.0), bg, &[], &volume);
    assert!(near.max_difference(bg) < far.max_difference(bg));
    assert!(far.max_difference(Color::rgb(0.4, 0.4, 0.4)) < 1e-3, "{far:?}");
    assert!(approx_eq(far.a, bg.a));
}

#[test]
fn god_rays_are_blocked_by_shadows() {
    let (scene, lamp) = shadowed_scene();
    let shadowed = shadowed_light(&scene, lamp);
    let mut open = shadowed.clone();
    open.shadow = None;

    let volume = Volume::new(Color::WHITE, Color::TRANSPARENT, Color::splat(0.8), 0.5).with_god_rays(0.1);
    let (start, end) = (Vec3::new(0.0, 0.0, -3.0), Vec3::new(0.0, 0.0, -1.0));
    let bg = Color::BLACK;

    let lit = sample_fog(start, end, bg, &[open], &volume);
    let dark = sample_fog(start, end, bg, &[shadowed], &volume);
    assert!(lit.r > 0.0);
    assert!(dark.r < lit.r * 0.01, "{dark:?} vs {lit:?}");
}
