//! Transform and scene update tests
//!
//! Tests for:
//! - Transform TRS operations and dirty checking
//! - Euler angle round-trip conversions
//! - look_at orientation
//! - Hierarchical matrix propagation through `Scene::update`
//! - Behavior ordering and the built-in behaviors
//! - Camera view matrices following their node

use std::f32::consts::FRAC_PI_2;
use std::sync::{Arc, Mutex};

use glam::{Mat4, Quat, Vec3};
use prism::scene::behavior::{Behavior, InputState, KeyboardControl, Keys, Rotator, UpdateContext};
use prism::scene::transform::Transform;
use prism::scene::{Camera, Node, Scene};

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

// ============================================================================
// Transform Unit Tests
// ============================================================================

#[test]
fn transform_default_is_identity() {
    let t = Transform::new();
    assert_eq!(t.position, Vec3::ZERO);
    assert_eq!(t.rotation, Quat::IDENTITY);
    assert_eq!(t.scale, Vec3::ONE);
}

#[test]
fn transform_update_local_matrix_dirty_check() {
    let mut t = Transform::new();

    // First call always rebuilds
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.position = Vec3::new(1.0, 2.0, 3.0);
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.rotation = Quat::from_rotation_y(FRAC_PI_2);
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.scale = Vec3::splat(2.0);
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());
}

#[test]
fn transform_local_matrix_is_scale_rotate_translate() {
    let mut t = Transform::new();
    t.position = Vec3::new(10.0, 20.0, 30.0);
    t.rotation = Quat::from_rotation_z(FRAC_PI_2);
    t.scale = Vec3::splat(2.0);
    t.update_local_matrix();

    let mat = Mat4::from(*t.local_matrix());
    // X axis: scaled by 2, rotated onto +Y, then translated
    let p = mat.transform_point3(Vec3::X);
    assert!(vec3_approx(p, Vec3::new(10.0, 22.0, 30.0)));
}

#[test]
fn transform_euler_roundtrip() {
    let mut t = Transform::new();
    let (x, y, z) = (0.3, 0.7, 1.2);
    t.set_rotation_euler(x, y, z);

    let euler = t.rotation_euler();
    assert!(approx_eq(euler.x, x));
    assert!(approx_eq(euler.y, y));
    assert!(approx_eq(euler.z, z));
}

#[test]
fn transform_look_at_basic() {
    let mut t = Transform::new();
    t.position = Vec3::new(0.0, 0.0, 5.0);
    t.look_at(Vec3::new(5.0, 0.0, 5.0), Vec3::Y);

    let forward = t.rotation * Vec3::NEG_Z;
    assert!(vec3_approx(forward, Vec3::X));
}

#[test]
fn transform_look_at_collinear_up_noop() {
    let mut t = Transform::new();
    let original_rotation = t.rotation;
    t.look_at(Vec3::new(0.0, 10.0, 0.0), Vec3::Y);
    assert_eq!(t.rotation, original_rotation);
}

#[test]
fn transform_mark_dirty_forces_update() {
    let mut t = Transform::new();
    t.update_local_matrix();
    assert!(!t.update_local_matrix());

    t.mark_dirty();
    assert!(t.update_local_matrix());
}

// ============================================================================
// Hierarchy Propagation
// ============================================================================

fn chain(scene: &mut Scene, length: usize) -> Vec<prism::NodeHandle> {
    let mut handles = Vec::new();
    for i in 0..length {
        let mut node = Node::new(format!("n{i}"));
        node.transform.position = Vec3::new(1.0, 0.0, 0.0);
        let handle = match handles.last() {
            Some(&parent) => scene.add_to_parent(node, parent),
            None => scene.add_node(node),
        };
        handles.push(handle);
    }
    handles
}

#[test]
fn chain_accumulates_translation() {
    let mut scene = Scene::new();
    let handles = chain(&mut scene, 5);
    scene.update(0.0);

    for (i, &h) in handles.iter().enumerate() {
        let p = scene.world_position(h).unwrap();
        assert!(approx_eq(p.x, (i + 1) as f32), "node {i} at {p}");
    }
}

#[test]
fn deep_chain_does_not_overflow() {
    let mut scene = Scene::new();
    let handles = chain(&mut scene, 20_000);
    scene.update(0.0);
    let last = scene.world_position(*handles.last().unwrap()).unwrap();
    assert!((last.x - 20_000.0).abs() < 1.0);
}

#[test]
fn parent_change_propagates_next_update() {
    let mut scene = Scene::new();
    let handles = chain(&mut scene, 3);
    scene.update(0.0);

    scene.get_node_mut(handles[0]).unwrap().transform.position.y = 4.0;
    scene.update(0.0);

    let p = scene.world_position(handles[2]).unwrap();
    assert!(vec3_approx(p, Vec3::new(3.0, 4.0, 0.0)));
}

#[test]
fn world_rotation_excludes_scale() {
    let mut scene = Scene::new();
    let mut parent = Node::new("parent");
    parent.transform.scale = Vec3::new(2.0, 5.0, 0.5);
    parent.transform.rotation = Quat::from_rotation_x(FRAC_PI_2);
    let parent = scene.add_node(parent);
    let child = scene.add_to_parent(Node::new("child"), parent);
    scene.update(0.0);

    let rotation = scene.get_node(child).unwrap().transform.world_rotation();
    assert!((rotation.length() - 1.0).abs() < EPSILON);
    assert!(vec3_approx(rotation * Vec3::Y, Vec3::Z));
}

#[test]
fn camera_view_follows_node() {
    let mut scene = Scene::new();
    let mut eye = Node::new("eye");
    eye.transform.position = Vec3::new(0.0, 0.0, 5.0);
    let eye = scene.add_node(eye);
    scene.set_camera(eye, Camera::new_perspective(60.0, 0.1, 100.0));
    scene.update(0.0);

    let camera = scene.camera(eye).unwrap();
    assert!(vec3_approx(camera.position(), Vec3::new(0.0, 0.0, 5.0)));
    let origin_in_view = camera.view_matrix().transform_point3(Vec3::ZERO);
    assert!(vec3_approx(origin_in_view, Vec3::new(0.0, 0.0, -5.0)));
}

// ============================================================================
// Behaviors
// ============================================================================

#[derive(Debug)]
struct Tracer {
    tag: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Behavior for Tracer {
    fn pre_update(&mut self, _t: &mut Transform, _ctx: &UpdateContext<'_>) {
        self.log.lock().unwrap().push(format!("{}.pre", self.tag));
    }

    fn update(&mut self, _t: &mut Transform, _ctx: &UpdateContext<'_>) {
        self.log.lock().unwrap().push(format!("{}.update", self.tag));
    }
}

#[test]
fn update_order_is_depth_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let tracer = |tag| Tracer { tag, log: log.clone() };

    let mut scene = Scene::new();
    let a = scene.add_node(Node::new("a").with_behavior(tracer("a")));
    let b = scene.add_to_parent(Node::new("b").with_behavior(tracer("b")), a);
    scene.add_to_parent(Node::new("c").with_behavior(tracer("c")), b);
    scene.add_to_parent(Node::new("d").with_behavior(tracer("d")), a);
    scene.add_node(Node::new("e").with_behavior(tracer("e")));

    scene.update(0.1);

    let expected = [
        "a.pre", "a.update", "b.pre", "b.update", "c.pre", "c.update", "d.pre", "d.update", "e.pre", "e.update",
    ];
    assert_eq!(*log.lock().unwrap(), expected);
}

#[test]
fn pre_update_moves_are_visible_the_same_frame() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new("spinner").with_behavior(Rotator::new(Vec3::new(0.0, FRAC_PI_2, 0.0))));
    let mut child = Node::new("arm");
    child.transform.position = Vec3::new(0.0, 0.0, -1.0);
    let child = scene.add_to_parent(child, parent);

    scene.update(1.0);

    // A quarter turn about +Y carries -Z onto -X.
    let p = scene.world_position(child).unwrap();
    assert!(vec3_approx(p, Vec3::new(-1.0, 0.0, 0.0)), "{p}");
}

#[test]
fn keyboard_control_reads_scene_input() {
    let mut scene = Scene::new();
    let node = scene.add_node(Node::new("player"));
    scene.add_behavior(node, KeyboardControl { speed: 4.0, turn_speed: 0.0 });

    scene.input = InputState { pressed: Keys::RIGHT };
    scene.update(0.5);
    assert!(vec3_approx(scene.world_position(node).unwrap(), Vec3::new(2.0, 0.0, 0.0)));

    scene.input = InputState::default();
    scene.update(0.5);
    assert!(vec3_approx(scene.world_position(node).unwrap(), Vec3::new(2.0, 0.0, 0.0)));
}
