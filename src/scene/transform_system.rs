//! Transform System
//!
//! Runs the per-frame hierarchy update. Kept apart from [`Scene`] so it only
//! borrows the node arena and the camera components it has to write, not
//! the whole scene.
//!
//! Every node is visited depth-first from the roots, in this order:
//!
//! 1. `pre_update` of each behavior
//! 2. local matrix rebuild (skipped when TRS is unchanged), then
//!    `world = parent_world * local` and the rotation-only world transform
//! 3. `update` of each behavior
//! 4. children, in insertion order
//!
//! [`Scene`]: crate::scene::Scene

use glam::{Affine3A, Quat};
use slotmap::{SlotMap, SparseSecondaryMap};

use crate::scene::behavior::UpdateContext;
use crate::scene::camera::Camera;
use crate::scene::node::Node;
use crate::scene::{CameraKey, NodeHandle};

/// Updates the whole hierarchy with an explicit stack (no recursion, so
/// deep chains cannot overflow the thread stack).
pub fn update_hierarchy(
    nodes: &mut SlotMap<NodeHandle, Node>,
    cameras: &mut SlotMap<CameraKey, Camera>,
    camera_components: &SparseSecondaryMap<NodeHandle, CameraKey>,
    roots: &[NodeHandle],
    ctx: &UpdateContext<'_>,
) {
    // (node, parent world, parent world rotation, parent changed)
    let mut stack: Vec<(NodeHandle, Affine3A, Quat, bool)> = Vec::with_capacity(64);

    for &root in roots.iter().rev() {
        stack.push((root, Affine3A::IDENTITY, Quat::IDENTITY, false));
    }

    while let Some((handle, parent_world, parent_rotation, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(handle) else {
            continue;
        };
        let Node { transform, behaviors, children, .. } = node;

        for behavior in behaviors.iter_mut() {
            behavior.pre_update(transform, ctx);
        }

        let local_changed = transform.update_local_matrix();
        let world_changed = local_changed || parent_changed;
        if world_changed {
            transform.update_world(&parent_world, parent_rotation);

            if let Some(camera) = camera_components.get(handle).and_then(|&key| cameras.get_mut(key)) {
                camera.update_view(transform.world_matrix());
            }
        }

        for behavior in behaviors.iter_mut() {
            behavior.update(transform, ctx);
        }

        let world = transform.world_matrix;
        let rotation = transform.world_rotation;
        for &child in children.iter().rev() {
            stack.push((child, world, rotation, world_changed));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use glam::Vec3;

    use super::*;
    use crate::scene::behavior::{Behavior, InputState};
    use crate::scene::transform::Transform;

    #[derive(Debug)]
    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Behavior for Recorder {
        fn pre_update(&mut self, _t: &mut Transform, _ctx: &UpdateContext<'_>) {
            self.log.lock().unwrap().push(format!("{}:pre", self.tag));
        }

        fn update(&mut self, t: &mut Transform, _ctx: &UpdateContext<'_>) {
            let x = t.global_position().x;
            self.log.lock().unwrap().push(format!("{}:update@{x}", self.tag));
        }
    }

    fn ctx(input: &InputState) -> UpdateContext<'_> {
        UpdateContext { dt: 0.016, input }
    }

    #[test]
    fn child_world_composes_parent() {
        let mut nodes: SlotMap<NodeHandle, Node> = SlotMap::with_key();
        let mut cameras: SlotMap<CameraKey, Camera> = SlotMap::with_key();
        let camera_components = SparseSecondaryMap::new();

        let mut parent = Node::new("parent");
        parent.transform.position = Vec3::new(1.0, 0.0, 0.0);
        let parent_handle = nodes.insert(parent);

        let mut child = Node::new("child");
        child.transform.position = Vec3::new(0.0, 1.0, 0.0);
        child.parent = Some(parent_handle);
        let child_handle = nodes.insert(child);
        nodes[parent_handle].children.push(child_handle);

        let input = InputState::default();
        update_hierarchy(&mut nodes, &mut cameras, &camera_components, &[parent_handle], &ctx(&input));

        let p = nodes[child_handle].transform.global_position();
        assert!((p - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn behaviors_run_around_transform_then_children() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut nodes: SlotMap<NodeHandle, Node> = SlotMap::with_key();
        let mut cameras: SlotMap<CameraKey, Camera> = SlotMap::with_key();
        let camera_components = SparseSecondaryMap::new();

        let mut root = Node::new("root").with_behavior(Recorder { tag: "root", log: log.clone() });
        root.transform.position.x = 2.0;
        let root_handle = nodes.insert(root);

        let mut child = Node::new("child").with_behavior(Recorder { tag: "child", log: log.clone() });
        child.parent = Some(root_handle);
        let child_handle = nodes.insert(child);
        nodes[root_handle].children.push(child_handle);

        let input = InputState::default();
        update_hierarchy(&mut nodes, &mut cameras, &camera_components, &[root_handle], &ctx(&input));

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec!["root:pre", "root:update@2", "child:pre", "child:update@2"]
        );
    }

    #[test]
    fn parent_rotation_reaches_world_rotation_without_scale() {
        let mut nodes: SlotMap<NodeHandle, Node> = SlotMap::with_key();
        let mut cameras: SlotMap<CameraKey, Camera> = SlotMap::with_key();
        let camera_components = SparseSecondaryMap::new();

        let mut parent = Node::new("parent");
        parent.transform.scale = Vec3::splat(3.0);
        parent.transform.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let parent_handle = nodes.insert(parent);

        let mut child = Node::new("child");
        child.parent = Some(parent_handle);
        let child_handle = nodes.insert(child);
        nodes[parent_handle].children.push(child_handle);

        let input = InputState::default();
        update_hierarchy(&mut nodes, &mut cameras, &camera_components, &[parent_handle], &ctx(&input));

        let forward = nodes[child_handle].transform.forward();
        assert!((forward - Vec3::NEG_X).length() < 1e-5);
        assert!((forward.length() - 1.0).abs() < 1e-5);
    }
}
