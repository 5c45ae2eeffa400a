use glam::Vec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, SparseSecondaryMap};

use crate::resources::material::MaterialRef;
use crate::resources::mesh::MeshRef;
use crate::scene::behavior::{Behavior, InputState, UpdateContext};
use crate::scene::camera::Camera;
use crate::scene::environment::Environment;
use crate::scene::light::Light;
use crate::scene::node::Node;
use crate::scene::transform::Transform;
use crate::scene::transform_system;
use crate::scene::{CameraKey, LightKey, NodeHandle};

/// Screen-space winding that counts as front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrontFace {
    #[default]
    CounterClockwise,
    Clockwise,
}

impl FrontFace {
    /// Whether a triangle with the given screen winding shows its back.
    #[inline]
    #[must_use]
    pub fn is_back(self, clockwise: bool) -> bool {
        match self {
            Self::CounterClockwise => clockwise,
            Self::Clockwise => !clockwise,
        }
    }
}

/// Per-scene render toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub back_face_culling: bool,
    pub front_face: FrontFace,
    /// Skip lighting and write base colors.
    pub full_bright: bool,
    /// Overlay triangle edges.
    pub wireframe: bool,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            back_face_culling: true,
            front_face: FrontFace::CounterClockwise,
            full_bright: false,
            wireframe: false,
        }
    }
}

/// The scene graph.
///
/// Nodes live in a slot-map arena; mesh, camera and light attachments are
/// component maps keyed by node handle. Meshes and materials are shared
/// `Arc`s and are never mutated while a frame renders.
#[derive(Debug, Default)]
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    // === Components ===
    pub meshes: SparseSecondaryMap<NodeHandle, MeshRef>,
    pub cameras: SlotMap<CameraKey, Camera>,
    pub camera_components: SparseSecondaryMap<NodeHandle, CameraKey>,
    pub lights: SlotMap<LightKey, Light>,
    pub light_components: SparseSecondaryMap<NodeHandle, LightKey>,

    /// Materials addressable by name.
    pub materials: FxHashMap<String, MaterialRef>,

    pub environment: Environment,
    pub settings: SceneSettings,
    pub input: InputState,

    pub active_camera: Option<NodeHandle>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Adds a root node.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Adds a node under `parent`. Falls back to a root node when the
    /// parent does not exist.
    pub fn add_to_parent(&mut self, node: Node, parent: NodeHandle) -> NodeHandle {
        if !self.nodes.contains_key(parent) {
            log::warn!("add_to_parent: parent {parent:?} not found, adding as root");
            return self.add_node(node);
        }
        let handle = self.nodes.insert(node);
        self.nodes[parent].children.push(handle);
        self.nodes[handle].parent = Some(parent);
        handle
    }

    /// Re-parents `child` under `parent`, keeping both sides in sync.
    ///
    /// Refuses (and returns `false`) when that would create a cycle.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) -> bool {
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            return false;
        }
        if self.is_ancestor_or_self(child, parent) {
            log::warn!("attach: {child:?} is an ancestor of {parent:?}");
            return false;
        }

        self.unlink(child);
        self.nodes[parent].children.push(child);
        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.transform.mark_dirty();
        true
    }

    /// Moves `node` to the root level.
    pub fn detach(&mut self, node: NodeHandle) {
        if !self.nodes.contains_key(node) || self.nodes[node].parent.is_none() {
            return;
        }
        self.unlink(node);
        self.nodes[node].parent = None;
        self.nodes[node].transform.mark_dirty();
        self.root_nodes.push(node);
    }

    /// Removes a node, its subtree and all their components.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        if !self.nodes.contains_key(handle) {
            return;
        }
        self.unlink(handle);

        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            let Some(node) = self.nodes.remove(h) else {
                continue;
            };
            stack.extend(node.children);

            self.meshes.remove(h);
            if let Some(key) = self.camera_components.remove(h) {
                self.cameras.remove(key);
            }
            if let Some(key) = self.light_components.remove(h) {
                self.lights.remove(key);
            }
            if self.active_camera == Some(h) {
                self.active_camera = None;
            }
        }
    }

    fn unlink(&mut self, handle: NodeHandle) {
        match self.nodes.get(handle).and_then(Node::parent) {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.children.retain(|&c| c != handle);
                }
            }
            None => self.root_nodes.retain(|&r| r != handle),
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeHandle, mut node: NodeHandle) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(node).and_then(Node::parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    // ========================================================================
    // Components
    // ========================================================================

    pub fn set_mesh(&mut self, node: NodeHandle, mesh: MeshRef) {
        if self.nodes.contains_key(node) {
            self.meshes.insert(node, mesh);
        }
    }

    /// Attaches a light, replacing any previous one on the node.
    pub fn set_light(&mut self, node: NodeHandle, light: Light) -> Option<LightKey> {
        if !self.nodes.contains_key(node) {
            return None;
        }
        let key = self.lights.insert(light);
        if let Some(old) = self.light_components.insert(node, key) {
            self.lights.remove(old);
        }
        Some(key)
    }

    /// Attaches a camera. The first camera in the scene becomes active.
    pub fn set_camera(&mut self, node: NodeHandle, camera: Camera) -> Option<CameraKey> {
        if !self.nodes.contains_key(node) {
            return None;
        }
        let key = self.cameras.insert(camera);
        if let Some(old) = self.camera_components.insert(node, key) {
            self.cameras.remove(old);
        }
        self.nodes[node].transform.mark_dirty();
        if self.active_camera.is_none() {
            self.active_camera = Some(node);
        }
        Some(key)
    }

    pub fn add_behavior(&mut self, node: NodeHandle, behavior: impl Behavior + 'static) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.behaviors.push(Box::new(behavior));
        }
    }

    #[must_use]
    pub fn camera(&self, node: NodeHandle) -> Option<&Camera> {
        let key = *self.camera_components.get(node)?;
        self.cameras.get(key)
    }

    pub fn camera_mut(&mut self, node: NodeHandle) -> Option<&mut Camera> {
        let key = *self.camera_components.get(node)?;
        self.cameras.get_mut(key)
    }

    #[must_use]
    pub fn light(&self, node: NodeHandle) -> Option<&Light> {
        let key = *self.light_components.get(node)?;
        self.lights.get(key)
    }

    /// Lights paired with the transform of the node carrying them.
    pub fn iter_lights(&self) -> impl Iterator<Item = (&Light, &Transform)> {
        self.light_components.iter().filter_map(|(node, &key)| {
            let light = self.lights.get(key)?;
            let node = self.nodes.get(node)?;
            Some((light, &node.transform))
        })
    }

    /// Visible mesh nodes, in arena order.
    pub fn iter_meshes(&self) -> impl Iterator<Item = (NodeHandle, &MeshRef, &Transform)> {
        self.meshes.iter().filter_map(|(handle, mesh)| {
            let node = self.nodes.get(handle)?;
            node.visible.then_some((handle, mesh, &node.transform))
        })
    }

    // ========================================================================
    // Materials
    // ========================================================================

    /// Registers a material under `name`, returning the one it replaces.
    pub fn register_material(&mut self, name: impl Into<String>, material: MaterialRef) -> Option<MaterialRef> {
        self.materials.insert(name.into(), material)
    }

    #[must_use]
    pub fn material(&self, name: &str) -> Option<&MaterialRef> {
        self.materials.get(name)
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Runs behaviors and propagates transforms for one frame.
    pub fn update(&mut self, dt: f32) {
        let input = self.input;
        let ctx = UpdateContext { dt, input: &input };
        transform_system::update_hierarchy(
            &mut self.nodes,
            &mut self.cameras,
            &self.camera_components,
            &self.root_nodes,
            &ctx,
        );
    }

    /// World position of a node after the last update.
    #[must_use]
    pub fn world_position(&self, node: NodeHandle) -> Option<Vec3> {
        self.nodes.get(node).map(|n| n.transform.global_position())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::light::Light;
    use crate::color::Color;

    #[test]
    fn attach_rejects_cycles() {
        let mut scene = Scene::new();
        let a = scene.add_node(Node::new("a"));
        let b = scene.add_to_parent(Node::new("b"), a);
        assert!(!scene.attach(a, b));
        assert!(!scene.attach(a, a));
        assert_eq!(scene.root_nodes, vec![a]);
    }

    #[test]
    fn remove_node_drops_subtree_and_components() {
        let mut scene = Scene::new();
        let a = scene.add_node(Node::new("a"));
        let b = scene.add_to_parent(Node::new("b"), a);
        scene.set_light(b, Light::new_point(Color::WHITE, 1.0));
        scene.set_camera(a, Camera::new_perspective(60.0, 0.1, 10.0));

        scene.remove_node(a);
        assert!(scene.nodes.is_empty());
        assert!(scene.lights.is_empty());
        assert!(scene.cameras.is_empty());
        assert!(scene.root_nodes.is_empty());
        assert_eq!(scene.active_camera, None);
    }

    #[test]
    fn attach_moves_world_position() {
        let mut scene = Scene::new();
        let mut parent = Node::new("parent");
        parent.transform.position = Vec3::new(0.0, 5.0, 0.0);
        let parent = scene.add_node(parent);
        let child = scene.add_node(Node::new("child"));

        scene.update(0.0);
        assert_eq!(scene.world_position(child), Some(Vec3::ZERO));

        assert!(scene.attach(child, parent));
        scene.update(0.0);
        assert_eq!(scene.world_position(child), Some(Vec3::new(0.0, 5.0, 0.0)));
        assert_eq!(scene.root_nodes, vec![parent]);
    }
}
