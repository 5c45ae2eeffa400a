use glam::Affine3A;
use smallvec::SmallVec;

use crate::scene::NodeHandle;
use crate::scene::behavior::Behavior;
use crate::scene::transform::Transform;

/// Behavior list stored inline for the common case of one or two entries.
pub type Behaviors = SmallVec<[Box<dyn Behavior>; 2]>;

/// A scene node.
///
/// Only hot per-frame data lives here: hierarchy, transform and behaviors.
/// Mesh, camera and light attachments are stored in the [`Scene`]'s
/// component maps, keyed by the node handle.
///
/// The parent link is a plain handle and does not own the parent; removing
/// a node through [`Scene::remove_node`] keeps both sides consistent.
///
/// [`Scene`]: crate::scene::Scene
/// [`Scene::remove_node`]: crate::scene::Scene::remove_node
#[derive(Debug)]
pub struct Node {
    pub name: String,

    // === Core Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    // === Core Spatial Data ===
    pub transform: Transform,

    /// Hidden nodes keep updating but their mesh is not drawn.
    pub visible: bool,

    pub(crate) behaviors: Behaviors,
}

impl Node {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            visible: true,
            behaviors: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behaviors.push(Box::new(behavior));
        self
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn behaviors(&self) -> &[Box<dyn Behavior>] {
        &self.behaviors
    }

    /// World transform as of the last scene update.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.transform.world_matrix
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("Node")
    }
}
