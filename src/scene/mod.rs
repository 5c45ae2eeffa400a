//! Scene graph
//!
//! Manages the node hierarchy and its components:
//! - Node: hierarchy + transform + behaviors
//! - Transform: position / rotation / scale with cached matrices
//! - Scene: node arena and component maps (mesh, camera, light)
//! - Camera / Light / Environment: component data read by the renderer
//! - TransformSystem: per-frame hierarchy update, decoupled from `Scene`

pub mod behavior;
pub mod camera;
pub mod environment;
pub mod light;
pub mod node;
pub mod scene;
pub mod transform;
pub mod transform_system;

pub use behavior::{Behavior, InputState, KeyboardControl, Keys, Rotator, UpdateContext};
pub use camera::Camera;
pub use environment::{Background, Environment};
pub use light::{Light, LightKind, ShadowConfig};
pub use node::Node;
pub use scene::{FrontFace, Scene, SceneSettings};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct CameraKey;
    pub struct LightKey;
}
