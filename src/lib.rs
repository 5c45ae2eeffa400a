//! Prism: a software rasterizer.
//!
//! Scene graph in, pixels out. Meshes are projected and scan-converted on
//! the CPU and shaded with Phong, Cook-Torrance or composite materials,
//! either immediately or deferred across a worker pool, with spot-light
//! shadow maps, sorted transparency and volumetric fog.
//!
//! ```no_run
//! use glam::{UVec2, Vec3};
//! use prism::{Camera, Node, RenderTarget, Renderer, Scene};
//!
//! # fn main() -> prism::Result<()> {
//! let mut scene = Scene::new();
//! let mut eye = Node::new("eye");
//! eye.transform.position = Vec3::new(0.0, 0.0, 5.0);
//! let eye = scene.add_node(eye);
//! let target = RenderTarget::new(UVec2::new(320, 240), true)?;
//! scene.set_camera(eye, Camera::new_perspective(60.0, 0.1, 100.0).with_target(target));
//!
//! let mut renderer = Renderer::default();
//! scene.update(1.0 / 60.0);
//! renderer.render(&mut scene, eye)?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod color;
pub mod errors;
pub mod math;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use color::Color;
pub use errors::{RasterError, Result};
pub use renderer::{FrameStats, RenderTarget, Renderer, RendererSettings};
pub use resources::{
    EarthMaterial, ImageTexture, Material, MaterialFlags, Mesh, PhongMaterial, PhysicalMaterial, Texture, Volume,
};
pub use scene::{Camera, Light, Node, NodeHandle, Scene};
