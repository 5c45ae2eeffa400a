//! Core resource definitions.
//!
//! Plain CPU data consumed by the renderer, shared between scene nodes:
//! - Mesh: vertices + faces with per-face materials
//! - Material: shading model + render-state flags
//! - Texture: polymorphic sampler (solid, image, procedural, blend, sliced)
//! - Image: decoded pixels with a mip chain
//! - Volume: homogeneous participating medium

pub mod image;
pub mod material;
pub mod mesh;
pub mod texture;
pub mod volume;

pub use image::{AddressMode, FilterMode, ImageTexture, TextureSampler};
pub use material::{
    EarthMaterial, Material, MaterialData, MaterialFlags, MaterialRef, PhongMaterial, PhysicalMaterial,
};
pub use mesh::{Face, Mesh, MeshRef, Vertex};
pub use texture::{
    BlendFactor, BlendTexture, ProceduralTexture, SlicedTexture, Texture, TextureRef, TexturedColor, UvSample,
};
pub use volume::Volume;
