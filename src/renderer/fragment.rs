use glam::{UVec2, Vec3};

use crate::color::Color;
use crate::resources::material::MaterialRef;
use crate::resources::texture::UvSample;

/// A rasterized sample of one triangle at one pixel.
///
/// Produced by the rasterizer and either shaded on the spot or parked in
/// the geometry buffer for the deferred pass. `valid` is false for gBuffer
/// slots no opaque triangle covered this frame.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub pixel: UVec2,
    /// `1 / w`, larger is nearer.
    pub inv_depth: f32,

    pub world_position: Vec3,
    /// Interpolated vertex normal (or face normal for flat meshes), not
    /// yet flipped for back faces.
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub uv: UvSample,

    /// Base color at `uv`. Resolved at raster time for alpha-cutout
    /// materials and for immediate shading, otherwise by the deferred pass.
    pub base_color: Color,

    pub face: usize,
    pub material: Option<MaterialRef>,
    /// The triangle shows its back side to the camera.
    pub back_face: bool,
    pub valid: bool,
}

impl Fragment {
    /// Unit normal facing the viewer's side of the surface.
    #[inline]
    #[must_use]
    pub fn shading_normal(&self) -> Vec3 {
        let n = self.normal.normalize_or_zero();
        if self.back_face { -n } else { n }
    }

    /// Linear camera-space depth.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> f32 {
        1.0 / self.inv_depth
    }
}
