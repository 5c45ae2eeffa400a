//! Spot-light shadow maps.
//!
//! A shadow map is a depth-only render of the opaque scene from the
//! light's point of view, with a field of view covering the outer cone.
//! It stores inverse depth like the camera z-buffer.

use glam::{Affine3A, Mat4, UVec2, Vec2, Vec3};

use crate::errors::Result;
use crate::math::ndc_to_pixel;
use crate::renderer::geometry::{FrameView, build_triangles};
use crate::renderer::rasterizer::{RasterPass, Rasterizer};
use crate::renderer::target::{EMPTY_DEPTH, RenderTarget};
use crate::scene::Scene;
use crate::scene::light::{Light, LightKind};
use crate::scene::transform::Transform;

/// Widest cone a single perspective map can cover.
const MAX_SHADOW_FOV: f32 = std::f32::consts::PI * 0.95;

#[derive(Debug, Clone)]
pub struct ShadowMap {
    view_projection: Mat4,
    size: u32,
    depth: Vec<f32>,
    bias: f32,
}

impl ShadowMap {
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    /// Whether something in the map sits between the light and `point`.
    /// Points outside the map are lit.
    #[must_use]
    pub fn occludes(&self, point: Vec3) -> bool {
        let s = crate::math::project_point(&self.view_projection, point);
        if !(s.z > 0.0) || s.x.abs() > 1.0 || s.y.abs() > 1.0 {
            return false;
        }
        let size = self.size as f32;
        let pixel = ndc_to_pixel(Vec2::new(s.x, s.y), Vec2::splat(size));
        let x = (pixel.x as u32).min(self.size - 1);
        let y = (pixel.y as u32).min(self.size - 1);
        let stored = self.depth[y as usize * self.size as usize + x as usize];
        stored > EMPTY_DEPTH && 1.0 / stored < s.z - self.bias
    }
}

/// Renders the shadow map of a spot light, or `None` for other kinds.
pub fn render_shadow_map(scene: &Scene, light: &Light, transform: &Transform) -> Result<Option<ShadowMap>> {
    let LightKind::Spot { inner_cone, outer_cone } = light.kind else {
        return Ok(None);
    };
    let config = &light.shadow;
    let size = config.map_size.max(1);

    let fov = (2.0 * outer_cone.max(inner_cone)).clamp(1e-3, MAX_SHADOW_FOV);
    let eye = Affine3A::from_rotation_translation(transform.world_rotation(), transform.global_position());
    let view = FrameView::new(&eye, fov, config.near, config.far, UVec2::splat(size));

    let mut target = RenderTarget::new(UVec2::splat(size), false)?;
    let triangles = build_triangles(scene, &view, true);
    let rasterizer = Rasterizer::new(RasterPass::Shadow, &view, &scene.settings);
    let mut written = 0;
    for tri in &triangles.opaque {
        written += rasterizer.rasterize(tri, &mut target);
    }
    log::trace!("Shadow map {size}x{size}: {} triangles, {written} texels", triangles.opaque.len());

    Ok(Some(ShadowMap {
        view_projection: view.view_projection,
        size,
        depth: std::mem::take(&mut target.z_buffer),
        bias: config.bias,
    }))
}
