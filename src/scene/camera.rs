use glam::{Affine3A, Mat4, Vec3};
use uuid::Uuid;

use crate::color::Color;
use crate::math::perspective;
use crate::renderer::target::RenderTarget;

/// Perspective camera component.
///
/// Owns the render target it draws into and the tone-mapping state carried
/// from frame to frame. The view matrix is refreshed by the transform system
/// whenever the owning node moves; the projection is built per frame from
/// the target's aspect ratio.
#[derive(Debug, Clone)]
pub struct Camera {
    pub uuid: Uuid,
    pub name: String,

    // === Projection ===
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    pub target: RenderTarget,

    // === Exposure ===
    /// Luminance mapped to white. `0.0` means "use `maximum_color`".
    pub white_point: f32,
    /// Brightest luminance seen in the last rendered frame.
    pub maximum_color: f32,

    // Written by the transform system, read by the renderer.
    pub(crate) world_matrix: Affine3A,
    pub(crate) view_matrix: Mat4,
}

impl Camera {
    /// `fov` is the vertical field of view in degrees.
    #[must_use]
    pub fn new_perspective(fov: f32, near: f32, far: f32) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: "Camera".to_string(),
            fov: fov.to_radians(),
            near,
            far,
            target: RenderTarget::default(),
            white_point: 1.0,
            maximum_color: 1.0,
            world_matrix: Affine3A::IDENTITY,
            view_matrix: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: RenderTarget) -> Self {
        self.target = target;
        self
    }

    pub(crate) fn update_view(&mut self, world: &Affine3A) {
        self.world_matrix = *world;
        self.view_matrix = Mat4::from(*world).inverse();
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.world_matrix.translation)
    }

    #[must_use]
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        perspective(self.fov, aspect, self.near, self.far)
    }

    /// Luminance used as white by [`Camera::tone_map`].
    #[must_use]
    pub fn effective_white(&self) -> f32 {
        if self.white_point > 0.0 {
            self.white_point
        } else {
            self.maximum_color.max(1e-4)
        }
    }

    /// Extended Reinhard operator, applied per channel.
    #[must_use]
    pub fn tone_map(&self, color: Color) -> Color {
        let white = self.effective_white();
        let inv_white2 = 1.0 / (white * white);
        let map = |c: f32| {
            let c = c.max(0.0);
            c * (1.0 + c * inv_white2) / (1.0 + c)
        };
        Color::new(map(color.r), map(color.g), map(color.b), color.a)
    }

    /// Tone-mapped 8-bit RGBA bytes of the target's framebuffer.
    #[must_use]
    pub fn display_rgba8(&self) -> Vec<u8> {
        self.target.to_rgba8(|c| self.tone_map(c))
    }
}
