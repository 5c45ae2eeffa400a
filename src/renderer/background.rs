use glam::Vec2;

use crate::math::direction_to_equirect;
use crate::renderer::geometry::FrameView;
use crate::renderer::target::RenderTarget;
use crate::resources::texture::UvSample;
use crate::scene::environment::Background;

/// Clears `target` for a new frame and paints the background.
pub fn fill_background(target: &mut RenderTarget, background: &Background, view: &FrameView) {
    target.clear();

    match background {
        Background::Color(color) => target.framebuffer.fill(color.with_alpha(1.0)),
        Background::Sky(texture) => {
            let width = target.width() as usize;
            for (i, pixel) in target.framebuffer.iter_mut().enumerate() {
                let p = Vec2::new((i % width) as f32 + 0.5, (i / width) as f32 + 0.5);
                let uv = direction_to_equirect(view.view_direction(p));
                *pixel = texture.sample(&UvSample::point(uv)).with_alpha(1.0);
            }
        }
    }
}
