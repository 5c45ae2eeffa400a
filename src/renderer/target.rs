//! Render targets.
//!
//! A [`RenderTarget`] owns every per-pixel buffer of a frame:
//!
//! | Buffer        | Type       | Present              |
//! |---------------|------------|----------------------|
//! | `framebuffer` | `Color`    | always               |
//! | `z_buffer`    | `f32`      | always               |
//! | `gbuffer`     | `Fragment` | deferred targets only|
//!
//! The z-buffer stores inverse linear depth `1 / w`: larger values are
//! nearer and `0.0` marks a pixel nothing has been drawn to.

use std::fmt;

use glam::{UVec2, Vec2};

use crate::color::Color;
use crate::errors::{RasterError, Result};
use crate::renderer::fragment::Fragment;

/// Z-buffer value of a pixel no geometry covers.
pub const EMPTY_DEPTH: f32 = 0.0;

/// A pixel-space line drawn over the finished frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLine {
    pub from: Vec2,
    pub to: Vec2,
    pub color: Color,
}

#[derive(Clone, Default)]
pub struct RenderTarget {
    size: UVec2,
    pub framebuffer: Vec<Color>,
    pub z_buffer: Vec<f32>,
    pub(crate) gbuffer: Vec<Fragment>,
    deferred: bool,
    pub(crate) overlay: Vec<OverlayLine>,
}

impl fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTarget")
            .field("size", &self.size)
            .field("deferred", &self.deferred)
            .finish_non_exhaustive()
    }
}

fn allocate<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| RasterError::AllocationFailed {
        what,
        bytes: len.saturating_mul(size_of::<T>()),
    })?;
    buffer.resize(len, value);
    Ok(buffer)
}

impl RenderTarget {
    pub fn new(size: UVec2, deferred: bool) -> Result<Self> {
        let mut target = Self::default();
        target.change_size(size, deferred)?;
        Ok(target)
    }

    /// Reallocates all buffers for `size`.
    ///
    /// On failure the target is left exactly as it was.
    pub fn change_size(&mut self, size: UVec2, deferred: bool) -> Result<()> {
        if size.x == 0 || size.y == 0 {
            return Err(RasterError::InvalidTargetSize { width: size.x, height: size.y });
        }
        let len = (size.x as usize).checked_mul(size.y as usize).ok_or(RasterError::AllocationFailed {
            what: "framebuffer",
            bytes: usize::MAX,
        })?;

        let framebuffer = allocate("framebuffer", len, Color::BLACK)?;
        let z_buffer = allocate("z-buffer", len, EMPTY_DEPTH)?;
        let gbuffer = if deferred {
            allocate("gbuffer", len, Fragment::default())?
        } else {
            Vec::new()
        };

        self.framebuffer = framebuffer;
        self.z_buffer = z_buffer;
        self.gbuffer = gbuffer;
        self.size = size;
        self.deferred = deferred;
        self.overlay.clear();

        log::debug!("Render target resized to {}x{} (deferred: {deferred})", size.x, size.y);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> UVec2 {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.size.x
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.size.y
    }

    #[inline]
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.framebuffer.is_empty()
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        if self.size.y == 0 {
            1.0
        } else {
            self.size.x as f32 / self.size.y as f32
        }
    }

    #[inline]
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size.x as usize + x as usize
    }

    #[inline]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.framebuffer[self.index(x, y)]
    }

    /// Geometry buffer of a deferred target.
    #[must_use]
    pub fn gbuffer(&self) -> Option<&[Fragment]> {
        self.deferred.then_some(self.gbuffer.as_slice())
    }

    /// Wireframe lines queued for the end of the frame.
    #[must_use]
    pub fn overlay(&self) -> &[OverlayLine] {
        &self.overlay
    }

    /// Clears depth, the geometry buffer and the overlay; color is left to
    /// the background fill.
    pub fn clear(&mut self) {
        self.z_buffer.fill(EMPTY_DEPTH);
        for fragment in &mut self.gbuffer {
            fragment.valid = false;
            fragment.material = None;
        }
        self.overlay.clear();
    }

    pub(crate) fn push_line(&mut self, from: Vec2, to: Vec2, color: Color) {
        self.overlay.push(OverlayLine { from, to, color });
    }

    /// Rasterizes the queued overlay lines into the framebuffer (DDA).
    pub(crate) fn draw_overlay(&mut self) {
        let lines = std::mem::take(&mut self.overlay);
        let (w, h) = (self.size.x as f32, self.size.y as f32);
        for line in &lines {
            let delta = line.to - line.from;
            let steps = delta.x.abs().max(delta.y.abs()).ceil();
            if !steps.is_finite() {
                continue;
            }
            let steps = steps.max(1.0) as usize;
            let inc = delta / steps as f32;
            let mut p = line.from;
            for _ in 0..=steps {
                if p.x >= 0.0 && p.y >= 0.0 && p.x < w && p.y < h {
                    let i = self.index(p.x as u32, p.y as u32);
                    self.framebuffer[i] = line.color;
                }
                p += inc;
            }
        }
        self.overlay = lines;
    }

    /// 8-bit RGBA bytes, row-major from the top-left, after mapping each
    /// color through `map` (usually a tone mapper).
    #[must_use]
    pub fn to_rgba8(&self, map: impl Fn(Color) -> Color) -> Vec<u8> {
        self.framebuffer
            .iter()
            .flat_map(|&c| map(c).with_alpha(1.0).to_rgba8())
            .collect()
    }

    /// Linear depth normalised to `[0, 1]` over the covered pixels;
    /// empty pixels read `1.0`.
    #[must_use]
    pub fn depth_view(&self) -> Vec<f32> {
        let (min, max) = self
            .z_buffer
            .iter()
            .filter(|&&z| z > EMPTY_DEPTH)
            .map(|&z| 1.0 / z)
            .fold((f32::INFINITY, 0.0f32), |(lo, hi), d| (lo.min(d), hi.max(d)));
        let range = max - min;

        self.z_buffer
            .iter()
            .map(|&z| {
                if z <= EMPTY_DEPTH {
                    1.0
                } else if range > 0.0 {
                    (1.0 / z - min) / range
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_is_rejected_and_leaves_target_intact() {
        let mut target = RenderTarget::new(UVec2::new(4, 2), false).unwrap();
        let err = target.change_size(UVec2::new(0, 3), true).unwrap_err();
        assert!(matches!(err, RasterError::InvalidTargetSize { width: 0, height: 3 }));
        assert_eq!(target.size(), UVec2::new(4, 2));
        assert_eq!(target.framebuffer.len(), 8);
    }

    #[test]
    fn overlay_draws_horizontal_line() {
        let mut target = RenderTarget::new(UVec2::new(8, 4), false).unwrap();
        target.push_line(Vec2::new(0.5, 1.5), Vec2::new(6.5, 1.5), Color::WHITE);
        target.draw_overlay();
        for x in 0..7 {
            assert_eq!(target.pixel(x, 1), Color::WHITE);
        }
        assert_eq!(target.pixel(7, 1), Color::BLACK);
        assert_eq!(target.pixel(3, 0), Color::BLACK);
    }

    #[test]
    fn depth_view_normalises_covered_pixels() {
        let mut target = RenderTarget::new(UVec2::new(3, 1), false).unwrap();
        target.z_buffer = vec![1.0 / 2.0, 1.0 / 4.0, EMPTY_DEPTH];
        let view = target.depth_view();
        assert_eq!(view, vec![0.0, 1.0, 1.0]);
    }
}
