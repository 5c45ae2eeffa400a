//! Texture sampling abstraction.
//!
//! Every material property that can vary across a surface is backed by a
//! [`Texture`]. Sampling takes a [`UvSample`] (coordinate plus screen-space
//! derivatives) so filtered textures can pick the right footprint.

use std::fmt;
use std::sync::Arc;

use glam::Vec2;

use crate::color::Color;
use crate::resources::image::ImageTexture;

/// Shared, immutable texture handle. Textures are aliased freely between
/// materials and are never mutated while a frame is in flight.
pub type TextureRef = Arc<Texture>;

/// A texture lookup: UV plus its screen-space derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UvSample {
    pub uv: Vec2,
    pub duv_dx: Vec2,
    pub duv_dy: Vec2,
}

impl UvSample {
    /// A lookup with no footprint (magnified / point sample).
    #[inline]
    #[must_use]
    pub fn point(uv: Vec2) -> Self {
        Self { uv, duv_dx: Vec2::ZERO, duv_dy: Vec2::ZERO }
    }
}

/// Procedural texture callback.
pub type ProceduralFn = dyn Fn(Vec2) -> Color + Send + Sync;

/// A texture evaluated from a function of UV.
#[derive(Clone)]
pub struct ProceduralTexture {
    pub label: &'static str,
    func: Arc<ProceduralFn>,
}

impl ProceduralTexture {
    pub fn new(label: &'static str, func: impl Fn(Vec2) -> Color + Send + Sync + 'static) -> Self {
        Self { label, func: Arc::new(func) }
    }

    /// Two-color checkerboard with `cells` squares per UV unit.
    #[must_use]
    pub fn checker(a: Color, b: Color, cells: f32) -> Self {
        Self::new("checker", move |uv| {
            let cx = (uv.x * cells).floor() as i64;
            let cy = (uv.y * cells).floor() as i64;
            if (cx + cy).rem_euclid(2) == 0 { a } else { b }
        })
    }

    #[inline]
    #[must_use]
    pub fn evaluate(&self, uv: Vec2) -> Color {
        (self.func)(uv)
    }
}

impl fmt::Debug for ProceduralTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProceduralTexture").field("label", &self.label).finish_non_exhaustive()
    }
}

/// How two textures in a [`BlendTexture`] are weighted.
#[derive(Debug, Clone)]
pub enum BlendFactor {
    Constant(f32),
    /// Weight taken from the red channel of another texture.
    Mask(TextureRef),
}

/// Linear blend of two textures.
#[derive(Debug, Clone)]
pub struct BlendTexture {
    pub a: TextureRef,
    pub b: TextureRef,
    pub factor: BlendFactor,
}

/// A grid of textures, each covering one cell of the unit UV square.
///
/// Used for images too large to keep as one texture (e.g. planetary maps
/// split into tiles). UVs wrap before the cell is selected.
#[derive(Debug, Clone)]
pub struct SlicedTexture {
    pub columns: u32,
    pub rows: u32,
    /// Row-major, `columns * rows` entries.
    pub slices: Vec<TextureRef>,
}

impl SlicedTexture {
    /// Returns `None` if the slice count does not match the grid.
    #[must_use]
    pub fn new(columns: u32, rows: u32, slices: Vec<TextureRef>) -> Option<Self> {
        if columns == 0 || rows == 0 || slices.len() != (columns * rows) as usize {
            return None;
        }
        Some(Self { columns, rows, slices })
    }

    fn sample(&self, s: &UvSample) -> Color {
        let scale = Vec2::new(self.columns as f32, self.rows as f32);
        let wrapped = s.uv - s.uv.floor();
        let cell = (wrapped * scale).floor();
        let col = (cell.x as u32).min(self.columns - 1);
        let row = (cell.y as u32).min(self.rows - 1);
        let local = UvSample {
            uv: wrapped * scale - Vec2::new(col as f32, row as f32),
            duv_dx: s.duv_dx * scale,
            duv_dy: s.duv_dy * scale,
        };
        self.slices[(row * self.columns + col) as usize].sample(&local)
    }
}

/// Polymorphic texture.
#[derive(Debug, Clone)]
pub enum Texture {
    Solid(Color),
    Image(ImageTexture),
    Procedural(ProceduralTexture),
    Blend(BlendTexture),
    Sliced(SlicedTexture),
}

impl Texture {
    /// Convenience constructor returning a shared handle.
    #[must_use]
    pub fn shared(self) -> TextureRef {
        Arc::new(self)
    }

    #[must_use]
    pub fn sample(&self, s: &UvSample) -> Color {
        match self {
            Self::Solid(c) => *c,
            Self::Image(image) => image.sample(s),
            Self::Procedural(p) => p.evaluate(s.uv),
            Self::Blend(blend) => {
                let t = match &blend.factor {
                    BlendFactor::Constant(t) => *t,
                    BlendFactor::Mask(mask) => mask.sample(s).r,
                };
                blend.a.sample(s).lerp(blend.b.sample(s), t)
            }
            Self::Sliced(sliced) => sliced.sample(s),
        }
    }
}

impl From<ImageTexture> for Texture {
    fn from(image: ImageTexture) -> Self {
        Self::Image(image)
    }
}

impl From<ProceduralTexture> for Texture {
    fn from(p: ProceduralTexture) -> Self {
        Self::Procedural(p)
    }
}

/// A color optionally modulated by a texture.
///
/// Material properties are stored this way: `sample` returns
/// `color * texture(uv)`, or just `color` when there is no texture.
#[derive(Debug, Clone)]
pub struct TexturedColor {
    pub color: Color,
    pub texture: Option<TextureRef>,
}

impl TexturedColor {
    #[must_use]
    pub const fn new(color: Color) -> Self {
        Self { color, texture: None }
    }

    #[must_use]
    pub fn textured(color: Color, texture: TextureRef) -> Self {
        Self { color, texture: Some(texture) }
    }

    #[inline]
    #[must_use]
    pub fn sample(&self, s: &UvSample) -> Color {
        match &self.texture {
            Some(texture) => self.color * texture.sample(s),
            None => self.color,
        }
    }
}

impl Default for TexturedColor {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

impl From<Color> for TexturedColor {
    fn from(color: Color) -> Self {
        Self::new(color)
    }
}
