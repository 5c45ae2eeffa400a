//! Image textures with a CPU mip chain.
//!
//! Decoding is not handled here: images arrive as already decoded pixels
//! (either floating point colors or tightly packed RGBA8 bytes). On
//! construction a box-filtered mip chain is built down to 1x1 so that
//! minified lookups can pick a level from the screen-space UV footprint.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::resources::texture::UvSample;

/// How texels are reconstructed between sample positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterMode {
    /// Closest texel of mip level 0.
    Nearest,
    /// Bilinear filtering on mip level 0.
    Bilinear,
    /// Bilinear filtering on the two closest mip levels, blended.
    #[default]
    Trilinear,
}

/// What happens to UVs outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddressMode {
    #[default]
    Repeat,
    ClampToEdge,
}

/// Sampling state attached to an image texture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextureSampler {
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub filter: FilterMode,
    /// Maximum number of taps along the major footprint axis (1 = off).
    pub anisotropy_clamp: u16,
}

impl Default for TextureSampler {
    fn default() -> Self {
        Self {
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            filter: FilterMode::Trilinear,
            anisotropy_clamp: 8,
        }
    }
}

#[derive(Debug, Clone)]
struct MipLevel {
    width: u32,
    height: u32,
    texels: Vec<Color>,
}

impl MipLevel {
    #[inline]
    fn texel(&self, x: u32, y: u32) -> Color {
        self.texels[(y * self.width + x) as usize]
    }

    /// Half-resolution box filter. Odd edges repeat their last texel.
    fn downsample(&self) -> Self {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let x0 = (x * 2).min(self.width - 1);
                let x1 = (x * 2 + 1).min(self.width - 1);
                let y0 = (y * 2).min(self.height - 1);
                let y1 = (y * 2 + 1).min(self.height - 1);
                let sum = self.texel(x0, y0) + self.texel(x1, y0) + self.texel(x0, y1) + self.texel(x1, y1);
                texels.push(sum * 0.25);
            }
        }
        Self { width, height, texels }
    }
}

/// A decoded image plus its mip chain.
#[derive(Debug, Clone)]
pub struct ImageTexture {
    levels: Vec<MipLevel>,
    pub sampler: TextureSampler,
}

impl ImageTexture {
    /// Builds an image from linear colors laid out row by row.
    ///
    /// Returns `None` when `pixels.len() != width * height` or a dimension is
    /// zero.
    #[must_use]
    pub fn from_colors(width: u32, height: u32, pixels: Vec<Color>) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != (width as usize) * (height as usize) {
            return None;
        }

        let mut levels = vec![MipLevel { width, height, texels: pixels }];
        while let Some(last) = levels.last() {
            if last.width == 1 && last.height == 1 {
                break;
            }
            let next = last.downsample();
            levels.push(next);
        }

        Some(Self {
            levels,
            sampler: TextureSampler::default(),
        })
    }

    /// Builds an image from tightly packed RGBA8 bytes.
    #[must_use]
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|px| Color::from_rgba8([px[0], px[1], px[2], px[3]]))
            .collect();
        Self::from_colors(width, height, pixels)
    }

    #[must_use]
    pub fn with_sampler(mut self, sampler: TextureSampler) -> Self {
        self.sampler = sampler;
        self
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.levels[0].width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.levels[0].height
    }

    #[inline]
    #[must_use]
    pub fn mip_level_count(&self) -> usize {
        self.levels.len()
    }

    /// Samples the image at `sample.uv`, using the derivatives for level
    /// selection and anisotropic taps.
    #[must_use]
    pub fn sample(&self, sample: &UvSample) -> Color {
        match self.sampler.filter {
            FilterMode::Nearest => self.nearest(0, sample.uv),
            FilterMode::Bilinear => self.bilinear(0, sample.uv),
            FilterMode::Trilinear => self.anisotropic(sample),
        }
    }

    fn anisotropic(&self, sample: &UvSample) -> Color {
        let size = Vec2::new(self.width() as f32, self.height() as f32);
        let dx = sample.duv_dx * size;
        let dy = sample.duv_dy * size;
        let (len_x, len_y) = (dx.length(), dy.length());

        let (major, minor, axis) = if len_x >= len_y {
            (len_x, len_y, sample.duv_dx)
        } else {
            (len_y, len_x, sample.duv_dy)
        };

        if !major.is_finite() || major <= 1.0 {
            return self.bilinear(0, sample.uv);
        }

        let max_taps = f32::from(self.sampler.anisotropy_clamp.max(1));
        let ratio = if minor > 1e-6 { (major / minor).ceil() } else { max_taps };
        let taps = ratio.clamp(1.0, max_taps);
        let lod = (major / taps).max(1.0).log2();

        if taps <= 1.0 {
            return self.trilinear(lod, sample.uv);
        }

        let count = taps as u32;
        let mut acc = Color::TRANSPARENT;
        for i in 0..count {
            let t = (i as f32 + 0.5) / count as f32 - 0.5;
            acc += self.trilinear(lod, sample.uv + axis * t);
        }
        acc * (1.0 / count as f32)
    }

    fn trilinear(&self, lod: f32, uv: Vec2) -> Color {
        let max_level = (self.levels.len() - 1) as f32;
        let lod = lod.clamp(0.0, max_level);
        let lower = lod.floor();
        let frac = lod - lower;
        let base = self.bilinear(lower as usize, uv);
        if frac <= f32::EPSILON {
            return base;
        }
        let upper = (lower as usize + 1).min(self.levels.len() - 1);
        base.lerp(self.bilinear(upper, uv), frac)
    }

    fn nearest(&self, level: usize, uv: Vec2) -> Color {
        let mip = &self.levels[level];
        let x = self.address_u(uv.x * mip.width as f32, mip.width);
        let y = self.address_v(uv.y * mip.height as f32, mip.height);
        mip.texel(x, y)
    }

    fn bilinear(&self, level: usize, uv: Vec2) -> Color {
        let mip = &self.levels[level];
        let fx = uv.x * mip.width as f32 - 0.5;
        let fy = uv.y * mip.height as f32 - 0.5;
        if !fx.is_finite() || !fy.is_finite() {
            return mip.texel(0, 0);
        }
        let x0f = fx.floor();
        let y0f = fy.floor();
        let tx = fx - x0f;
        let ty = fy - y0f;

        let x0 = self.address_u(x0f, mip.width);
        let x1 = self.address_u(x0f + 1.0, mip.width);
        let y0 = self.address_v(y0f, mip.height);
        let y1 = self.address_v(y0f + 1.0, mip.height);

        let top = mip.texel(x0, y0).lerp(mip.texel(x1, y0), tx);
        let bottom = mip.texel(x0, y1).lerp(mip.texel(x1, y1), tx);
        top.lerp(bottom, ty)
    }

    #[inline]
    fn address_u(&self, coord: f32, extent: u32) -> u32 {
        address(self.sampler.address_mode_u, coord, extent)
    }

    #[inline]
    fn address_v(&self, coord: f32, extent: u32) -> u32 {
        address(self.sampler.address_mode_v, coord, extent)
    }
}

#[inline]
fn address(mode: AddressMode, coord: f32, extent: u32) -> u32 {
    let i = if coord.is_finite() { coord.floor() as i64 } else { 0 };
    let n = i64::from(extent);
    match mode {
        AddressMode::Repeat => i.rem_euclid(n) as u32,
        AddressMode::ClampToEdge => i.clamp(0, n - 1) as u32,
    }
}
