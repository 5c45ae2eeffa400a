use crate::color::Color;
use crate::math::reflect;
use crate::renderer::fragment::Fragment;
use crate::renderer::shading::ShadingContext;
use crate::resources::material::{MaterialFlags, apply_normal_map};
use crate::resources::texture::{TextureRef, TexturedColor, UvSample};

/// Phong-style material with specular highlights, a subsurface term for
/// thin double-sided surfaces, and tinted transparency.
///
/// The specular alpha channel encodes glossiness: shininess is
/// `2^(alpha * 25.5)`.
#[derive(Debug, Clone)]
pub struct PhongMaterial {
    pub diffuse: TexturedColor,
    pub specular: TexturedColor,
    /// Transmission filter for transparent surfaces and the color of light
    /// scattered through opaque double-sided ones.
    pub tint: TexturedColor,
    pub emissive: TexturedColor,
    pub normal_map: Option<TextureRef>,
}

impl PhongMaterial {
    #[must_use]
    pub fn new(diffuse: Color) -> Self {
        Self {
            diffuse: TexturedColor::new(diffuse),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_specular(mut self, specular: Color) -> Self {
        self.specular = TexturedColor::new(specular);
        self
    }

    #[must_use]
    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = TexturedColor::new(tint);
        self
    }

    #[must_use]
    pub fn with_emissive(mut self, emissive: Color) -> Self {
        self.emissive = TexturedColor::new(emissive);
        self
    }

    #[must_use]
    pub fn with_normal_map(mut self, normal_map: TextureRef) -> Self {
        self.normal_map = Some(normal_map);
        self
    }

    #[inline]
    #[must_use]
    pub fn base_color(&self, s: &UvSample) -> Color {
        self.diffuse.sample(s)
    }

    pub(crate) fn shade(
        &self,
        flags: MaterialFlags,
        fragment: &Fragment,
        previous: Color,
        ctx: &ShadingContext<'_>,
    ) -> Color {
        let s = &fragment.uv;
        let transparent = flags.contains(MaterialFlags::TRANSPARENT);
        let double_sided = flags.contains(MaterialFlags::DOUBLE_SIDED);
        let scatters = !transparent && double_sided;

        let mut normal = fragment.shading_normal();
        if let Some(map) = &self.normal_map {
            normal = apply_normal_map(fragment, normal, map.sample(s));
        }

        let view = (ctx.camera_position - fragment.world_position).normalize_or_zero();
        let specular_color = self.specular.sample(s);
        let shininess = 2f32.powf(specular_color.a * 25.5);
        let emissive = self.emissive.sample(s);
        let base = fragment.base_color;

        // Only sampled when something actually consumes it.
        let tint = if scatters || transparent {
            self.tint.sample(s)
        } else {
            Color::BLACK
        };

        let mut diffuse = Color::TRANSPARENT;
        let mut specular = Color::TRANSPARENT;
        let mut scattered = Color::TRANSPARENT;

        for light in ctx.lights {
            let Some(sample) = light.sample(fragment.world_position) else {
                continue;
            };

            let mut received = normal.dot(sample.direction);
            if transparent && double_sided {
                received = received.abs();
            }

            if received > 0.0 {
                if base.a > 0.0 {
                    diffuse += sample.radiance * received;
                }
                let highlight = reflect(-sample.direction, normal).dot(view).max(0.0).powf(shininess);
                specular += sample.radiance * highlight;
            } else if scatters {
                scattered += sample.radiance * -received;
            }
        }

        let lighting = ((ctx.ambient + diffuse) * base
            + scattered * tint
            + specular * specular_color
            + emissive)
            .with_alpha(1.0);

        ctx.record_luminance(lighting);

        if transparent {
            let filter = Color::from_vec3(tint.to_vec3() * tint.a);
            (previous * filter + lighting).with_alpha(1.0)
        } else {
            lighting
        }
    }
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            diffuse: TexturedColor::new(Color::WHITE),
            specular: TexturedColor::new(Color::new(0.0, 0.0, 0.0, 0.2)),
            tint: TexturedColor::new(Color::BLACK),
            emissive: TexturedColor::new(Color::BLACK),
            normal_map: None,
        }
    }
}
