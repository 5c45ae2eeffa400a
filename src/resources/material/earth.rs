use crate::color::Color;
use crate::renderer::fragment::Fragment;
use crate::renderer::shading::ShadingContext;
use crate::resources::material::{MaterialFlags, PhongMaterial};
use crate::resources::texture::{TextureRef, UvSample};

/// Mask values above this pick the ocean sub-material.
const OCEAN_THRESHOLD: f32 = 0.5;

/// Planet surface composed from three Phong materials.
///
/// The ocean mask selects between `ocean` and `terrain` for the ground; the
/// `clouds` layer is shaded separately with its own diffuse as base color and
/// blended over the ground by the cloud coverage map (red channel).
#[derive(Debug, Clone)]
pub struct EarthMaterial {
    pub ocean: PhongMaterial,
    pub terrain: PhongMaterial,
    pub clouds: PhongMaterial,
    pub ocean_mask: TextureRef,
    pub cloud_coverage: TextureRef,
}

impl EarthMaterial {
    fn is_ocean(&self, s: &UvSample) -> bool {
        self.ocean_mask.sample(s).r > OCEAN_THRESHOLD
    }

    fn ground(&self, s: &UvSample) -> &PhongMaterial {
        if self.is_ocean(s) { &self.ocean } else { &self.terrain }
    }

    pub(crate) fn needs_tbn(&self) -> bool {
        self.ocean.normal_map.is_some() || self.terrain.normal_map.is_some() || self.clouds.normal_map.is_some()
    }

    #[must_use]
    pub fn base_color(&self, s: &UvSample) -> Color {
        self.ground(s).base_color(s)
    }

    pub(crate) fn shade(
        &self,
        flags: MaterialFlags,
        fragment: &Fragment,
        previous: Color,
        ctx: &ShadingContext<'_>,
    ) -> Color {
        let s = &fragment.uv;
        let ground = self.ground(s).shade(flags, fragment, previous, ctx);

        let mut cloud_fragment = fragment.clone();
        cloud_fragment.base_color = self.clouds.base_color(s);
        let cloud = self.clouds.shade(flags, &cloud_fragment, previous, ctx);

        ground.lerp(cloud, self.cloud_coverage.sample(s).r)
    }
}
