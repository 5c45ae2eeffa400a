//! Materials
//!
//! A [`Material`] couples render-state flags with one of the concrete
//! shading models in [`MaterialData`]. Dispatch is a closed enum: the set of
//! shading models is known up front, and the rasterizer calls into it for
//! every fragment, so there is no boxing on the hot path.
//!
//! | Model      | Type                 | Notes                                   |
//! |------------|----------------------|-----------------------------------------|
//! | Phong      | [`PhongMaterial`]    | Specular, SSS, tinted transparency      |
//! | Physical   | [`PhysicalMaterial`] | Cook-Torrance GGX                        |
//! | Earth      | [`EarthMaterial`]    | Composite of three Phong sub-materials  |

mod earth;
mod phong;
mod physical;

pub use earth::EarthMaterial;
pub use phong::PhongMaterial;
pub use physical::PhysicalMaterial;

use std::sync::Arc;

use bitflags::bitflags;
use uuid::Uuid;

use crate::color::Color;
use crate::renderer::fog::sample_fog;
use crate::renderer::fragment::Fragment;
use crate::renderer::shading::ShadingContext;
use crate::resources::texture::UvSample;
use crate::resources::volume::Volume;

/// Shared material handle. Faces of many meshes may alias one material.
pub type MaterialRef = Arc<Material>;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u32 {
        /// Composited back-to-front over what is behind it; never writes depth.
        const TRANSPARENT  = 1 << 0;
        /// Never back-face culled; both sides receive light.
        const DOUBLE_SIDED = 1 << 1;
        /// Base color alpha below 0.5 discards the fragment at raster time.
        const ALPHA_CUTOUT = 1 << 2;
    }
}

/// Participating media on either side of a surface.
#[derive(Debug, Clone, Default)]
pub struct SideVolumes {
    /// Medium on the side the normal points to.
    pub front: Option<Volume>,
    /// Medium behind the surface (the object's interior).
    pub back: Option<Volume>,
}

#[derive(Debug, Clone)]
pub enum MaterialData {
    Phong(PhongMaterial),
    Physical(PhysicalMaterial),
    Earth(Box<EarthMaterial>),
}

#[derive(Debug, Clone)]
pub struct Material {
    pub uuid: Uuid,
    pub name: Option<String>,
    pub flags: MaterialFlags,
    pub volumes: SideVolumes,
    pub data: MaterialData,
}

impl Material {
    #[must_use]
    pub fn new(data: MaterialData) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: None,
            flags: MaterialFlags::empty(),
            volumes: SideVolumes::default(),
            data,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: MaterialFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_volumes(mut self, front: Option<Volume>, back: Option<Volume>) -> Self {
        self.volumes = SideVolumes { front, back };
        self
    }

    #[must_use]
    pub fn shared(self) -> MaterialRef {
        Arc::new(self)
    }

    #[inline]
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.flags.contains(MaterialFlags::TRANSPARENT)
    }

    #[inline]
    #[must_use]
    pub fn is_double_sided(&self) -> bool {
        self.flags.contains(MaterialFlags::DOUBLE_SIDED)
    }

    #[inline]
    #[must_use]
    pub fn is_alpha_cutout(&self) -> bool {
        self.flags.contains(MaterialFlags::ALPHA_CUTOUT)
    }

    /// Whether fragments need a tangent frame (a normal map is present).
    #[must_use]
    pub fn needs_tbn(&self) -> bool {
        match &self.data {
            MaterialData::Phong(m) => m.normal_map.is_some(),
            MaterialData::Physical(m) => m.normal_map.is_some(),
            MaterialData::Earth(m) => m.needs_tbn(),
        }
    }

    /// Unlit surface color at a texture coordinate.
    #[must_use]
    pub fn base_color(&self, s: &UvSample) -> Color {
        match &self.data {
            MaterialData::Phong(m) => m.base_color(s),
            MaterialData::Physical(m) => m.base_color(s),
            MaterialData::Earth(m) => m.base_color(s),
        }
    }

    /// Shades a fragment whose base color has already been resolved.
    ///
    /// `previous` is the framebuffer color currently behind the fragment;
    /// transparent materials composite over it. Fog between the fragment and
    /// the camera is applied last, from the volume on the side the camera is
    /// on, falling back to the scene medium.
    #[must_use]
    pub fn shade(&self, fragment: &Fragment, previous: Color, ctx: &ShadingContext<'_>) -> Color {
        let color = match &self.data {
            MaterialData::Phong(m) => m.shade(self.flags, fragment, previous, ctx),
            MaterialData::Physical(m) => m.shade(self.flags, fragment, previous, ctx),
            MaterialData::Earth(m) => m.shade(self.flags, fragment, previous, ctx),
        };

        let side = if fragment.back_face {
            self.volumes.back.as_ref()
        } else {
            self.volumes.front.as_ref()
        };

        match side.or(ctx.fog) {
            Some(volume) if !volume.is_clear() => {
                sample_fog(fragment.world_position, ctx.camera_position, color, ctx.lights, volume)
            }
            _ => color,
        }
    }
}

impl From<PhongMaterial> for Material {
    fn from(m: PhongMaterial) -> Self {
        Self::new(MaterialData::Phong(m))
    }
}

impl From<PhysicalMaterial> for Material {
    fn from(m: PhysicalMaterial) -> Self {
        Self::new(MaterialData::Physical(m))
    }
}

impl From<EarthMaterial> for Material {
    fn from(m: EarthMaterial) -> Self {
        Self::new(MaterialData::Earth(Box::new(m)))
    }
}

/// Perturbs `normal` with a tangent-space normal-map sample.
pub(crate) fn apply_normal_map(fragment: &Fragment, normal: glam::Vec3, sample: Color) -> glam::Vec3 {
    let ts = glam::Vec3::new(sample.r * 2.0 - 1.0, sample.g * 2.0 - 1.0, sample.b * 2.0 - 1.0);
    let perturbed = fragment.tangent * ts.x + fragment.bitangent * ts.y + normal * ts.z;
    let n = perturbed.normalize_or_zero();
    if n == glam::Vec3::ZERO { normal } else { n }
}
