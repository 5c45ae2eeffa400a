use std::f32::consts::PI;

use glam::Vec3;

use crate::color::Color;
use crate::renderer::fragment::Fragment;
use crate::renderer::shading::ShadingContext;
use crate::resources::material::{MaterialFlags, apply_normal_map};
use crate::resources::texture::{TextureRef, TexturedColor, UvSample};

/// Reflectance of dielectrics at normal incidence.
const DIELECTRIC_F0: f32 = 0.04;

/// Metallic/roughness material shaded with a Cook-Torrance BRDF.
///
/// Scalar properties are stored as [`TexturedColor`]s and read from the red
/// channel, so `metallic` and `roughness` maps multiply the constant factor.
#[derive(Debug, Clone)]
pub struct PhysicalMaterial {
    pub albedo: TexturedColor,
    pub metallic: TexturedColor,
    pub roughness: TexturedColor,
    pub ambient_occlusion: TexturedColor,
    pub emissive: TexturedColor,
    pub normal_map: Option<TextureRef>,
}

impl PhysicalMaterial {
    #[must_use]
    pub fn new(albedo: Color, metallic: f32, roughness: f32) -> Self {
        Self {
            albedo: TexturedColor::new(albedo),
            metallic: TexturedColor::new(Color::splat(metallic)),
            roughness: TexturedColor::new(Color::splat(roughness)),
            ambient_occlusion: TexturedColor::new(Color::WHITE),
            emissive: TexturedColor::new(Color::BLACK),
            normal_map: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn base_color(&self, s: &UvSample) -> Color {
        self.albedo.sample(s)
    }

    pub(crate) fn shade(
        &self,
        flags: MaterialFlags,
        fragment: &Fragment,
        previous: Color,
        ctx: &ShadingContext<'_>,
    ) -> Color {
        let s = &fragment.uv;

        let mut n = fragment.shading_normal();
        if let Some(map) = &self.normal_map {
            n = apply_normal_map(fragment, n, map.sample(s));
        }
        let v = (ctx.camera_position - fragment.world_position).normalize_or_zero();

        let albedo = fragment.base_color.to_vec3();
        let metallic = self.metallic.sample(s).r.clamp(0.0, 1.0);
        // Fully smooth surfaces collapse the GGX lobe to a singularity.
        let roughness = self.roughness.sample(s).r.clamp(0.04, 1.0);
        let ao = self.ambient_occlusion.sample(s).r;

        let f0 = Vec3::splat(DIELECTRIC_F0).lerp(albedo, metallic);
        let n_dot_v = n.dot(v).max(0.0);

        let mut lo = Vec3::ZERO;
        for light in ctx.lights {
            let Some(sample) = light.sample(fragment.world_position) else {
                continue;
            };
            let l = sample.direction;
            let n_dot_l = n.dot(l);
            if n_dot_l <= 0.0 {
                continue;
            }
            let h = (v + l).normalize_or_zero();

            let ndf = distribution_ggx(n.dot(h).max(0.0), roughness);
            let g = geometry_smith(n_dot_v, n_dot_l, roughness);
            let f = fresnel_schlick(h.dot(v).max(0.0), f0);

            let specular = ndf * g * f / (4.0 * n_dot_v * n_dot_l + 1e-4);
            let kd = (Vec3::ONE - f) * (1.0 - metallic);

            lo += (kd * albedo / PI + specular) * sample.radiance.to_vec3() * n_dot_l;
        }

        let ambient = ctx.ambient.to_vec3() * albedo * ao;
        let lighting = Color::from_vec3(ambient + lo) + self.emissive.sample(s).with_alpha(0.0);
        let lighting = lighting.with_alpha(1.0);

        ctx.record_luminance(lighting);

        if flags.contains(MaterialFlags::TRANSPARENT) {
            previous.lerp(lighting, fragment.base_color.a).with_alpha(1.0)
        } else {
            lighting
        }
    }
}

impl Default for PhysicalMaterial {
    fn default() -> Self {
        Self::new(Color::WHITE, 0.0, 0.5)
    }
}

/// Trowbridge-Reitz GGX normal distribution.
#[inline]
fn distribution_ggx(n_dot_h: f32, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let a2 = a * a;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * d * d)
}

/// Schlick-GGX single-direction geometry term (direct lighting `k`).
#[inline]
fn geometry_schlick_ggx(n_dot_x: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = r * r / 8.0;
    n_dot_x / (n_dot_x * (1.0 - k) + k)
}

#[inline]
fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    geometry_schlick_ggx(n_dot_v, roughness) * geometry_schlick_ggx(n_dot_l, roughness)
}

#[inline]
fn fresnel_schlick(cos_theta: f32, f0: Vec3) -> Vec3 {
    f0 + (Vec3::ONE - f0) * (1.0 - cos_theta).clamp(0.0, 1.0).powi(5)
}
