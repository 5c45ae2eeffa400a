//! Light sampling.
//!
//! Scene lights are resolved once per frame into world space
//! ([`ResolvedLight`]) so shading never touches the scene graph.

use glam::Vec3;

use crate::color::Color;
use crate::math::smoothstep;
use crate::renderer::shadow::ShadowMap;
use crate::scene::light::{Light, LightKind};
use crate::scene::transform::Transform;

/// Light arriving at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    pub radiance: Color,
    /// Unit vector from the point towards the light.
    pub direction: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedKind {
    Directional {
        /// Towards the light.
        direction: Vec3,
    },
    Point {
        position: Vec3,
    },
    Spot {
        position: Vec3,
        /// Direction the cone points in.
        facing: Vec3,
        cos_inner: f32,
        cos_outer: f32,
    },
}

/// A light in world space for the current frame.
#[derive(Debug, Clone)]
pub struct ResolvedLight {
    pub radiance: Color,
    pub kind: ResolvedKind,
    pub shadow: Option<ShadowMap>,
}

impl ResolvedLight {
    #[must_use]
    pub fn resolve(light: &Light, transform: &Transform) -> Self {
        let rotation = transform.world_rotation();
        let position = transform.global_position();
        let kind = match light.kind {
            LightKind::Directional => ResolvedKind::Directional { direction: rotation * Vec3::Z },
            LightKind::Point => ResolvedKind::Point { position },
            LightKind::Spot { inner_cone, outer_cone } => {
                let (mut cos_inner, mut cos_outer) = (inner_cone.cos(), outer_cone.cos());
                if cos_outer > cos_inner {
                    std::mem::swap(&mut cos_inner, &mut cos_outer);
                }
                ResolvedKind::Spot {
                    position,
                    facing: rotation * Vec3::NEG_Z,
                    cos_inner,
                    cos_outer,
                }
            }
        };

        Self { radiance: light.radiance(), kind, shadow: None }
    }

    #[must_use]
    pub fn with_shadow(mut self, shadow: ShadowMap) -> Self {
        self.shadow = Some(shadow);
        self
    }

    /// Light reaching `point`, or `None` when nothing arrives.
    #[must_use]
    pub fn sample(&self, point: Vec3) -> Option<LightSample> {
        let (radiance, direction) = match self.kind {
            ResolvedKind::Directional { direction } => (self.radiance, direction),
            ResolvedKind::Point { position } => inverse_square(self.radiance, position - point)?,
            ResolvedKind::Spot { position, facing, cos_inner, cos_outer } => {
                let (radiance, direction) = inverse_square(self.radiance, position - point)?;
                let cos_angle = (-direction).dot(facing);
                if cos_angle <= cos_outer {
                    return None;
                }
                let falloff = if cos_angle >= cos_inner {
                    1.0
                } else {
                    smoothstep(cos_outer, cos_inner, cos_angle)
                };
                if self.shadow.as_ref().is_some_and(|map| map.occludes(point)) {
                    return None;
                }
                (radiance * falloff, direction)
            }
        };

        (radiance.max_channel() > 0.0).then_some(LightSample { radiance, direction })
    }
}

fn inverse_square(radiance: Color, to_light: Vec3) -> Option<(Color, Vec3)> {
    let distance2 = to_light.length_squared();
    if !(distance2 > 0.0) {
        return None;
    }
    let direction = to_light / distance2.sqrt();
    Some(((radiance * (1.0 / distance2)).with_alpha(1.0), direction))
}
