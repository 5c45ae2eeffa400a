use uuid::Uuid;

use crate::color::Color;

/// Shadow-map parameters for lights with `cast_shadows` set. Only spot
/// lights render shadow maps.
#[derive(Debug, Clone)]
pub struct ShadowConfig {
    /// Depth slack (world units) before a point counts as occluded.
    pub bias: f32,
    /// Square shadow-map resolution in pixels.
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            bias: 0.05,
            map_size: 512,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Light types. Directions come from the owning node: directional lights
/// shine along the node's `-Z`, spot lights face it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point,
    /// Cone half-angles in radians. Full intensity inside `inner_cone`,
    /// smooth falloff to zero at `outer_cone`.
    Spot { inner_cone: f32, outer_cone: f32 },
}

#[derive(Debug, Clone)]
pub struct Light {
    pub uuid: Uuid,
    pub color: Color,
    pub intensity: f32,
    pub kind: LightKind,

    pub cast_shadows: bool,
    pub shadow: ShadowConfig,
}

impl Light {
    fn new(color: Color, intensity: f32, kind: LightKind) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            color,
            intensity,
            kind,
            cast_shadows: false,
            shadow: ShadowConfig::default(),
        }
    }

    #[must_use]
    pub fn new_directional(color: Color, intensity: f32) -> Self {
        Self::new(color, intensity, LightKind::Directional)
    }

    #[must_use]
    pub fn new_point(color: Color, intensity: f32) -> Self {
        Self::new(color, intensity, LightKind::Point)
    }

    #[must_use]
    pub fn new_spot(color: Color, intensity: f32, inner_cone: f32, outer_cone: f32) -> Self {
        Self::new(color, intensity, LightKind::Spot { inner_cone, outer_cone })
    }

    #[must_use]
    pub fn with_shadows(mut self, shadow: ShadowConfig) -> Self {
        self.cast_shadows = true;
        self.shadow = shadow;
        self
    }

    /// `color * intensity`, before distance attenuation.
    #[inline]
    #[must_use]
    pub fn radiance(&self) -> Color {
        (self.color * self.intensity).with_alpha(1.0)
    }
}
