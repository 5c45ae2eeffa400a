//! Homogeneous participating media.

use crate::color::Color;

/// A homogeneous participating medium (fog, water, smoke).
///
/// `transmission` is the fraction of light per channel that survives one
/// world unit at `density == 1`. The per-channel absorption coefficient
/// ("intensity") is derived from it and cached; a medium with zero intensity
/// leaves everything behind it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    /// Fraction of incoming light scattered towards the viewer.
    pub diffuse: Color,
    /// Light emitted by the medium itself.
    pub emissive: Color,
    transmission: Color,
    density: f32,
    intensity: Color,

    /// Ray march with in-scattering instead of plain extinction.
    pub god_rays: bool,
    /// March step length in world units.
    pub sample_length: f32,
}

impl Volume {
    #[must_use]
    pub fn new(diffuse: Color, emissive: Color, transmission: Color, density: f32) -> Self {
        let mut volume = Self {
            diffuse,
            emissive,
            transmission,
            density,
            intensity: Color::TRANSPARENT,
            god_rays: false,
            sample_length: 0.5,
        };
        volume.update_intensity();
        volume
    }

    /// Enables ray-marched in-scattering with the given step length.
    #[must_use]
    pub fn with_god_rays(mut self, sample_length: f32) -> Self {
        self.god_rays = true;
        self.sample_length = sample_length.max(1e-3);
        self
    }

    #[inline]
    #[must_use]
    pub fn transmission(&self) -> Color {
        self.transmission
    }

    #[inline]
    #[must_use]
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Per-channel absorption coefficient. Alpha is always zero.
    #[inline]
    #[must_use]
    pub fn intensity(&self) -> Color {
        self.intensity
    }

    pub fn set_transmission(&mut self, transmission: Color) {
        self.transmission = transmission;
        self.update_intensity();
    }

    pub fn set_density(&mut self, density: f32) {
        self.density = density;
        self.update_intensity();
    }

    /// `true` when light passes through without any loss.
    #[inline]
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.intensity.max_channel() <= 0.0
    }

    fn update_intensity(&mut self) {
        let absorb = |t: f32| -t.clamp(1e-6, 1.0).ln() * self.density.max(0.0);
        self.intensity = Color::new(
            absorb(self.transmission.r),
            absorb(self.transmission.g),
            absorb(self.transmission.b),
            0.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_transmission_is_clear() {
        let v = Volume::new(Color::WHITE, Color::BLACK, Color::WHITE, 3.0);
        assert!(v.is_clear());
    }

    #[test]
    fn zero_density_is_clear() {
        let v = Volume::new(Color::WHITE, Color::BLACK, Color::splat(0.5), 0.0);
        assert!(v.is_clear());
    }

    #[test]
    fn intensity_tracks_density() {
        let mut v = Volume::new(Color::WHITE, Color::BLACK, Color::splat(0.5), 1.0);
        let before = v.intensity().r;
        v.set_density(2.0);
        assert!((v.intensity().r - 2.0 * before).abs() < 1e-5);
    }
}
