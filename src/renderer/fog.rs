//! Volumetric fog.
//!
//! Light travelling from `start` to the eye at `end` through a homogeneous
//! [`Volume`]. Plain volumes apply Beer–Lambert extinction towards the
//! medium's own color in one step. God-ray volumes march the segment and
//! gather in-scattered light from every light at each step, so shadowed
//! spot cones show up as visible shafts.

use glam::Vec3;

use crate::color::Color;
use crate::renderer::lighting::ResolvedLight;
use crate::resources::volume::Volume;

/// Upper bound on march steps; longer segments take longer steps.
pub const MAX_FOG_STEPS: usize = 512;

/// Color seen at `end` looking towards `start`, where `background` is the
/// color leaving `start`.
#[must_use]
pub fn sample_fog(start: Vec3, end: Vec3, background: Color, lights: &[ResolvedLight], volume: &Volume) -> Color {
    let offset = end - start;
    let distance = offset.length();
    if !(distance > 0.0) {
        return background;
    }

    let intensity = volume.intensity();
    if !volume.god_rays {
        let visibility = (intensity * -distance).exp();
        return medium_color(volume, volume.diffuse).mix(background, visibility).with_alpha(background.a);
    }

    let step = volume.sample_length.max(distance / MAX_FOG_STEPS as f32);
    let direction = offset / distance;

    let mut color = background;
    let mut travelled = 0.0;
    while travelled < distance {
        let length = step.min(distance - travelled);
        let point = start + direction * (travelled + length * 0.5);

        let visibility = (intensity * -length).exp();
        color = inscatter(point, lights, volume).mix(color, visibility);

        travelled += length;
    }

    color.with_alpha(background.a)
}

fn inscatter(point: Vec3, lights: &[ResolvedLight], volume: &Volume) -> Color {
    let received = lights
        .iter()
        .filter_map(|light| light.sample(point))
        .fold(Color::TRANSPARENT, |acc, s| acc + s.radiance);
    medium_color(volume, received * volume.diffuse)
}

#[inline]
fn medium_color(volume: &Volume, scattered: Color) -> Color {
    (scattered + volume.emissive).with_alpha(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fog(transmission: f32, god_rays: bool) -> Volume {
        let v = Volume::new(Color::splat(0.5), Color::BLACK, Color::splat(transmission), 1.0);
        if god_rays { v.with_god_rays(0.25) } else { v }
    }

    #[test]
    fn clear_medium_returns_background() {
        let bg = Color::rgb(0.2, 0.4, 0.6);
        for god_rays in [false, true] {
            let c = sample_fog(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), bg, &[], &fog(1.0, god_rays));
            assert!(c.max_difference(bg) < 1e-6, "{c:?}");
        }
    }

    #[test]
    fn longer_paths_hide_more() {
        let bg = Color::WHITE;
        let v = fog(0.5, false);
        let near = sample_fog(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), bg, &[], &v);
        let far = sample_fog(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0), bg, &[], &v);
        assert!(far.r < near.r);
        assert!(near.r < 1.0);
    }

    #[test]
    fn march_matches_single_step_without_lights() {
        // Without lights and emission both paths collapse to plain extinction.
        let bg = Color::rgb(1.0, 0.5, 0.25);
        let a = sample_fog(Vec3::ZERO, Vec3::new(0.0, 3.3, 0.0), bg, &[], &fog(0.7, false));
        let mut dark = fog(0.7, false);
        dark.diffuse = Color::BLACK;
        let b = sample_fog(Vec3::ZERO, Vec3::new(0.0, 3.3, 0.0), bg, &[], &dark.clone().with_god_rays(0.1));
        let c = sample_fog(Vec3::ZERO, Vec3::new(0.0, 3.3, 0.0), bg, &[], &dark);
        assert!(b.max_difference(c) < 1e-4, "{b:?} vs {c:?}");
        assert!(a.r >= c.r);
    }
}
