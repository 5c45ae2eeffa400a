use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;

use crate::color::Color;
use crate::renderer::lighting::ResolvedLight;
use crate::resources::volume::Volume;

/// Per-frame inputs shared by every shading call.
///
/// Built once per frame on the render thread and read concurrently by the
/// deferred workers; the only mutable state is the exposure accumulator,
/// which is atomic.
#[derive(Debug)]
pub struct ShadingContext<'a> {
    pub lights: &'a [ResolvedLight],
    pub ambient: Color,
    pub camera_position: Vec3,
    /// Scene medium, used when a material has no volume of its own.
    pub fog: Option<&'a Volume>,

    track_exposure: bool,
    // f32 bits; valid for `fetch_max` because values are non-negative.
    max_luminance: AtomicU32,
}

impl<'a> ShadingContext<'a> {
    #[must_use]
    pub fn new(lights: &'a [ResolvedLight], ambient: Color, camera_position: Vec3, fog: Option<&'a Volume>) -> Self {
        Self {
            lights,
            ambient,
            camera_position,
            fog,
            track_exposure: true,
            max_luminance: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn with_exposure_tracking(mut self, enabled: bool) -> Self {
        self.track_exposure = enabled;
        self
    }

    /// Folds a shaded color into the frame's maximum luminance.
    #[inline]
    pub fn record_luminance(&self, color: Color) {
        if !self.track_exposure {
            return;
        }
        let luminance = color.luminance();
        if luminance.is_finite() && luminance > 0.0 {
            self.max_luminance.fetch_max(luminance.to_bits(), Ordering::Relaxed);
        }
    }

    /// Brightest luminance recorded so far this frame.
    #[must_use]
    pub fn max_luminance(&self) -> f32 {
        f32::from_bits(self.max_luminance.load(Ordering::Relaxed))
    }
}
