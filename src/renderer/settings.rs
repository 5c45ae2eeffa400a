//! Renderer Settings
//!
//! Per-renderer configuration. Per-scene toggles (culling, full-bright,
//! wireframe) live in [`SceneSettings`] instead, so one renderer can draw
//! scenes configured differently.
//!
//! Settings can be loaded from JSON; missing fields take their defaults:
//!
//! ```rust
//! use prism::renderer::RendererSettings;
//!
//! let settings = RendererSettings::from_json_str(r#"{ "worker_count": 2 }"#).unwrap();
//! assert_eq!(settings.worker_count, Some(2));
//! assert!(settings.screen_space_fog);
//! ```
//!
//! [`SceneSettings`]: crate::scene::SceneSettings

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Deferred shading threads. `None` uses the available parallelism.
    pub worker_count: Option<usize>,

    /// Fog empty pixels with the scene medium.
    pub screen_space_fog: bool,

    /// Record the brightest shaded luminance into auto-exposure cameras
    /// (`white_point == 0`).
    pub track_exposure: bool,

    /// Color of wireframe overlay lines.
    pub wireframe_color: Color,

    /// Render shadow maps for spot lights that cast shadows.
    pub shadows: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            worker_count: None,
            screen_space_fog: true,
            track_exposure: true,
            wireframe_color: Color::rgb(0.1, 1.0, 0.3),
            shadows: true,
        }
    }
}

impl RendererSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Number of shading workers the pool is built with.
    #[must_use]
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count
            .filter(|&n| n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(usize::from))
            .unwrap_or(1)
    }
}
