use crate::color::Color;
use crate::resources::texture::TextureRef;
use crate::resources::volume::Volume;

/// What fills pixels no geometry covers.
#[derive(Debug, Clone)]
pub enum Background {
    Color(Color),
    /// Equirectangular sky, looked up by view direction.
    Sky(TextureRef),
}

impl Default for Background {
    fn default() -> Self {
        Self::Color(Color::BLACK)
    }
}

/// Scene-wide lighting inputs.
#[derive(Debug, Clone)]
pub struct Environment {
    pub ambient: Color,
    pub background: Background,
    /// Medium the camera sits in, used when a material has none of its own.
    pub fog: Option<Volume>,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ambient: Color::new(0.05, 0.05, 0.05, 0.0),
            background: Background::default(),
            fog: None,
        }
    }

    pub fn set_ambient(&mut self, color: Color) {
        self.ambient = color.with_alpha(0.0);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
