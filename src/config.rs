//! Device configuration.
//!
//! [`GraphicsConfig`] is consumed once by [`Graphics::init`](crate::Graphics::init)
//! to pick the backend and size the backbuffer. With the `serde` feature it can
//! be loaded from TOML.

use crate::types::GraphicsRenderer;

/// Startup configuration for a [`Graphics`](crate::Graphics) device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GraphicsConfig {
    /// Requested renderer. `None` picks the platform default.
    pub renderer: GraphicsRenderer,
    /// Backbuffer width in pixels.
    pub backbuffer_width: u32,
    /// Backbuffer height in pixels.
    pub backbuffer_height: u32,
    /// Largest texture dimension the built-in backend accepts.
    pub max_texture_size: u32,
    /// Whether the built-in backend advertises instancing.
    pub instancing: bool,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            renderer: GraphicsRenderer::None,
            backbuffer_width: 1280,
            backbuffer_height: 720,
            max_texture_size: 8192,
            instancing: true,
        }
    }
}

impl GraphicsConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a specific renderer.
    pub fn with_renderer(mut self, renderer: GraphicsRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Set the backbuffer size.
    pub fn with_backbuffer_size(mut self, width: u32, height: u32) -> Self {
        self.backbuffer_width = width;
        self.backbuffer_height = height;
        self
    }

    /// Set the texture size limit.
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = size;
        self
    }

    /// Enable or disable instancing support.
    pub fn with_instancing(mut self, instancing: bool) -> Self {
        self.instancing = instancing;
        self
    }
}

#[cfg(feature = "serde")]
mod toml_support {
    use std::path::Path;

    use super::GraphicsConfig;
    use crate::error::GraphicsError;

    impl GraphicsConfig {
        /// Parse a configuration from TOML. Missing keys keep their defaults.
        pub fn from_toml_str(content: &str) -> Result<Self, GraphicsError> {
            toml::from_str(content)
                .map_err(|e| GraphicsError::InvalidParameter(format!("bad graphics config: {e}")))
        }

        /// Load a configuration file, falling back to defaults if it does not exist.
        pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, GraphicsError> {
            let path = path.as_ref();
            if !path.exists() {
                log::info!("Graphics config not found at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        }
    }
}
