//! Backend identity and capability queries.

/// Identifies the native graphics API behind the active device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum GraphicsRenderer {
    /// No initialized device.
    #[default]
    None = -1,
    OpenGL = 0,
    D3D11 = 1,
    Metal = 2,
    /// Number of concrete renderers; never active.
    Count = 3,
}

impl GraphicsRenderer {
    /// The renderer a device picks on this platform when none is requested.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "windows") {
            Self::D3D11
        } else if cfg!(any(target_os = "macos", target_os = "ios")) {
            Self::Metal
        } else {
            Self::OpenGL
        }
    }

    /// Returns true for OpenGL, D3D11 and Metal.
    pub fn is_concrete(self) -> bool {
        matches!(self, Self::OpenGL | Self::D3D11 | Self::Metal)
    }

    /// Human readable API name.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::OpenGL => "OpenGL",
            Self::D3D11 => "D3D11",
            Self::Metal => "Metal",
            Self::Count => "Count",
        }
    }
}

/// Capability snapshot of the active backend.
///
/// Filled in by the backend at initialization and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GraphicsInfo {
    /// Whether instanced draws (`instance_count > 1`) are supported.
    pub instancing: bool,
    /// Whether framebuffer and texture row 0 is the bottom row.
    pub origin_bottom_left: bool,
    /// Largest supported texture dimension.
    pub max_texture_size: u32,
}
