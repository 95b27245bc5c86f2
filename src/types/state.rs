//! Depth and rasterizer state vocabularies.

/// Depth comparison function.
///
/// [`Compare::None`] disables the depth test entirely, including depth writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compare {
    #[default]
    None,
    Always,
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
}

impl Compare {
    /// Evaluate `incoming <op> stored`.
    ///
    /// `None` passes everything; callers decide whether to write depth.
    pub fn passes(self, incoming: f32, stored: f32) -> bool {
        match self {
            Self::None | Self::Always => true,
            Self::Never => false,
            Self::Less => incoming < stored,
            Self::Equal => incoming == stored,
            Self::LessOrEqual => incoming <= stored,
            Self::Greater => incoming > stored,
            Self::NotEqual => incoming != stored,
            Self::GreaterOrEqual => incoming >= stored,
        }
    }
}

bitflags::bitflags! {
    /// Faces discarded by the rasterizer.
    ///
    /// Front faces wind counter-clockwise in normalized device coordinates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Cull: u32 {
        const NONE = 0;
        const FRONT = 1;
        const BACK = 2;
        const BOTH = Self::FRONT.bits() | Self::BACK.bits();
    }
}

impl Default for Cull {
    fn default() -> Self {
        Self::BACK
    }
}
