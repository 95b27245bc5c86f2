//! Blend state.
//!
//! A [`BlendMode`] describes how a draw's output color and alpha combine with
//! what is already in the target framebuffer. It is a plain value: no
//! validation happens here, backends map (or refuse) factor/op combinations.

/// Blend operation for combining the weighted source and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOp {
    /// source + destination
    #[default]
    Add,
    /// source - destination
    Subtract,
    /// destination - source
    ReverseSubtract,
    /// min(source, destination)
    Min,
    /// max(source, destination)
    Max,
}

/// Blend factor applied to the source or destination term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    /// 0.0
    #[default]
    Zero,
    /// 1.0
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    /// Constant blend color ([`BlendMode::rgba`]).
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    /// min(source alpha, 1 - destination alpha)
    SrcAlphaSaturate,
    /// Second fragment output (dual-source blending).
    Src1Color,
    OneMinusSrc1Color,
    Src1Alpha,
    OneMinusSrc1Alpha,
}

bitflags::bitflags! {
    /// Color channels written by a draw.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlendMask: u32 {
        const RED = 1;
        const GREEN = 2;
        const BLUE = 4;
        const ALPHA = 8;
        const RGB = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
        const RGBA = Self::RGB.bits() | Self::ALPHA.bits();
    }
}

/// Color and alpha blend configuration for a draw.
///
/// Equality is structural over every field, which lets backends skip
/// redundant state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendMode {
    pub color_op: BlendOp,
    pub color_src: BlendFactor,
    pub color_dst: BlendFactor,
    pub alpha_op: BlendOp,
    pub alpha_src: BlendFactor,
    pub alpha_dst: BlendFactor,
    /// Channels that are written.
    pub mask: BlendMask,
    /// Constant blend color, packed `0xRRGGBBAA`.
    pub rgba: u32,
}

impl BlendMode {
    /// Premultiplied-alpha blending.
    pub const NORMAL: BlendMode =
        BlendMode::new(BlendOp::Add, BlendFactor::One, BlendFactor::OneMinusSrcAlpha);

    /// Subtracts the source from the destination.
    pub const SUBTRACT: BlendMode =
        BlendMode::new(BlendOp::ReverseSubtract, BlendFactor::One, BlendFactor::One);

    /// Same operation and factors for color and alpha, writing every channel
    /// with an opaque white constant color.
    pub const fn new(op: BlendOp, src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            color_op: op,
            color_src: src,
            color_dst: dst,
            alpha_op: op,
            alpha_src: src,
            alpha_dst: dst,
            mask: BlendMask::RGBA,
            rgba: 0xffffffff,
        }
    }

    /// Independent color and alpha blending with an explicit write mask and
    /// constant color.
    #[allow(clippy::too_many_arguments)]
    pub const fn with_channels(
        color_op: BlendOp,
        color_src: BlendFactor,
        color_dst: BlendFactor,
        alpha_op: BlendOp,
        alpha_src: BlendFactor,
        alpha_dst: BlendFactor,
        mask: BlendMask,
        rgba: u32,
    ) -> Self {
        Self {
            color_op,
            color_src,
            color_dst,
            alpha_op,
            alpha_src,
            alpha_dst,
            mask,
            rgba,
        }
    }

    /// Replace the write mask.
    pub const fn with_mask(mut self, mask: BlendMask) -> Self {
        self.mask = mask;
        self
    }

    /// Replace the constant blend color.
    pub const fn with_constant(mut self, rgba: u32) -> Self {
        self.rgba = rgba;
        self
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        Self::NORMAL
    }
}
