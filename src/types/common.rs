//! Common types shared across the graphics system.

use glam::Vec4;

// ============================================================================
// Rect
// ============================================================================

/// Axis-aligned rectangle in framebuffer pixels.
///
/// Used for render call viewports and scissor rectangles. Coordinates follow
/// the active backend's framebuffer origin (see
/// [`GraphicsInfo::origin_bottom_left`](crate::GraphicsInfo::origin_bottom_left)).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X coordinate of the origin corner.
    pub x: f32,
    /// Y coordinate of the origin corner.
    pub y: f32,
    /// Width of the rectangle.
    pub w: f32,
    /// Height of the rectangle.
    pub h: f32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Create a rectangle from dimensions with origin at (0, 0).
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Far edge along Y (exclusive).
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Returns true if the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Overlap of two rectangles. Disjoint rectangles yield an empty rect.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Rect::new(x, y, (right - x).max(0.0), (bottom - y).max(0.0))
    }
}

// ============================================================================
// Color
// ============================================================================

/// 8-bit RGBA color.
///
/// The packed form used throughout the API is `0xRRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0, 255);
    pub const GREEN: Color = Color::new(0, 255, 0, 255);
    pub const BLUE: Color = Color::new(0, 0, 255, 255);

    /// Create a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack a `0xRRGGBBAA` value.
    pub const fn from_rgba(rgba: u32) -> Self {
        Self {
            r: (rgba >> 24) as u8,
            g: (rgba >> 16) as u8,
            b: (rgba >> 8) as u8,
            a: rgba as u8,
        }
    }

    /// Pack into `0xRRGGBBAA`.
    pub const fn to_rgba(self) -> u32 {
        ((self.r as u32) << 24) | ((self.g as u32) << 16) | ((self.b as u32) << 8) | self.a as u32
    }

    /// Normalized channels in `[0, 1]`.
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r as f32, self.g as f32, self.b as f32, self.a as f32) / 255.0
    }

    /// Quantize normalized channels, clamping to `[0, 1]`.
    pub fn from_vec4(v: Vec4) -> Self {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(v.x), q(v.y), q(v.z), q(v.w))
    }
}

// ============================================================================
// Clear
// ============================================================================

bitflags::bitflags! {
    /// Which framebuffer planes a clear touches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

/// Values used by [`Graphics::clear_with`](crate::Graphics::clear_with).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    /// Packed `0xRRGGBBAA` color for every color attachment.
    pub color: u32,
    /// Depth value for the depth attachment.
    pub depth: f32,
    /// Stencil value for the stencil plane.
    pub stencil: u8,
    /// Planes to clear.
    pub mask: ClearMask,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            color: 0x000000ff,
            depth: 1.0,
            stencil: 0,
            mask: ClearMask::ALL,
        }
    }
}

impl ClearValues {
    /// Clear only the color attachments.
    pub fn color(rgba: u32) -> Self {
        Self {
            color: rgba,
            mask: ClearMask::COLOR,
            ..Self::default()
        }
    }

    /// Clear only the depth plane.
    pub fn depth(depth: f32) -> Self {
        Self {
            depth,
            mask: ClearMask::DEPTH,
            ..Self::default()
        }
    }
}
