//! Vertex and index layout definitions for meshes.
//!
//! A mesh owns a single interleaved vertex buffer, an optional per-instance
//! buffer and an index buffer. [`VertexFormat`] describes how one element of
//! the vertex (or instance) buffer is laid out.
//!
//! # Example
//!
//! ```
//! use gfx_device::{VertexAttributeFormat, VertexAttributeSemantic, VertexFormat};
//!
//! // float2 position followed by an unorm8x4 color: 12 bytes per vertex
//! let format = VertexFormat::new()
//!     .with_attribute(VertexAttributeSemantic::Position, VertexAttributeFormat::Float2)
//!     .with_attribute(VertexAttributeSemantic::Color, VertexAttributeFormat::Unorm8x4);
//! assert_eq!(format.stride, 12);
//! ```

/// Semantic meaning of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeSemantic {
    /// Vertex position (float2, float3 or float4).
    Position,
    /// Vertex normal.
    Normal,
    /// Texture coordinates set 0 (typically float2).
    TexCoord0,
    /// Vertex color (float4 or unorm8x4).
    Color,
}

/// Format of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeFormat {
    /// Single 32-bit float.
    Float,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Four 8-bit unsigned integers (normalized to 0.0-1.0).
    Unorm8x4,
}

impl VertexAttributeFormat {
    /// Get the size in bytes of this format.
    pub fn size(&self) -> u32 {
        match self {
            Self::Float => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::Unorm8x4 => 4,
        }
    }

    /// Number of components.
    pub fn components(&self) -> usize {
        match self {
            Self::Float => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 | Self::Unorm8x4 => 4,
        }
    }
}

/// A single vertex attribute description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Semantic meaning of this attribute.
    pub semantic: VertexAttributeSemantic,
    /// Data format of this attribute.
    pub format: VertexAttributeFormat,
    /// Byte offset within one vertex.
    pub offset: u32,
}

/// Layout of one element of a vertex or instance buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexFormat {
    /// Attributes in declaration order.
    pub attributes: Vec<VertexAttribute>,
    /// Stride in bytes between consecutive elements.
    pub stride: u32,
}

impl VertexFormat {
    /// Create an empty format.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tightly packed attribute; the stride grows to fit it.
    pub fn with_attribute(
        mut self,
        semantic: VertexAttributeSemantic,
        format: VertexAttributeFormat,
    ) -> Self {
        let offset = self.stride;
        self.attributes.push(VertexAttribute {
            semantic,
            format,
            offset,
        });
        self.stride += format.size();
        self
    }

    /// Override the stride (for padded layouts).
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    /// Find the first attribute with the given semantic.
    pub fn attribute(&self, semantic: VertexAttributeSemantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.semantic == semantic)
    }

    /// Returns true when every attribute fits inside the stride.
    pub fn is_valid(&self) -> bool {
        self.stride > 0
            && self
                .attributes
                .iter()
                .all(|a| {
                    a.offset
                        .checked_add(a.format.size())
                        .is_some_and(|end| end <= self.stride)
                })
    }
}

/// Format of the index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    #[default]
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub fn size(&self) -> u32 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}
