//! Common types and descriptors for graphics resources.
//!
//! This module contains the closed vocabularies (formats, render state enums,
//! bit flags) and the descriptor structs shared between the [`Graphics`]
//! dispatcher and every backend.
//!
//! [`Graphics`]: crate::Graphics

mod blend;
mod common;
mod info;
mod shader;
mod state;
mod texture;
mod vertex;

pub use blend::{BlendFactor, BlendMask, BlendMode, BlendOp};
pub use common::{ClearMask, ClearValues, Color, Rect};
pub use info::{GraphicsInfo, GraphicsRenderer};
pub use shader::{ShaderData, ShaderStageFlags, UniformInfo, UniformType};
pub use state::{Compare, Cull};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
pub use vertex::{
    IndexFormat, VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic, VertexFormat,
};
