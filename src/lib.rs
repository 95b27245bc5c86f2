//! # gfx-device
//!
//! Thin hardware-rendering abstraction: one API for creating GPU resources and
//! submitting draws, independent of which native graphics backend is active.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Graphics`] - explicit device context with an init/use/shutdown lifecycle
//! - [`ResourceRef`] - shared-ownership, possibly invalid resource handles
//! - [`RenderCall`] - value description of one draw
//! - [`GraphicsBackend`] - capability interface native backends implement
//! - A CPU reference backend (feature `software`, on by default)
//!
//! ## Example
//!
//! ```
//! use gfx_device::{Graphics, GraphicsConfig, RenderCall};
//!
//! let mut graphics = Graphics::new();
//! graphics.init(&GraphicsConfig::new().with_backbuffer_size(32, 32)).unwrap();
//!
//! // A call with no mesh or material is rejected without touching the target.
//! let call = RenderCall { target: graphics.backbuffer(), ..Default::default() };
//! assert!(graphics.submit(&call).is_err());
//! ```

pub mod backend;
mod config;
mod device;
mod error;
mod render_call;
pub mod resources;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendError, BackendStats, DrawCommand, GraphicsBackend};
pub use config::GraphicsConfig;
pub use device::{DeviceState, Graphics, MAX_COLOR_ATTACHMENTS};
pub use error::GraphicsError;
pub use render_call::RenderCall;
pub use resources::{
    FrameBuffer, FrameBufferRef, GpuResource, Material, MaterialRef, Mesh, MeshRef, ResourceRef,
    Shader, ShaderRef, Texture, TextureRef,
};
pub use types::{
    BlendFactor, BlendMask, BlendMode, BlendOp, ClearMask, ClearValues, Color, Compare, Cull,
    GraphicsInfo, GraphicsRenderer, IndexFormat, Rect, ShaderData, ShaderStageFlags,
    TextureDescriptor, TextureFormat, TextureUsage, UniformInfo, UniformType, VertexAttribute,
    VertexAttributeFormat, VertexAttributeSemantic, VertexFormat,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
