//! GPU backend abstraction layer.
//!
//! This module provides the capability interface every backend implements,
//! allowing [`Graphics`](crate::Graphics) to route resource creation and draw
//! submission without knowing which native API is active.
//!
//! # Available Backends
//!
//! - `software` (default): CPU reference backend that stores textures in host
//!   memory and rasterizes triangles. It reports the configured
//!   [`GraphicsRenderer`] identity and follows that API's conventions.
//! - Native OpenGL / D3D11 / Metal backends live outside this crate and plug in
//!   through [`Graphics::init_with_backend`](crate::Graphics::init_with_backend).
//!
//! # Architecture
//!
//! Backends never see handles. The dispatcher validates a
//! [`RenderCall`](crate::RenderCall), resolves its defaults and hands the backend
//! a [`DrawCommand`] made only of opaque ids and plain values. Backend objects
//! are destroyed when the last handle referencing them drops, or all at once
//! through [`GraphicsBackend::shutdown`].

mod error;

#[cfg(feature = "software")]
pub mod software;

pub use error::{BackendError, BackendResult};

use crate::config::GraphicsConfig;
use crate::error::GraphicsError;
use crate::types::{
    BlendMode, ClearValues, Compare, Cull, GraphicsInfo, GraphicsRenderer, IndexFormat, Rect,
    ShaderData, TextureDescriptor, VertexFormat,
};

macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a backend-assigned value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The backend-assigned value.
            pub const fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

backend_id!(
    /// Backend object id of a texture.
    TextureId
);
backend_id!(
    /// Backend object id of a framebuffer.
    FrameBufferId
);
backend_id!(
    /// Backend object id of a compiled shader.
    ShaderId
);
backend_id!(
    /// Backend object id of a material parameter block.
    MaterialId
);
backend_id!(
    /// Backend object id of a mesh.
    MeshId
);

/// Live backend object counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BackendStats {
    pub textures: usize,
    pub framebuffers: usize,
    pub shaders: usize,
    pub materials: usize,
    pub meshes: usize,
}

impl BackendStats {
    /// Sum over every kind.
    pub fn total(&self) -> usize {
        self.textures + self.framebuffers + self.shaders + self.materials + self.meshes
    }
}

/// A fully resolved draw.
///
/// Built by the dispatcher after validation: every id refers to a live object
/// of the receiving backend, the viewport is resolved and the index range lies
/// inside the mesh's index buffer.
#[derive(Debug, Clone)]
pub struct DrawCommand<'a> {
    pub target: FrameBufferId,
    pub mesh: MeshId,
    pub shader: ShaderId,
    pub material: MaterialId,
    /// Material parameter block, laid out in the shader's uniform order.
    pub values: &'a [f32],
    /// One entry per `Texture2D` uniform in declaration order.
    pub textures: &'a [Option<TextureId>],
    pub viewport: Rect,
    pub scissor: Option<Rect>,
    pub index_start: u64,
    pub index_count: u64,
    pub instance_count: u64,
    pub depth: Compare,
    pub cull: Cull,
    pub blend: BlendMode,
}

/// GPU backend trait for abstracting different graphics APIs.
///
/// Every call is synchronous: when it returns, the requested work has been
/// issued (or has failed). Calls arrive in the order the application made them.
pub trait GraphicsBackend: Send + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// The native API this backend drives.
    fn renderer(&self) -> GraphicsRenderer;

    /// Capability snapshot.
    fn info(&self) -> GraphicsInfo;

    // Textures

    /// Allocate texture storage.
    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> BackendResult<TextureId>;

    /// Replace the full contents of a texture. `data` matches the format's layout.
    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> BackendResult<()>;

    /// Read back the full contents of a texture.
    fn read_texture(&mut self, texture: TextureId) -> BackendResult<Vec<u8>>;

    /// Free a texture.
    fn destroy_texture(&mut self, texture: TextureId);

    // Framebuffers

    /// Bind existing textures together as a render target.
    fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
        attachments: &[TextureId],
    ) -> BackendResult<FrameBufferId>;

    /// Free a framebuffer. Its attachment textures are destroyed separately.
    fn destroy_framebuffer(&mut self, framebuffer: FrameBufferId);

    // Shaders and materials

    /// Compile and link the shader stages.
    fn create_shader(&mut self, data: &ShaderData) -> BackendResult<ShaderId>;

    /// Free a shader.
    fn destroy_shader(&mut self, shader: ShaderId);

    /// Allocate the parameter storage for a material using `shader`.
    fn create_material(&mut self, shader: ShaderId) -> BackendResult<MaterialId>;

    /// Free a material.
    fn destroy_material(&mut self, material: MaterialId);

    // Meshes

    /// Allocate an empty mesh.
    fn create_mesh(&mut self) -> BackendResult<MeshId>;

    /// Replace the vertex buffer.
    fn write_mesh_vertices(
        &mut self,
        mesh: MeshId,
        format: &VertexFormat,
        data: &[u8],
    ) -> BackendResult<()>;

    /// Replace the index buffer.
    fn write_mesh_indices(
        &mut self,
        mesh: MeshId,
        format: IndexFormat,
        data: &[u8],
    ) -> BackendResult<()>;

    /// Replace the per-instance buffer.
    fn write_mesh_instances(
        &mut self,
        mesh: MeshId,
        format: &VertexFormat,
        data: &[u8],
    ) -> BackendResult<()>;

    /// Free a mesh.
    fn destroy_mesh(&mut self, mesh: MeshId);

    // Submission

    /// Apply the draw's state and issue it immediately.
    fn render(&mut self, command: &DrawCommand<'_>) -> BackendResult<()>;

    /// Clear the selected planes of a framebuffer.
    fn clear(&mut self, target: FrameBufferId, values: &ClearValues) -> BackendResult<()>;

    // Lifecycle

    /// Live object counts.
    fn stats(&self) -> BackendStats;

    /// Free every object. No other call follows.
    fn shutdown(&mut self);
}

/// Selects and creates the backend requested by `config`.
///
/// `GraphicsRenderer::None` picks the platform default.
pub fn create_backend(config: &GraphicsConfig) -> Result<Box<dyn GraphicsBackend>, GraphicsError> {
    let renderer = match config.renderer {
        GraphicsRenderer::None => GraphicsRenderer::platform_default(),
        GraphicsRenderer::Count => {
            return Err(GraphicsError::InvalidParameter(
                "GraphicsRenderer::Count is not a renderer".to_string(),
            ));
        }
        renderer => renderer,
    };

    #[cfg(feature = "software")]
    {
        log::info!("Using software backend ({} conventions)", renderer.name());
        Ok(Box::new(software::SoftwareBackend::new(renderer, config)))
    }

    #[cfg(not(feature = "software"))]
    {
        Err(GraphicsError::InitializationFailed(format!(
            "no built-in backend for {}; provide one through Graphics::init_with_backend",
            renderer.name()
        )))
    }
}

/// Check if a built-in backend is compiled in.
pub fn has_builtin_backend() -> bool {
    cfg!(feature = "software")
}
