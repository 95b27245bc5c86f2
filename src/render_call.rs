//! Draw description.

use crate::resources::{FrameBufferRef, MaterialRef, MeshRef};
use crate::types::{BlendMode, Compare, Cull, Rect};

/// Everything needed to issue one draw.
///
/// A `RenderCall` is a plain value: cloning it only bumps the reference counts
/// of its three handles. The default call references nothing and draws zero
/// indices, so it is rejected by [`Graphics::submit`](crate::Graphics::submit)
/// until a target, mesh and material are filled in.
///
/// Defaults: no viewport override (the whole target), no scissor, one
/// instance, `Compare::LessOrEqual` depth test, back-face culling and
/// [`BlendMode::NORMAL`].
///
/// # Example
///
/// ```ignore
/// let call = RenderCall::new(graphics.backbuffer(), mesh, material)
///     .with_scissor(Rect::new(0.0, 0.0, 64.0, 64.0))
///     .with_cull(Cull::NONE);
/// graphics.render(&call);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    pub target: FrameBufferRef,
    pub mesh: MeshRef,
    pub material: MaterialRef,
    /// Viewport in target pixels. `None` covers the whole target.
    pub viewport: Option<Rect>,
    /// Scissor rectangle in target pixels. `None` disables the scissor test.
    pub scissor: Option<Rect>,
    pub index_start: u64,
    pub index_count: u64,
    pub instance_count: u64,
    pub depth: Compare,
    pub cull: Cull,
    pub blend: BlendMode,
}

impl Default for RenderCall {
    fn default() -> Self {
        Self {
            target: FrameBufferRef::invalid(),
            mesh: MeshRef::invalid(),
            material: MaterialRef::invalid(),
            viewport: None,
            scissor: None,
            index_start: 0,
            index_count: 0,
            instance_count: 1,
            depth: Compare::LessOrEqual,
            cull: Cull::BACK,
            blend: BlendMode::NORMAL,
        }
    }
}

impl RenderCall {
    /// A call drawing the whole index buffer of `mesh` into `target`.
    pub fn new(target: FrameBufferRef, mesh: MeshRef, material: MaterialRef) -> Self {
        let index_count = mesh.get().map_or(0, |m| m.index_count());
        Self {
            target,
            mesh,
            material,
            index_count,
            ..Self::default()
        }
    }

    pub fn with_viewport(mut self, viewport: Rect) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn with_scissor(mut self, scissor: Rect) -> Self {
        self.scissor = Some(scissor);
        self
    }

    /// Draw `count` indices starting at `start`.
    pub fn with_index_range(mut self, start: u64, count: u64) -> Self {
        self.index_start = start;
        self.index_count = count;
        self
    }

    pub fn with_instances(mut self, count: u64) -> Self {
        self.instance_count = count;
        self
    }

    pub fn with_depth(mut self, depth: Compare) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_cull(mut self, cull: Cull) -> Self {
        self.cull = cull;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}
