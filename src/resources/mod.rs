//! GPU resources.
//!
//! This module contains the resource types created by [`Graphics`]:
//! - [`Texture`] - GPU texture/image
//! - [`FrameBuffer`] - render target made of attachment textures
//! - [`Shader`] - compiled shader program with its uniform interface
//! - [`Material`] - shader plus parameter block
//! - [`Mesh`] - vertex, index and instance buffers
//!
//! Applications hold resources through [`ResourceRef`] handles. A handle is a
//! reference-counted pointer that may also be empty: failed creations return an
//! invalid handle instead of an error. The backend object is freed when the last
//! handle drops. Each resource holds a weak reference back to its device, so
//! handles outliving a shut down device simply report themselves invalid.
//!
//! [`Graphics`]: crate::Graphics

mod framebuffer;
mod material;
mod mesh;
mod shader;
mod texture;

use std::sync::Arc;

pub use framebuffer::FrameBuffer;
pub use material::Material;
pub use mesh::Mesh;
pub use shader::Shader;
pub use texture::Texture;

mod sealed {
    use crate::device::DeviceLink;

    pub trait Linked {
        fn link(&self) -> &DeviceLink;
    }
}

pub(crate) use sealed::Linked;

/// A resource owned by a backend.
pub trait GpuResource: sealed::Linked + Send + Sync {
    /// Returns false once the owning device has shut down.
    fn is_alive(&self) -> bool {
        self.link().is_alive()
    }
}

/// Shared-ownership, possibly invalid handle to a GPU resource.
///
/// Cloning a handle adds an owner. Two handles are equal when they point at the
/// same resource or are both empty.
pub struct ResourceRef<T>(Option<Arc<T>>);

pub type TextureRef = ResourceRef<Texture>;
pub type FrameBufferRef = ResourceRef<FrameBuffer>;
pub type ShaderRef = ResourceRef<Shader>;
pub type MaterialRef = ResourceRef<Material>;
pub type MeshRef = ResourceRef<Mesh>;

impl<T> ResourceRef<T> {
    /// An empty handle.
    pub const fn invalid() -> Self {
        Self(None)
    }

    pub(crate) fn new(resource: Arc<T>) -> Self {
        Self(Some(resource))
    }

    /// Returns true if both handles reference the same resource.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Borrow the resource even if its device has been shut down.
    pub(crate) fn resource(&self) -> Option<&T> {
        self.0.as_deref()
    }

    /// Number of handles sharing the resource (0 for an empty handle).
    pub fn owner_count(&self) -> usize {
        self.0.as_ref().map_or(0, Arc::strong_count)
    }
}

impl<T: GpuResource> ResourceRef<T> {
    /// Returns true if the handle references a resource whose device is alive.
    pub fn is_valid(&self) -> bool {
        self.0.as_ref().is_some_and(|r| r.is_alive())
    }

    /// Borrow the resource if the handle is valid.
    pub fn get(&self) -> Option<&T> {
        self.0.as_deref().filter(|r| r.is_alive())
    }

    /// Borrow the shared pointer if the handle is valid.
    pub fn arc(&self) -> Option<&Arc<T>> {
        self.0.as_ref().filter(|r| r.is_alive())
    }
}

impl<T> Clone for ResourceRef<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for ResourceRef<T> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl<T> PartialEq for ResourceRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for ResourceRef<T> {}

impl<T> From<Arc<T>> for ResourceRef<T> {
    fn from(resource: Arc<T>) -> Self {
        Self::new(resource)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ResourceRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(resource) => f.debug_tuple("ResourceRef").field(resource).finish(),
            None => write!(f, "ResourceRef(invalid)"),
        }
    }
}

static_assertions::assert_impl_all!(TextureRef: Send, Sync);
static_assertions::assert_impl_all!(MaterialRef: Send, Sync);
