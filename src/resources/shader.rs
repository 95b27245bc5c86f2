//! Shader resource.

use crate::backend::ShaderId;
use crate::device::DeviceLink;
use crate::types::{ShaderData, UniformInfo};

use super::{GpuResource, Linked};

/// A compiled shader program.
///
/// Keeps the [`ShaderData`] it was built from so materials can lay out their
/// parameter blocks against the uniform interface.
pub struct Shader {
    link: DeviceLink,
    id: ShaderId,
    data: ShaderData,
}

impl Shader {
    pub(crate) fn new(link: DeviceLink, id: ShaderId, data: ShaderData) -> Self {
        Self { link, id, data }
    }

    /// Backend object id.
    pub fn id(&self) -> ShaderId {
        self.id
    }

    /// The description the shader was created from.
    pub fn data(&self) -> &ShaderData {
        &self.data
    }

    /// Declared uniforms in order.
    pub fn uniforms(&self) -> &[UniformInfo] {
        &self.data.uniforms
    }

    /// Look up a uniform by name.
    pub fn find_uniform(&self, name: &str) -> Option<&UniformInfo> {
        self.data.uniforms.iter().find(|u| u.name == name)
    }
}

impl Linked for Shader {
    fn link(&self) -> &DeviceLink {
        &self.link
    }
}

impl GpuResource for Shader {}

impl Drop for Shader {
    fn drop(&mut self) {
        if let Some(device) = self.link.live() {
            device.with_backend(|backend| backend.destroy_shader(self.id));
            log::trace!("Shader: released {:?}", self.id);
        }
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.id)
            .field("uniforms", &self.data.uniforms.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(Shader: Send, Sync);
