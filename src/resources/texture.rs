//! GPU texture resource.

use crate::backend::TextureId;
use crate::device::DeviceLink;
use crate::error::GraphicsError;
use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

use super::{GpuResource, Linked};

/// A GPU texture resource.
///
/// Textures are created by [`Graphics`](crate::Graphics) and shared through
/// [`TextureRef`](super::TextureRef) handles. The backend storage is released
/// when the last handle drops.
///
/// # Example
///
/// ```ignore
/// let texture = graphics.create_texture(256, 256, TextureFormat::Rgba8Unorm);
/// if let Some(texture) = texture.get() {
///     texture.set_data(&pixels)?;
/// }
/// ```
pub struct Texture {
    link: DeviceLink,
    id: TextureId,
    descriptor: TextureDescriptor,
}

impl Texture {
    pub(crate) fn new(link: DeviceLink, id: TextureId, descriptor: TextureDescriptor) -> Self {
        Self {
            link,
            id,
            descriptor,
        }
    }

    /// Backend object id.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Get the texture descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the texture width.
    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    /// Get the texture height.
    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    /// Get the texture format.
    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    /// Get the texture label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Returns true if the texture was created as a framebuffer attachment.
    pub fn is_framebuffer_attachment(&self) -> bool {
        self.descriptor
            .usage
            .contains(TextureUsage::RENDER_ATTACHMENT)
    }

    /// Replace the texture contents.
    ///
    /// `data` must hold exactly `width * height` pixels in the texture's format.
    pub fn set_data(&self, data: &[u8]) -> Result<(), GraphicsError> {
        let expected = self.descriptor.byte_size();
        if data.len() != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture data is {} bytes, expected {expected}",
                data.len()
            )));
        }
        let device = self.link.device()?;
        device.with_backend(|backend| backend.write_texture(self.id, data))?;
        Ok(())
    }

    /// Read back the texture contents in the texture's format.
    pub fn get_data(&self) -> Result<Vec<u8>, GraphicsError> {
        let device = self.link.device()?;
        let data = device.with_backend(|backend| backend.read_texture(self.id))?;
        Ok(data)
    }
}

impl Linked for Texture {
    fn link(&self) -> &DeviceLink {
        &self.link
    }
}

impl GpuResource for Texture {}

impl Drop for Texture {
    fn drop(&mut self) {
        if let Some(device) = self.link.live() {
            device.with_backend(|backend| backend.destroy_texture(self.id));
            log::trace!("Texture: released {:?}", self.id);
        }
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("width", &self.descriptor.width)
            .field("height", &self.descriptor.height)
            .field("format", &self.descriptor.format)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Texture is Send + Sync
static_assertions::assert_impl_all!(Texture: Send, Sync);
