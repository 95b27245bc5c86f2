//! Framebuffer (render target) resource.

use crate::backend::FrameBufferId;
use crate::device::DeviceLink;

use super::{GpuResource, Linked, TextureRef};

/// A render target made of one or more attachment textures.
///
/// The framebuffer shares ownership of its attachments: the application can
/// keep an attachment (e.g. to sample it later) after dropping the framebuffer.
pub struct FrameBuffer {
    link: DeviceLink,
    id: FrameBufferId,
    width: u32,
    height: u32,
    attachments: Vec<TextureRef>,
}

impl FrameBuffer {
    pub(crate) fn new(
        link: DeviceLink,
        id: FrameBufferId,
        width: u32,
        height: u32,
        attachments: Vec<TextureRef>,
    ) -> Self {
        Self {
            link,
            id,
            width,
            height,
            attachments,
        }
    }

    /// Backend object id.
    pub fn id(&self) -> FrameBufferId {
        self.id
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// All attachments in creation order.
    pub fn attachments(&self) -> &[TextureRef] {
        &self.attachments
    }

    /// The attachment at `index`, or an invalid handle.
    pub fn attachment(&self, index: usize) -> TextureRef {
        self.attachments.get(index).cloned().unwrap_or_default()
    }

    /// Color attachments in creation order.
    pub fn color_attachments(&self) -> impl Iterator<Item = &TextureRef> {
        self.attachments
            .iter()
            .filter(|t| t.get().is_some_and(|t| t.format().is_color()))
    }

    /// The depth/stencil attachment, if any.
    pub fn depth_attachment(&self) -> Option<&TextureRef> {
        self.attachments
            .iter()
            .find(|t| t.get().is_some_and(|t| t.format().is_depth_stencil()))
    }

    /// Returns true if the framebuffer has a depth/stencil attachment.
    pub fn has_depth(&self) -> bool {
        self.depth_attachment().is_some()
    }
}

impl Linked for FrameBuffer {
    fn link(&self) -> &DeviceLink {
        &self.link
    }
}

impl GpuResource for FrameBuffer {}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        // Attachments are released after this, when the field drops.
        if let Some(device) = self.link.live() {
            device.with_backend(|backend| backend.destroy_framebuffer(self.id));
            log::trace!("FrameBuffer: released {:?}", self.id);
        }
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("attachments", &self.attachments.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(FrameBuffer: Send, Sync);
