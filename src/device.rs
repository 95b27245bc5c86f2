//! Graphics device dispatcher.
//!
//! The [`Graphics`] context owns the active backend and is the only way to
//! create resources and submit draws. It has an explicit lifecycle:
//!
//! ```text
//! Uninitialized --init--> Initialized --shutdown--> ShuttingDown --> Destroyed
//! ```
//!
//! Resources keep a weak link to the backend they were created on. Shutting the
//! device down flips that link dead, so every outstanding handle reports itself
//! invalid and no resource ever frees into a destroyed backend.

use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::backend::{self, BackendStats, DrawCommand, GraphicsBackend, TextureId};
use crate::config::GraphicsConfig;
use crate::error::GraphicsError;
use crate::render_call::RenderCall;
use crate::resources::{
    FrameBuffer, FrameBufferRef, GpuResource, Linked, Material, MaterialRef, Mesh, MeshRef,
    ResourceRef, Shader, ShaderRef, Texture, TextureRef,
};
use crate::types::{
    ClearValues, GraphicsInfo, GraphicsRenderer, Rect, ShaderData, TextureDescriptor,
    TextureFormat,
};

/// Most color attachments a framebuffer may have.
pub const MAX_COLOR_ATTACHMENTS: usize = 4;

/// Lifecycle state of a [`Graphics`] device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceState {
    #[default]
    Uninitialized,
    Initialized,
    ShuttingDown,
    Destroyed,
}

/// State shared between the device and the resources it created.
pub(crate) struct DeviceShared {
    backend: Mutex<Box<dyn GraphicsBackend>>,
    alive: AtomicBool,
}

impl DeviceShared {
    /// Run `f` with exclusive access to the backend.
    ///
    /// The lock is not reentrant: `f` must not drop resource handles.
    pub(crate) fn with_backend<R>(&self, f: impl FnOnce(&mut dyn GraphicsBackend) -> R) -> R {
        let mut backend = self.backend.lock();
        f(backend.as_mut())
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Weak link from a resource back to the device that created it.
pub struct DeviceLink(Weak<DeviceShared>);

impl DeviceLink {
    pub(crate) fn new(device: &Arc<DeviceShared>) -> Self {
        Self(Arc::downgrade(device))
    }

    /// A link to no device, for resources built outside a device in tests.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self(Weak::new())
    }

    /// The device, if it has not been shut down.
    pub(crate) fn live(&self) -> Option<Arc<DeviceShared>> {
        self.0.upgrade().filter(|device| device.is_alive())
    }

    /// Like [`live`](Self::live), as an error for operations that need the backend.
    pub(crate) fn device(&self) -> Result<Arc<DeviceShared>, GraphicsError> {
        self.live()
            .ok_or_else(|| GraphicsError::InvalidResource("device has been shut down".to_string()))
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.upgrade().is_some_and(|device| device.is_alive())
    }

    /// Returns true if the resource was created on `device`.
    pub(crate) fn belongs_to(&self, device: &Arc<DeviceShared>) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(device))
    }
}

/// Collapse a failed creation into an invalid handle.
fn or_invalid<T>(result: Result<ResourceRef<T>, GraphicsError>, what: &str) -> ResourceRef<T> {
    result.unwrap_or_else(|e| {
        log::warn!("Graphics: {what} failed: {e}");
        ResourceRef::invalid()
    })
}

/// Borrow a handle's resource, checking that it lives on `device`.
fn resolve<'a, T: GpuResource>(
    handle: &'a ResourceRef<T>,
    device: &Arc<DeviceShared>,
    what: &str,
) -> Result<&'a T, GraphicsError> {
    let resource = handle
        .get()
        .ok_or_else(|| GraphicsError::InvalidResource(format!("{what} is invalid")))?;
    if !resource.link().belongs_to(device) {
        return Err(GraphicsError::InvalidResource(format!(
            "{what} belongs to another device"
        )));
    }
    Ok(resource)
}

/// Check the uniform interface before any backend sees it.
///
/// Materials size their parameter block from this list, so names must be
/// unique and every uniform needs at least one element and one stage.
fn validate_uniforms(data: &ShaderData) -> Result<(), GraphicsError> {
    for (index, uniform) in data.uniforms.iter().enumerate() {
        if data.uniforms[..index].iter().any(|u| u.name == uniform.name) {
            return Err(GraphicsError::InvalidParameter(format!(
                "uniform '{}' is declared twice",
                uniform.name
            )));
        }
        if uniform.array_length == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "uniform '{}' has an array length of 0",
                uniform.name
            )));
        }
        if uniform.stages.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "uniform '{}' is not visible to any stage",
                uniform.name
            )));
        }
    }
    Ok(())
}

/// The graphics device.
///
/// Owns exactly one backend, chosen at [`init`](Self::init) and fixed until
/// [`shutdown`](Self::shutdown). Factories never fail loudly: on any error they
/// log a warning and return an invalid handle. Draws are executed synchronously
/// in call order.
///
/// # Example
///
/// ```
/// use gfx_device::{Graphics, GraphicsConfig, GraphicsRenderer};
///
/// let mut graphics = Graphics::new();
/// assert_eq!(graphics.renderer(), GraphicsRenderer::None);
///
/// graphics.init(&GraphicsConfig::new().with_backbuffer_size(64, 64)).unwrap();
/// assert!(graphics.backbuffer().is_valid());
/// graphics.clear(&graphics.backbuffer(), 0xff0000ff);
///
/// graphics.shutdown();
/// assert!(!graphics.backbuffer().is_valid());
/// ```
pub struct Graphics {
    state: DeviceState,
    shared: Option<Arc<DeviceShared>>,
    backend_name: &'static str,
    renderer: GraphicsRenderer,
    info: GraphicsInfo,
    backbuffer: FrameBufferRef,
}

impl Default for Graphics {
    fn default() -> Self {
        Self::new()
    }
}

impl Graphics {
    /// Create an uninitialized device.
    pub fn new() -> Self {
        Self {
            state: DeviceState::Uninitialized,
            shared: None,
            backend_name: "none",
            renderer: GraphicsRenderer::None,
            info: GraphicsInfo::default(),
            backbuffer: FrameBufferRef::invalid(),
        }
    }

    /// Select the backend requested by `config` and bring the device up.
    ///
    /// # Errors
    ///
    /// Fails if the device was already initialized (or shut down), or if no
    /// backend can be created for the requested renderer.
    pub fn init(&mut self, config: &GraphicsConfig) -> Result<(), GraphicsError> {
        self.expect_uninitialized()?;
        let backend = backend::create_backend(config)?;
        self.init_with_backend(backend, config)
    }

    /// Bring the device up on an externally provided backend.
    ///
    /// `config` still sizes the backbuffer; the renderer it names is ignored
    /// in favour of the backend's own.
    pub fn init_with_backend(
        &mut self,
        backend: Box<dyn GraphicsBackend>,
        config: &GraphicsConfig,
    ) -> Result<(), GraphicsError> {
        self.expect_uninitialized()?;

        let renderer = backend.renderer();
        if !renderer.is_concrete() {
            return Err(GraphicsError::InitializationFailed(format!(
                "backend '{}' reports renderer {}",
                backend.name(),
                renderer.name()
            )));
        }

        self.backend_name = backend.name();
        self.renderer = renderer;
        self.info = backend.info();
        self.shared = Some(Arc::new(DeviceShared {
            backend: Mutex::new(backend),
            alive: AtomicBool::new(true),
        }));
        self.state = DeviceState::Initialized;

        let formats = [TextureFormat::Rgba8Unorm, TextureFormat::Depth24PlusStencil8];
        match self.try_create_framebuffer(
            config.backbuffer_width,
            config.backbuffer_height,
            &formats,
        ) {
            Ok(backbuffer) => self.backbuffer = backbuffer,
            Err(e) => {
                self.teardown();
                self.state = DeviceState::Uninitialized;
                return Err(GraphicsError::InitializationFailed(format!(
                    "backbuffer creation failed: {e}"
                )));
            }
        }

        log::info!(
            "gfx-device v{} initialized: {} backend as {} ({}x{} backbuffer)",
            crate::VERSION,
            self.backend_name,
            renderer.name(),
            config.backbuffer_width,
            config.backbuffer_height
        );
        Ok(())
    }

    fn expect_uninitialized(&self) -> Result<(), GraphicsError> {
        match self.state {
            DeviceState::Uninitialized => Ok(()),
            state => Err(GraphicsError::InvalidState(format!(
                "init requires an uninitialized device, device is {state:?}"
            ))),
        }
    }

    /// Free every backend object and invalidate all outstanding handles.
    ///
    /// Does nothing unless the device is initialized. Called on drop.
    pub fn shutdown(&mut self) {
        if self.state != DeviceState::Initialized {
            return;
        }
        self.state = DeviceState::ShuttingDown;

        let stats = self.stats();
        log::info!(
            "Graphics: shutting down {} backend ({} live objects)",
            self.backend_name,
            stats.total()
        );

        self.teardown();
        self.state = DeviceState::Destroyed;
    }

    fn teardown(&mut self) {
        // The backbuffer goes first so its objects are freed normally.
        self.backbuffer = FrameBufferRef::invalid();
        if let Some(shared) = self.shared.take() {
            shared.alive.store(false, Ordering::Release);
            shared.with_backend(|backend| backend.shutdown());
        }
        self.backend_name = "none";
        self.renderer = GraphicsRenderer::None;
        self.info = GraphicsInfo::default();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Returns true between a successful `init` and `shutdown`.
    pub fn is_initialized(&self) -> bool {
        self.state == DeviceState::Initialized
    }

    /// Capabilities of the active backend. All false/zero when not initialized.
    pub fn info(&self) -> &GraphicsInfo {
        &self.info
    }

    /// The active renderer, `None` when not initialized.
    pub fn renderer(&self) -> GraphicsRenderer {
        self.renderer
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// The default render target created at init.
    pub fn backbuffer(&self) -> FrameBufferRef {
        self.backbuffer.clone()
    }

    /// Live backend object counts.
    pub fn stats(&self) -> BackendStats {
        self.shared
            .as_ref()
            .map(|device| device.with_backend(|backend| backend.stats()))
            .unwrap_or_default()
    }

    fn device(&self) -> Result<&Arc<DeviceShared>, GraphicsError> {
        match (&self.state, &self.shared) {
            (DeviceState::Initialized, Some(device)) => Ok(device),
            _ => Err(GraphicsError::NotInitialized),
        }
    }

    // Textures

    /// Create a texture from a decoded RGBA image.
    pub fn create_texture_from_image(&self, image: &image::RgbaImage) -> TextureRef {
        or_invalid(
            self.try_create_texture_from_image(image, None),
            "create_texture_from_image",
        )
    }

    /// Create an `Rgba8Unorm` texture from tightly packed pixels.
    ///
    /// `pixels` must be exactly `width * height * 4` bytes.
    pub fn create_texture_from_rgba(&self, width: u32, height: u32, pixels: &[u8]) -> TextureRef {
        let descriptor = TextureDescriptor::new_2d(width, height, TextureFormat::Rgba8Unorm);
        or_invalid(
            self.try_create_texture(descriptor, Some(pixels)),
            "create_texture_from_rgba",
        )
    }

    /// Create an uninitialized texture.
    pub fn create_texture(&self, width: u32, height: u32, format: TextureFormat) -> TextureRef {
        let descriptor = TextureDescriptor::new_2d(width, height, format);
        or_invalid(self.try_create_texture(descriptor, None), "create_texture")
    }

    /// Decode an encoded image (PNG, JPEG, ...) from a byte stream.
    pub fn create_texture_from_reader<R: Read>(&self, mut reader: R) -> TextureRef {
        let result = self.device().and_then(|_| {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            let image = image::load_from_memory(&bytes)?.to_rgba8();
            self.try_create_texture_from_image(&image, None)
        });
        or_invalid(result, "create_texture_from_reader")
    }

    /// Load and decode an image file.
    pub fn create_texture_from_file<P: AsRef<Path>>(&self, path: P) -> TextureRef {
        let path = path.as_ref();
        let result = self.device().and_then(|_| {
            let image = image::open(path)?.to_rgba8();
            self.try_create_texture_from_image(&image, Some(path.display().to_string()))
        });
        or_invalid(result, "create_texture_from_file")
    }

    fn try_create_texture_from_image(
        &self,
        image: &image::RgbaImage,
        label: Option<String>,
    ) -> Result<TextureRef, GraphicsError> {
        let mut descriptor =
            TextureDescriptor::new_2d(image.width(), image.height(), TextureFormat::Rgba8Unorm);
        if let Some(label) = label {
            descriptor = descriptor.with_label(label);
        }
        self.try_create_texture(descriptor, Some(image.as_raw()))
    }

    fn try_create_texture(
        &self,
        descriptor: TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<TextureRef, GraphicsError> {
        let device = self.device()?;

        let max = self.info.max_texture_size;
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture size {}x{} has a zero dimension",
                descriptor.width, descriptor.height
            )));
        }
        if descriptor.width > max || descriptor.height > max {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture size {}x{} exceeds maximum {max}",
                descriptor.width, descriptor.height
            )));
        }

        let id = device.with_backend(|backend| backend.create_texture(&descriptor))?;
        let texture = Arc::new(Texture::new(DeviceLink::new(device), id, descriptor));
        if let Some(data) = data {
            texture.set_data(data)?;
        }

        log::trace!(
            "Graphics: created texture {:?} {}x{} {:?}",
            id,
            texture.width(),
            texture.height(),
            texture.format()
        );
        Ok(ResourceRef::new(texture))
    }

    // Framebuffers

    /// Create a render target with one `Rgba8Unorm` color attachment.
    pub fn create_framebuffer(&self, width: u32, height: u32) -> FrameBufferRef {
        self.create_framebuffer_with_attachments(width, height, &[TextureFormat::Rgba8Unorm])
    }

    /// Create a render target with one attachment per entry of `formats`.
    ///
    /// Needs at least one attachment, at most [`MAX_COLOR_ATTACHMENTS`] color
    /// attachments and at most one depth/stencil attachment.
    pub fn create_framebuffer_with_attachments(
        &self,
        width: u32,
        height: u32,
        formats: &[TextureFormat],
    ) -> FrameBufferRef {
        or_invalid(
            self.try_create_framebuffer(width, height, formats),
            "create_framebuffer",
        )
    }

    fn try_create_framebuffer(
        &self,
        width: u32,
        height: u32,
        formats: &[TextureFormat],
    ) -> Result<FrameBufferRef, GraphicsError> {
        let device = self.device()?;

        if formats.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "a framebuffer needs at least one attachment".to_string(),
            ));
        }
        let depth_count = formats.iter().filter(|f| f.is_depth_stencil()).count();
        let color_count = formats.len() - depth_count;
        if color_count > MAX_COLOR_ATTACHMENTS {
            return Err(GraphicsError::InvalidParameter(format!(
                "{color_count} color attachments exceed the limit of {MAX_COLOR_ATTACHMENTS}"
            )));
        }
        if depth_count > 1 {
            return Err(GraphicsError::InvalidParameter(format!(
                "{depth_count} depth attachments, at most one is allowed"
            )));
        }

        let mut attachments = Vec::with_capacity(formats.len());
        for (index, &format) in formats.iter().enumerate() {
            let descriptor = TextureDescriptor::attachment(width, height, format)
                .with_label(format!("attachment {index}"));
            attachments.push(self.try_create_texture(descriptor, None)?);
        }
        let ids: Vec<TextureId> = attachments
            .iter()
            .filter_map(|texture| texture.get().map(Texture::id))
            .collect();

        let id = device.with_backend(|backend| backend.create_framebuffer(width, height, &ids))?;
        log::trace!(
            "Graphics: created framebuffer {:?} {}x{} with {} attachments",
            id,
            width,
            height,
            ids.len()
        );
        Ok(ResourceRef::new(Arc::new(FrameBuffer::new(
            DeviceLink::new(device),
            id,
            width,
            height,
            attachments,
        ))))
    }

    // Shaders, materials and meshes

    /// Compile a shader.
    ///
    /// Invalid if the uniform interface is malformed (duplicate names, zero
    /// array length, no stage) or if the backend rejects the sources.
    pub fn create_shader(&self, data: &ShaderData) -> ShaderRef {
        let result = self.device().and_then(|device| {
            validate_uniforms(data)?;
            let id = device.with_backend(|backend| backend.create_shader(data))?;
            log::trace!("Graphics: created shader {:?}", id);
            Ok(ResourceRef::new(Arc::new(Shader::new(
                DeviceLink::new(device),
                id,
                data.clone(),
            ))))
        });
        or_invalid(result, "create_shader")
    }

    /// Create a material drawing with `shader`.
    ///
    /// Invalid if `shader` is invalid or was created on another device. The
    /// material keeps the shader alive.
    pub fn create_material(&self, shader: &ShaderRef) -> MaterialRef {
        let result = self.device().and_then(|device| {
            let shader_id = resolve(shader, device, "material shader")?.id();
            let id = device.with_backend(|backend| backend.create_material(shader_id))?;
            log::trace!("Graphics: created material {:?} for {:?}", id, shader_id);
            Ok(ResourceRef::new(Arc::new(Material::new(
                DeviceLink::new(device),
                id,
                shader.clone(),
            ))))
        });
        or_invalid(result, "create_material")
    }

    /// Create an empty mesh.
    pub fn create_mesh(&self) -> MeshRef {
        let result = self.device().and_then(|device| {
            let id = device.with_backend(|backend| backend.create_mesh())?;
            log::trace!("Graphics: created mesh {:?}", id);
            Ok(ResourceRef::new(Arc::new(Mesh::new(DeviceLink::new(device), id))))
        });
        or_invalid(result, "create_mesh")
    }

    // Submission

    /// Execute a draw immediately. Rejected calls are logged and do nothing.
    pub fn render(&self, call: &RenderCall) {
        if let Err(e) = self.submit(call) {
            log::warn!("Graphics: render call rejected: {e}");
        }
    }

    /// Validate and execute a draw immediately.
    ///
    /// # Errors
    ///
    /// Rejects calls whose target, mesh, material or material shader is
    /// invalid or owned by another device, whose index range exceeds the
    /// mesh, or which request instancing the backend lacks. A rejected call
    /// performs no backend work.
    pub fn submit(&self, call: &RenderCall) -> Result<(), GraphicsError> {
        let device = self.device()?;
        let target = resolve(&call.target, device, "render target")?;
        let mesh = resolve(&call.mesh, device, "mesh")?;
        let material = resolve(&call.material, device, "material")?;
        let shader = resolve(material.shader(), device, "material shader")?;

        let end = call
            .index_start
            .checked_add(call.index_count)
            .ok_or_else(|| GraphicsError::InvalidParameter("index range overflows".to_string()))?;
        let available = mesh.index_count();
        if end > available {
            return Err(GraphicsError::InvalidParameter(format!(
                "index range {}..{end} exceeds the mesh's {available} indices",
                call.index_start
            )));
        }
        if call.instance_count > 1 && !self.info.instancing {
            return Err(GraphicsError::FeatureNotSupported(
                "instanced drawing".to_string(),
            ));
        }
        let uploaded = mesh.instance_count();
        if uploaded > 0 && call.instance_count > uploaded {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} instances exceed the mesh's {uploaded} uploaded instances",
                call.instance_count
            )));
        }
        if call.index_count == 0 || call.instance_count == 0 {
            log::trace!("Graphics: empty draw skipped");
            return Ok(());
        }

        let viewport = call
            .viewport
            .unwrap_or_else(|| Rect::from_dimensions(target.width(), target.height()));
        let (values, textures) = material.snapshot(device);
        let command = DrawCommand {
            target: target.id(),
            mesh: mesh.id(),
            shader: shader.id(),
            material: material.id(),
            values: &values,
            textures: &textures,
            viewport,
            scissor: call.scissor,
            index_start: call.index_start,
            index_count: call.index_count,
            instance_count: call.instance_count,
            depth: call.depth,
            cull: call.cull,
            blend: call.blend,
        };

        log::trace!(
            "Graphics: draw {} indices x{} into {:?}",
            call.index_count,
            call.instance_count,
            command.target
        );
        device.with_backend(|backend| backend.render(&command))?;
        Ok(())
    }

    /// Clear every color attachment of `target` to a packed `0xRRGGBBAA` color.
    pub fn clear(&self, target: &FrameBufferRef, rgba: u32) {
        self.clear_with(target, &ClearValues::color(rgba));
    }

    /// Clear the planes of `target` selected by `values.mask`.
    pub fn clear_with(&self, target: &FrameBufferRef, values: &ClearValues) {
        let result = self.device().and_then(|device| {
            let target = resolve(target, device, "clear target")?;
            device.with_backend(|backend| backend.clear(target.id(), values))?;
            Ok(())
        });
        if let Err(e) = result {
            log::warn!("Graphics: clear rejected: {e}");
        }
    }
}

impl Drop for Graphics {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Graphics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graphics")
            .field("state", &self.state)
            .field("backend", &self.backend_name)
            .field("renderer", &self.renderer)
            .field("info", &self.info)
            .finish()
    }
}

static_assertions::assert_impl_all!(Graphics: Send, Sync);
