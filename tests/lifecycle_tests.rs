//! Device lifecycle and resource management tests.

#![cfg(feature = "software")]

mod common;

use std::io::Cursor;

use rstest::rstest;

use common::{create_fullscreen_quad, create_shader, default_config, TestContext, SIZE};
use gfx_device::backend::software::SoftwareBackend;
use gfx_device::backend::{
    BackendResult, FrameBufferId, MaterialId, MeshId, ShaderId, TextureId,
};
use gfx_device::{
    BackendStats, ClearValues, DeviceState, DrawCommand, Graphics, GraphicsBackend,
    GraphicsConfig, GraphicsError, GraphicsInfo, GraphicsRenderer, IndexFormat, MaterialRef,
    ShaderData, ShaderStageFlags, TextureDescriptor, TextureFormat, TextureRef, UniformInfo,
    UniformType, VertexFormat,
};

fn stats(ctx: &TestContext) -> BackendStats {
    ctx.graphics.stats()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[rstest]
#[case(GraphicsRenderer::OpenGL, true)]
#[case(GraphicsRenderer::D3D11, false)]
#[case(GraphicsRenderer::Metal, false)]
fn test_init_reports_renderer(#[case] renderer: GraphicsRenderer, #[case] bottom_left: bool) {
    common::init_logging();
    let mut graphics = Graphics::new();
    assert_eq!(graphics.renderer(), GraphicsRenderer::None);
    assert_eq!(*graphics.info(), GraphicsInfo::default());

    graphics.init(&default_config(renderer)).unwrap();
    assert!(graphics.is_initialized());
    assert_eq!(graphics.renderer(), renderer);
    assert_eq!(graphics.info().origin_bottom_left, bottom_left);
    assert!(graphics.info().instancing);

    let backbuffer = graphics.backbuffer();
    let framebuffer = backbuffer.get().unwrap();
    assert_eq!((framebuffer.width(), framebuffer.height()), (SIZE, SIZE));
    assert!(framebuffer.has_depth());

    graphics.shutdown();
    assert_eq!(graphics.state(), DeviceState::Destroyed);
    assert_eq!(graphics.renderer(), GraphicsRenderer::None);
    assert_eq!(*graphics.info(), GraphicsInfo::default());
}

#[test]
fn test_default_renderer_is_platform_default() {
    let ctx = TestContext::with_config(GraphicsConfig::new().with_backbuffer_size(SIZE, SIZE));
    assert_eq!(ctx.graphics.renderer(), GraphicsRenderer::platform_default());
}

#[test]
fn test_init_twice_is_rejected() {
    let mut ctx = TestContext::new(GraphicsRenderer::Metal);
    assert!(matches!(
        ctx.graphics.init(&default_config(GraphicsRenderer::Metal)),
        Err(GraphicsError::InvalidState(_))
    ));
    assert!(ctx.graphics.is_initialized());

    ctx.graphics.shutdown();
    ctx.graphics.shutdown();
    assert!(ctx.graphics.init(&default_config(GraphicsRenderer::Metal)).is_err());
}

#[test]
fn test_count_renderer_is_rejected() {
    let mut graphics = Graphics::new();
    let result = graphics.init(&default_config(GraphicsRenderer::Count));
    assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    assert_eq!(graphics.state(), DeviceState::Uninitialized);
}

#[test]
fn test_init_with_external_backend() {
    common::init_logging();
    let config = default_config(GraphicsRenderer::OpenGL);
    let backend = SoftwareBackend::new(GraphicsRenderer::D3D11, &config);

    let mut graphics = Graphics::new();
    graphics.init_with_backend(Box::new(backend), &config).unwrap();
    assert_eq!(graphics.renderer(), GraphicsRenderer::D3D11);
    assert_eq!(graphics.backend_name(), "Software");
    assert!(!graphics.info().origin_bottom_left);
}

#[test]
fn test_factories_before_init_return_invalid() {
    let graphics = Graphics::new();
    assert!(!graphics.create_texture(4, 4, TextureFormat::Rgba8Unorm).is_valid());
    assert!(!graphics.create_framebuffer(4, 4).is_valid());
    assert!(!graphics
        .create_shader(&ShaderData::new("vs", "fs"))
        .is_valid());
    assert!(!graphics.create_mesh().is_valid());
    assert!(!graphics.backbuffer().is_valid());
    assert_eq!(graphics.stats(), BackendStats::default());
}

#[test]
fn test_shutdown_invalidates_handles() {
    let mut ctx = TestContext::new(GraphicsRenderer::OpenGL);
    let texture = ctx.graphics.create_texture(4, 4, TextureFormat::Rgba8Unorm);
    let mesh = create_fullscreen_quad(&ctx.graphics);
    let material = ctx.graphics.create_material(&create_shader(&ctx.graphics));
    let backbuffer = ctx.backbuffer();
    assert!(texture.is_valid() && mesh.is_valid() && material.is_valid());

    ctx.graphics.shutdown();

    assert!(!texture.is_valid());
    assert!(!mesh.is_valid());
    assert!(!material.is_valid());
    assert!(!backbuffer.is_valid());
    // The handles still own their (now inert) resources.
    assert_eq!(texture.owner_count(), 1);
    assert_eq!(ctx.graphics.stats(), BackendStats::default());
}

// ============================================================================
// Ownership
// ============================================================================

#[test]
fn test_backend_objects_freed_with_last_handle() {
    let ctx = TestContext::new(GraphicsRenderer::Metal);
    let baseline = stats(&ctx);
    // Backbuffer: color and depth textures plus the framebuffer.
    assert_eq!(baseline.textures, 2);
    assert_eq!(baseline.framebuffers, 1);

    let texture = ctx.graphics.create_texture(8, 8, TextureFormat::Rgba8Unorm);
    let copy = texture.clone();
    assert_eq!(texture.owner_count(), 2);
    assert_eq!(stats(&ctx).textures, 3);

    drop(texture);
    assert_eq!(stats(&ctx).textures, 3);
    drop(copy);
    assert_eq!(stats(&ctx), baseline);
}

#[test]
fn test_framebuffer_shares_attachments() {
    let ctx = TestContext::new(GraphicsRenderer::D3D11);
    let baseline = stats(&ctx);

    let target = ctx.graphics.create_framebuffer_with_attachments(
        4,
        4,
        &[TextureFormat::Rgba8Unorm, TextureFormat::Depth32Float],
    );
    let color = target.get().unwrap().attachment(0);
    let depth = target.get().unwrap().depth_attachment().cloned().unwrap();
    assert_eq!(depth.get().unwrap().format(), TextureFormat::Depth32Float);
    assert!(color.get().unwrap().is_framebuffer_attachment());
    assert_eq!(stats(&ctx).textures, baseline.textures + 2);

    // The attachment outlives the framebuffer while a handle remains.
    drop(target);
    drop(depth);
    assert_eq!(stats(&ctx).framebuffers, baseline.framebuffers);
    assert_eq!(stats(&ctx).textures, baseline.textures + 1);
    assert!(color.is_valid());
    assert_eq!(color.get().unwrap().get_data().unwrap().len(), 4 * 4 * 4);

    drop(color);
    assert_eq!(stats(&ctx), baseline);
}

#[test]
fn test_material_keeps_shader_alive() {
    let ctx = TestContext::new(GraphicsRenderer::Metal);
    let shader = create_shader(&ctx.graphics);
    let material = ctx.graphics.create_material(&shader);
    drop(shader);

    assert_eq!(stats(&ctx).shaders, 1);
    assert!(material.get().unwrap().shader().is_valid());

    drop(material);
    assert_eq!(stats(&ctx).shaders, 0);
    assert_eq!(stats(&ctx).materials, 0);
}

#[test]
fn test_material_keeps_bound_texture_alive() {
    let ctx = TestContext::new(GraphicsRenderer::Metal);
    let material = ctx.graphics.create_material(&create_shader(&ctx.graphics));
    let texture = ctx.graphics.create_texture(2, 2, TextureFormat::Rgba8Unorm);
    material.get().unwrap().set_texture("u_texture", &texture).unwrap();
    let textures = stats(&ctx).textures;

    drop(texture);
    assert_eq!(stats(&ctx).textures, textures);

    material
        .get()
        .unwrap()
        .set_texture("u_texture", &TextureRef::invalid())
        .unwrap();
    assert_eq!(stats(&ctx).textures, textures - 1);
}

#[test]
fn test_resources_from_another_device_are_rejected() {
    let first = TestContext::new(GraphicsRenderer::Metal);
    let second = TestContext::new(GraphicsRenderer::Metal);

    let shader = create_shader(&first.graphics);
    assert!(!second.graphics.create_material(&shader).is_valid());
    assert!(first.graphics.create_material(&shader).is_valid());
}

// ============================================================================
// Textures
// ============================================================================

#[rstest]
#[case(0, 4)]
#[case(4, 0)]
#[case(9000, 1)]
fn test_texture_size_limits(#[case] width: u32, #[case] height: u32) {
    let ctx = TestContext::new(GraphicsRenderer::OpenGL);
    let texture = ctx.graphics.create_texture(width, height, TextureFormat::Rgba8Unorm);
    assert!(!texture.is_valid());
}

#[test]
fn test_texture_size_follows_configured_limit() {
    let ctx = TestContext::with_config(
        default_config(GraphicsRenderer::Metal).with_max_texture_size(SIZE),
    );
    assert_eq!(ctx.graphics.info().max_texture_size, SIZE);
    assert!(ctx
        .graphics
        .create_texture(SIZE, SIZE, TextureFormat::R8Unorm)
        .is_valid());
    assert!(!ctx
        .graphics
        .create_texture(SIZE + 1, 1, TextureFormat::R8Unorm)
        .is_valid());
}

#[test]
fn test_rgba_texture_round_trip() {
    let ctx = TestContext::new(GraphicsRenderer::D3D11);
    let pixels: Vec<u8> = (0..2 * 2 * 4).collect();

    assert!(!ctx
        .graphics
        .create_texture_from_rgba(2, 2, &pixels[..12])
        .is_valid());

    let texture = ctx.graphics.create_texture_from_rgba(2, 2, &pixels);
    let handle = texture.get().unwrap();
    assert_eq!(handle.format(), TextureFormat::Rgba8Unorm);
    assert_eq!(handle.get_data().unwrap(), pixels);

    let replacement = vec![0xab; 16];
    handle.set_data(&replacement).unwrap();
    assert_eq!(handle.get_data().unwrap(), replacement);
    assert!(matches!(
        handle.set_data(&replacement[..15]),
        Err(GraphicsError::InvalidParameter(_))
    ));
}

#[test]
fn test_depth_texture_round_trip() {
    let ctx = TestContext::new(GraphicsRenderer::Metal);
    let texture = ctx.graphics.create_texture(2, 1, TextureFormat::Depth24PlusStencil8);
    let handle = texture.get().unwrap();

    let packed: [u32; 2] = [0x0100_0000, 0x05ff_ffff];
    let bytes: Vec<u8> = bytemuck::cast_slice(&packed).to_vec();
    handle.set_data(&bytes).unwrap();
    assert_eq!(handle.get_data().unwrap(), bytes);
}

#[test]
fn test_texture_from_file() {
    let ctx = TestContext::new(GraphicsRenderer::OpenGL);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checker.png");
    let image = image::RgbaImage::from_fn(3, 2, |x, y| {
        image::Rgba([x as u8 * 80, y as u8 * 120, 7, 255])
    });
    image.save(&path).unwrap();

    let texture = ctx.graphics.create_texture_from_file(&path);
    let handle = texture.get().unwrap();
    assert_eq!((handle.width(), handle.height()), (3, 2));
    assert_eq!(handle.get_data().unwrap(), image.as_raw().clone());
    assert_eq!(handle.label(), Some(path.display().to_string().as_str()));

    assert!(!ctx
        .graphics
        .create_texture_from_file(dir.path().join("missing.png"))
        .is_valid());
}

#[test]
fn test_texture_from_reader() {
    let ctx = TestContext::new(GraphicsRenderer::Metal);
    let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 40]));
    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut Cursor::new(&mut encoded), image::ImageOutputFormat::Png)
        .unwrap();

    let texture = ctx.graphics.create_texture_from_reader(Cursor::new(&encoded));
    assert_eq!(texture.get().unwrap().get_data().unwrap(), image.into_raw());

    let garbage = ctx
        .graphics
        .create_texture_from_reader(Cursor::new(b"not an image".to_vec()));
    assert!(!garbage.is_valid());
}

// ============================================================================
// Framebuffers
// ============================================================================

#[rstest]
#[case::empty(&[], false)]
#[case::one_color(&[TextureFormat::Rgba8Unorm], true)]
#[case::depth_only(&[TextureFormat::Depth16Unorm], true)]
#[case::max_color(&[TextureFormat::Rgba8Unorm; 4], true)]
#[case::too_many_color(&[TextureFormat::Rgba8Unorm; 5], false)]
#[case::max_with_depth(&[
    TextureFormat::Rgba8Unorm,
    TextureFormat::Rgba8Unorm,
    TextureFormat::Rgba8Unorm,
    TextureFormat::Rgba8Unorm,
    TextureFormat::Depth24PlusStencil8,
], true)]
#[case::two_depth(&[TextureFormat::Depth16Unorm, TextureFormat::Depth32Float], false)]
fn test_framebuffer_attachment_limits(#[case] formats: &[TextureFormat], #[case] valid: bool) {
    let ctx = TestContext::new(GraphicsRenderer::D3D11);
    let baseline = stats(&ctx);
    let target = ctx.graphics.create_framebuffer_with_attachments(8, 8, formats);
    assert_eq!(target.is_valid(), valid);
    if valid {
        assert_eq!(target.get().unwrap().attachments().len(), formats.len());
    } else {
        assert_eq!(stats(&ctx), baseline);
    }
}

#[test]
fn test_framebuffer_zero_size_is_invalid() {
    let ctx = TestContext::new(GraphicsRenderer::Metal);
    assert!(!ctx.graphics.create_framebuffer(0, 8).is_valid());
}

// ============================================================================
// Shaders and materials
// ============================================================================

#[test]
fn test_shader_with_empty_source_is_invalid() {
    let ctx = TestContext::new(GraphicsRenderer::OpenGL);
    assert!(!ctx
        .graphics
        .create_shader(&ShaderData::new("", "void main() {}"))
        .is_valid());
    assert!(!ctx
        .graphics
        .create_shader(&ShaderData::new("void main() {}", ""))
        .is_valid());
    assert_eq!(stats(&ctx).shaders, 0);
}

#[test]
fn test_shader_reports_uniforms() {
    let ctx = TestContext::new(GraphicsRenderer::OpenGL);
    let shader = create_shader(&ctx.graphics);
    let handle = shader.get().unwrap();
    assert_eq!(handle.uniforms().len(), 3);
    assert_eq!(
        handle.find_uniform("u_color").map(|u| u.ty),
        Some(UniformType::Float4)
    );
    assert!(handle.find_uniform("u_missing").is_none());
}

#[test]
fn test_material_from_invalid_shader_is_invalid() {
    let ctx = TestContext::new(GraphicsRenderer::Metal);
    let material = ctx.graphics.create_material(&Default::default());
    assert_eq!(material, MaterialRef::invalid());
}

#[test]
fn test_material_parameters() {
    let ctx = TestContext::new(GraphicsRenderer::D3D11);
    let data = ShaderData::new("vs", "fs")
        .with_uniform(UniformInfo::new("u_offsets", UniformType::Float2).with_array_length(2))
        .with_uniform(UniformInfo::new("u_texture", UniformType::Texture2D))
        .with_uniform(UniformInfo::new("u_sampler", UniformType::Sampler2D));
    let shader = ctx.graphics.create_shader(&data);
    let material = ctx.graphics.create_material(&shader);
    let handle = material.get().unwrap();

    assert_eq!(handle.get_value("u_offsets"), Some(vec![0.0; 4]));
    handle.set_value("u_offsets", &[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(handle.get_value("u_offsets"), Some(vec![1.0, 2.0, 3.0, 0.0]));

    let too_long = handle.set_value("u_offsets", &[0.0; 5]);
    assert!(matches!(too_long, Err(GraphicsError::InvalidParameter(_))));
    assert!(handle.set_value("u_missing", &[1.0]).is_err());
    assert!(handle.set_value("u_texture", &[1.0]).is_err());
    assert!(handle.set_value("u_sampler", &[1.0]).is_err());
    assert_eq!(handle.get_value("u_texture"), None);

    let texture = ctx.graphics.create_texture(1, 1, TextureFormat::Rgba8Unorm);
    assert!(handle.set_texture("u_offsets", &texture).is_err());
    assert!(handle.set_texture_at("u_texture", 1, &texture).is_err());
    handle.set_texture("u_texture", &texture).unwrap();
    assert_eq!(handle.get_texture("u_texture"), texture);
    assert_eq!(handle.get_texture("u_missing"), TextureRef::invalid());
}

/// Native-style backend that compiles any shader it is given.
struct AcceptAnyShader(SoftwareBackend);

impl GraphicsBackend for AcceptAnyShader {
    fn name(&self) -> &'static str {
        "AcceptAnyShader"
    }

    fn renderer(&self) -> GraphicsRenderer {
        self.0.renderer()
    }

    fn info(&self) -> GraphicsInfo {
        self.0.info()
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> BackendResult<TextureId> {
        self.0.create_texture(descriptor)
    }

    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> BackendResult<()> {
        self.0.write_texture(texture, data)
    }

    fn read_texture(&mut self, texture: TextureId) -> BackendResult<Vec<u8>> {
        self.0.read_texture(texture)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.0.destroy_texture(texture)
    }

    fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
        attachments: &[TextureId],
    ) -> BackendResult<FrameBufferId> {
        self.0.create_framebuffer(width, height, attachments)
    }

    fn destroy_framebuffer(&mut self, framebuffer: FrameBufferId) {
        self.0.destroy_framebuffer(framebuffer)
    }

    fn create_shader(&mut self, _data: &ShaderData) -> BackendResult<ShaderId> {
        self.0.create_shader(&ShaderData::new("vs", "fs"))
    }

    fn destroy_shader(&mut self, shader: ShaderId) {
        self.0.destroy_shader(shader)
    }

    fn create_material(&mut self, shader: ShaderId) -> BackendResult<MaterialId> {
        self.0.create_material(shader)
    }

    fn destroy_material(&mut self, material: MaterialId) {
        self.0.destroy_material(material)
    }

    fn create_mesh(&mut self) -> BackendResult<MeshId> {
        self.0.create_mesh()
    }

    fn write_mesh_vertices(
        &mut self,
        mesh: MeshId,
        format: &VertexFormat,
        data: &[u8],
    ) -> BackendResult<()> {
        self.0.write_mesh_vertices(mesh, format, data)
    }

    fn write_mesh_indices(
        &mut self,
        mesh: MeshId,
        format: IndexFormat,
        data: &[u8],
    ) -> BackendResult<()> {
        self.0.write_mesh_indices(mesh, format, data)
    }

    fn write_mesh_instances(
        &mut self,
        mesh: MeshId,
        format: &VertexFormat,
        data: &[u8],
    ) -> BackendResult<()> {
        self.0.write_mesh_instances(mesh, format, data)
    }

    fn destroy_mesh(&mut self, mesh: MeshId) {
        self.0.destroy_mesh(mesh)
    }

    fn render(&mut self, command: &DrawCommand<'_>) -> BackendResult<()> {
        self.0.render(command)
    }

    fn clear(&mut self, target: FrameBufferId, values: &ClearValues) -> BackendResult<()> {
        self.0.clear(target, values)
    }

    fn stats(&self) -> BackendStats {
        self.0.stats()
    }

    fn shutdown(&mut self) {
        self.0.shutdown()
    }
}

fn graphics_accepting_any_shader() -> Graphics {
    common::init_logging();
    let config = default_config(GraphicsRenderer::Metal);
    let backend = AcceptAnyShader(SoftwareBackend::new(GraphicsRenderer::Metal, &config));
    let mut graphics = Graphics::new();
    graphics.init_with_backend(Box::new(backend), &config).unwrap();
    graphics
}

#[rstest]
#[case::empty_texture_array(
    ShaderData::new("vs", "fs")
        .with_uniform(UniformInfo::new("u_tex", UniformType::Texture2D).with_array_length(0))
)]
#[case::empty_value_array(
    ShaderData::new("vs", "fs")
        .with_uniform(UniformInfo::new("u_color", UniformType::Float4).with_array_length(0))
)]
#[case::duplicate_name(
    ShaderData::new("vs", "fs")
        .with_uniform(UniformInfo::new("u_tex", UniformType::Texture2D))
        .with_uniform(UniformInfo::new("u_tex", UniformType::Float4))
)]
#[case::no_stage(
    ShaderData::new("vs", "fs").with_uniform(
        UniformInfo::new("u_color", UniformType::Float4).with_stages(ShaderStageFlags::empty())
    )
)]
fn test_malformed_uniforms_rejected_before_backend(#[case] data: ShaderData) {
    let graphics = graphics_accepting_any_shader();
    let shader = graphics.create_shader(&data);
    assert!(!shader.is_valid());
    assert_eq!(graphics.stats().shaders, 0);
    assert_eq!(graphics.create_material(&shader), MaterialRef::invalid());
}

#[test]
fn test_single_stage_uniforms_accepted() {
    let graphics = graphics_accepting_any_shader();
    let data = ShaderData::new("vs", "fs")
        .with_uniform(
            UniformInfo::new("u_matrix", UniformType::Mat4x4).with_stages(ShaderStageFlags::VERTEX),
        )
        .with_uniform(
            UniformInfo::new("u_tex", UniformType::Texture2D)
                .with_stages(ShaderStageFlags::FRAGMENT),
        );
    let shader = graphics.create_shader(&data);
    assert!(shader.is_valid());

    let material = graphics.create_material(&shader);
    let handle = material.get().unwrap();
    assert_eq!(handle.get_texture("u_tex"), TextureRef::invalid());
    let texture = graphics.create_texture(1, 1, TextureFormat::Rgba8Unorm);
    handle.set_texture("u_tex", &texture).unwrap();
    assert_eq!(handle.get_texture("u_tex"), texture);
}

// ============================================================================
// Meshes
// ============================================================================

#[test]
fn test_mesh_upload_validation() {
    let ctx = TestContext::new(GraphicsRenderer::Metal);
    let mesh = create_fullscreen_quad(&ctx.graphics);
    let handle = mesh.get().unwrap();
    assert_eq!(handle.vertex_count(), 4);
    assert_eq!(handle.index_count(), 6);
    assert_eq!(handle.instance_count(), 0);

    // Not a whole number of vertices: previous contents stay.
    assert!(handle
        .set_vertex_data(&common::position_format(), &[0u8; 13])
        .is_err());
    assert_eq!(handle.vertex_count(), 4);

    assert!(handle.set_index_data(gfx_device::IndexFormat::Uint32, &[0u8; 6]).is_err());
    assert_eq!(handle.index_count(), 6);

    handle.set_indices_u32(&[0, 1, 2]).unwrap();
    assert_eq!(handle.index_format(), gfx_device::IndexFormat::Uint32);
    assert_eq!(handle.index_count(), 3);
}
