//! Common utilities for integration tests.
//!
//! Every test runs against the software backend. Tests are parameterized over
//! the renderer identity the backend emulates, so both row orders and both
//! depth ranges are exercised.

#![allow(dead_code)]

use gfx_device::{
    Color, FrameBufferRef, Graphics, GraphicsConfig, GraphicsRenderer, MaterialRef, MeshRef,
    ShaderData, ShaderRef, UniformInfo, UniformType, VertexAttributeFormat,
    VertexAttributeSemantic, VertexFormat,
};

/// Backbuffer size used by the tests.
pub const SIZE: u32 = 16;

pub const BLACK: [u8; 4] = [0, 0, 0, 255];
pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An initialized device with a `SIZE` x `SIZE` backbuffer.
pub struct TestContext {
    pub graphics: Graphics,
}

impl TestContext {
    pub fn new(renderer: GraphicsRenderer) -> Self {
        Self::with_config(default_config(renderer))
    }

    pub fn with_config(config: GraphicsConfig) -> Self {
        init_logging();
        let mut graphics = Graphics::new();
        graphics.init(&config).expect("software backend should initialize");
        Self { graphics }
    }

    pub fn backbuffer(&self) -> FrameBufferRef {
        self.graphics.backbuffer()
    }

    /// Read the first color attachment of `target` as RGBA8 pixels.
    pub fn pixels(&self, target: &FrameBufferRef) -> Vec<u8> {
        let framebuffer = target.get().expect("target should be valid");
        let attachment = framebuffer.attachment(0);
        attachment
            .get()
            .expect("attachment should be valid")
            .get_data()
            .expect("readback should succeed")
    }
}

pub fn default_config(renderer: GraphicsRenderer) -> GraphicsConfig {
    GraphicsConfig::new()
        .with_renderer(renderer)
        .with_backbuffer_size(SIZE, SIZE)
}

/// The RGBA8 pixel at `(x, y)` (texel row `y`).
pub fn get_pixel(data: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let offset = ((y * width + x) * 4) as usize;
    [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]
}

/// Assert that every channel is within `tolerance` of `expected`.
pub fn assert_pixel_near(actual: [u8; 4], expected: [u8; 4], tolerance: u8) {
    let close = actual
        .iter()
        .zip(expected.iter())
        .all(|(a, e)| a.abs_diff(*e) <= tolerance);
    assert!(close, "pixel {actual:?} differs from {expected:?}");
}

/// Assert that every pixel in the backbuffer-sized image satisfies `expected`.
pub fn assert_all_pixels(data: &[u8], expected: impl Fn(u32, u32) -> [u8; 4]) {
    for y in 0..SIZE {
        for x in 0..SIZE {
            let actual = get_pixel(data, SIZE, x, y);
            assert_eq!(actual, expected(x, y), "pixel ({x}, {y})");
        }
    }
}

// ============================================================================
// Shaders and materials
// ============================================================================

/// A shader exposing the uniforms the software backend shades with.
pub fn shader_data() -> ShaderData {
    ShaderData::new("void main() {}", "void main() {}")
        .with_uniform(UniformInfo::new("u_matrix", UniformType::Mat4x4))
        .with_uniform(UniformInfo::new("u_color", UniformType::Float4))
        .with_uniform(UniformInfo::new("u_texture", UniformType::Texture2D))
}

pub fn create_shader(graphics: &Graphics) -> ShaderRef {
    let shader = graphics.create_shader(&shader_data());
    assert!(shader.is_valid());
    shader
}

/// A material drawing in a single color with an identity transform.
pub fn create_solid_color_material(graphics: &Graphics, color: Color) -> MaterialRef {
    let material = graphics.create_material(&create_shader(graphics));
    let handle = material.get().expect("material should be valid");
    handle
        .set_mat4("u_matrix", &glam::Mat4::IDENTITY)
        .expect("u_matrix is declared");
    handle
        .set_vec4("u_color", color.to_vec4())
        .expect("u_color is declared");
    material
}

// ============================================================================
// Meshes
// ============================================================================

pub fn position_format() -> VertexFormat {
    VertexFormat::new().with_attribute(VertexAttributeSemantic::Position, VertexAttributeFormat::Float3)
}

/// Counter-clockwise quad vertices spanning `[x0, x1] x [y0, y1]` in NDC at depth `z`.
pub fn quad_vertices(x0: f32, y0: f32, x1: f32, y1: f32, z: f32) -> [[f32; 3]; 4] {
    [[x0, y0, z], [x1, y0, z], [x1, y1, z], [x0, y1, z]]
}

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

pub fn create_quad(graphics: &Graphics, x0: f32, y0: f32, x1: f32, y1: f32, z: f32) -> MeshRef {
    let mesh = graphics.create_mesh();
    let handle = mesh.get().expect("mesh should be valid");
    handle
        .set_vertices(&position_format(), &quad_vertices(x0, y0, x1, y1, z))
        .expect("vertex upload");
    handle.set_indices_u16(&QUAD_INDICES).expect("index upload");
    mesh
}

pub fn create_fullscreen_quad(graphics: &Graphics) -> MeshRef {
    create_quad(graphics, -1.0, -1.0, 1.0, 1.0, 0.0)
}

/// Quad covering texel columns `0..SIZE / 2` for every renderer.
pub fn create_left_half_quad(graphics: &Graphics) -> MeshRef {
    create_quad(graphics, -1.0, -1.0, 0.0, 1.0, 0.0)
}

/// Quad covering texel columns `SIZE / 2..SIZE` for every renderer.
pub fn create_right_half_quad(graphics: &Graphics) -> MeshRef {
    create_quad(graphics, 0.0, -1.0, 1.0, 1.0, 0.0)
}
