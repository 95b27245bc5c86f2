//! Clears the backbuffer, draws a vertex-colored triangle over a tinted quad
//! and writes the result to `clear_and_draw.png`.
//!
//! Run with `cargo run --example clear_and_draw [renderer]`, where `renderer`
//! is one of `opengl`, `d3d11` or `metal`.

use gfx_device::{
    BlendMode, ClearValues, Color, Graphics, GraphicsConfig, GraphicsError, GraphicsRenderer,
    RenderCall, ShaderData, UniformInfo, UniformType, VertexAttributeFormat,
    VertexAttributeSemantic, VertexFormat,
};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 256;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [u8; 4],
}

fn parse_renderer(name: Option<String>) -> GraphicsRenderer {
    match name.as_deref() {
        Some("opengl") => GraphicsRenderer::OpenGL,
        Some("d3d11") => GraphicsRenderer::D3D11,
        Some("metal") => GraphicsRenderer::Metal,
        _ => GraphicsRenderer::None,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GraphicsConfig::new()
        .with_renderer(parse_renderer(std::env::args().nth(1)))
        .with_backbuffer_size(WIDTH, HEIGHT);
    let mut graphics = Graphics::new();
    graphics.init(&config)?;
    log::info!("Rendering with {}", graphics.renderer().name());

    let target = graphics.backbuffer();
    graphics.clear_with(
        &target,
        &ClearValues {
            color: 0x202030ff,
            ..ClearValues::default()
        },
    );

    let shader = graphics.create_shader(
        &ShaderData::new("void main() {}", "void main() {}")
            .with_uniform(UniformInfo::new("u_matrix", UniformType::Mat4x4))
            .with_uniform(UniformInfo::new("u_color", UniformType::Float4)),
    );
    let material = graphics.create_material(&shader);
    let tint = material
        .get()
        .ok_or_else(|| GraphicsError::ResourceCreationFailed("material".to_string()))?;
    tint.set_mat4("u_matrix", &glam::Mat4::IDENTITY)?;
    tint.set_vec4("u_color", Color::WHITE.to_vec4())?;

    let format = VertexFormat::new()
        .with_attribute(VertexAttributeSemantic::Position, VertexAttributeFormat::Float3)
        .with_attribute(VertexAttributeSemantic::Color, VertexAttributeFormat::Unorm8x4);

    // A translucent quad behind the triangle.
    let quad = graphics.create_mesh();
    let handle = quad
        .get()
        .ok_or_else(|| GraphicsError::ResourceCreationFailed("mesh".to_string()))?;
    let half_blue = [0, 0, 128, 128];
    handle.set_vertices(
        &format,
        &[
            Vertex { position: [-0.8, -0.8, 0.5], color: half_blue },
            Vertex { position: [0.8, -0.8, 0.5], color: half_blue },
            Vertex { position: [0.8, 0.8, 0.5], color: half_blue },
            Vertex { position: [-0.8, 0.8, 0.5], color: half_blue },
        ],
    )?;
    handle.set_indices_u16(&[0, 1, 2, 0, 2, 3])?;

    let triangle = graphics.create_mesh();
    let handle = triangle
        .get()
        .ok_or_else(|| GraphicsError::ResourceCreationFailed("mesh".to_string()))?;
    handle.set_vertices(
        &format,
        &[
            Vertex { position: [-0.6, -0.6, 0.0], color: [255, 0, 0, 255] },
            Vertex { position: [0.6, -0.6, 0.0], color: [0, 255, 0, 255] },
            Vertex { position: [0.0, 0.6, 0.0], color: [0, 0, 255, 255] },
        ],
    )?;
    handle.set_indices_u16(&[0, 1, 2])?;

    graphics.submit(&RenderCall::new(target.clone(), triangle, material.clone()))?;
    graphics.submit(
        &RenderCall::new(target.clone(), quad, material).with_blend(BlendMode::NORMAL),
    )?;

    let color = target
        .get()
        .map(|framebuffer| framebuffer.attachment(0))
        .and_then(|attachment| attachment.get().map(|texture| texture.get_data()))
        .ok_or_else(|| GraphicsError::InvalidResource("backbuffer".to_string()))??;
    let mut image = image::RgbaImage::from_raw(WIDTH, HEIGHT, color)
        .ok_or_else(|| GraphicsError::InvalidParameter("readback size".to_string()))?;
    if graphics.info().origin_bottom_left {
        image::imageops::flip_vertical_in_place(&mut image);
    }
    image.save("clear_and_draw.png")?;
    log::info!("Wrote clear_and_draw.png ({:?})", graphics.stats());

    graphics.shutdown();
    Ok(())
}
