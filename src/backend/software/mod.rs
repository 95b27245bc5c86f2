//! Software reference backend.
//!
//! Implements the whole [`GraphicsBackend`] contract on the CPU: textures live
//! in host memory and draws are rasterized triangle by triangle. It reports one
//! of the native [`GraphicsRenderer`] identities and follows that API's
//! conventions, so code can be exercised without a GPU.
//!
//! # Fixed shading model
//!
//! Shader sources are opaque to this backend; only the declared uniform
//! interface is interpreted:
//!
//! - `u_matrix` (`Mat4x4`, column major) transforms the `Position` attribute.
//! - The fragment colour is the vertex `Color` attribute times `u_color`
//!   (`Float4`) times the first `Texture2D` slot sampled at `TexCoord0`
//!   (nearest, clamp to edge). Each missing term counts as white.
//! - The instance buffer's `Position` attribute translates each instance.
//!
//! Normalized device coordinates have +Y up and counter-clockwise front faces.
//! With OpenGL conventions NDC `y = -1` lands on texel row 0 and depth maps from
//! `[-1, 1]`; otherwise `y = +1` lands on row 0 and depth is taken from `[0, 1]`.

mod raster;
mod texel;

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::config::GraphicsConfig;
use crate::types::{
    ClearMask, ClearValues, Color, Compare, Cull, GraphicsInfo, GraphicsRenderer, IndexFormat,
    Rect, ShaderData, TextureDescriptor, UniformType, VertexAttribute, VertexAttributeFormat,
    VertexAttributeSemantic, VertexFormat,
};

use super::{
    BackendError, BackendResult, BackendStats, DrawCommand, FrameBufferId, GraphicsBackend,
    MaterialId, MeshId, ShaderId, TextureId,
};
use raster::{PixelBounds, ScreenVertex};
use texel::SoftTexture;

/// Uniform offsets the fixed shading model reads.
#[derive(Debug, Clone, Copy, Default)]
struct SoftShader {
    matrix: Option<usize>,
    color: Option<usize>,
}

#[derive(Debug, Clone)]
struct SoftFrameBuffer {
    width: u32,
    height: u32,
    attachments: Vec<TextureId>,
}

#[derive(Debug, Default)]
struct SoftMesh {
    vertex_format: VertexFormat,
    vertices: Vec<u8>,
    indices: Vec<u32>,
    instance_format: VertexFormat,
    instances: Vec<u8>,
}

impl SoftMesh {
    fn vertex_count(&self) -> usize {
        element_count(&self.vertex_format, &self.vertices)
    }
}

fn unknown(id: impl std::fmt::Debug) -> BackendError {
    BackendError::UnknownResource(format!("{id:?}"))
}

fn element_count(format: &VertexFormat, data: &[u8]) -> usize {
    match format.stride {
        0 => 0,
        stride => data.len() / stride as usize,
    }
}

/// Read one attribute of element `index`. Missing components default to
/// `(0, 0, 0, 1)`.
fn read_attribute(data: &[u8], stride: u32, index: usize, attribute: &VertexAttribute) -> Vec4 {
    let base = index * stride as usize + attribute.offset as usize;
    let bytes = &data[base..base + attribute.format.size() as usize];
    if attribute.format == VertexAttributeFormat::Unorm8x4 {
        return Vec4::new(
            bytes[0] as f32 / 255.0,
            bytes[1] as f32 / 255.0,
            bytes[2] as f32 / 255.0,
            bytes[3] as f32 / 255.0,
        );
    }
    let mut value = [0.0, 0.0, 0.0, 1.0];
    for (component, chunk) in value.iter_mut().zip(bytes.chunks_exact(4)) {
        *component = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Vec4::from_array(value)
}

/// Map NDC to target pixels and depth.
fn to_screen(origin_bottom_left: bool, ndc: Vec3, viewport: &Rect) -> Vec3 {
    let x = viewport.x + (ndc.x + 1.0) * 0.5 * viewport.w;
    let (y, depth) = if origin_bottom_left {
        (viewport.y + (ndc.y + 1.0) * 0.5 * viewport.h, ndc.z * 0.5 + 0.5)
    } else {
        (viewport.y + (1.0 - ndc.y) * 0.5 * viewport.h, ndc.z)
    };
    Vec3::new(x, y, depth.clamp(0.0, 1.0))
}

/// CPU implementation of [`GraphicsBackend`].
pub struct SoftwareBackend {
    renderer: GraphicsRenderer,
    info: GraphicsInfo,
    next_id: u64,
    textures: HashMap<TextureId, SoftTexture>,
    framebuffers: HashMap<FrameBufferId, SoftFrameBuffer>,
    shaders: HashMap<ShaderId, SoftShader>,
    materials: HashMap<MaterialId, ShaderId>,
    meshes: HashMap<MeshId, SoftMesh>,
}

impl SoftwareBackend {
    /// Create a backend following `renderer`'s conventions.
    pub fn new(renderer: GraphicsRenderer, config: &GraphicsConfig) -> Self {
        let info = GraphicsInfo {
            instancing: config.instancing,
            origin_bottom_left: renderer == GraphicsRenderer::OpenGL,
            max_texture_size: config.max_texture_size,
        };
        log::debug!("SoftwareBackend: created as {} ({:?})", renderer.name(), info);
        Self {
            renderer,
            info,
            next_id: 1,
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            shaders: HashMap::new(),
            materials: HashMap::new(),
            meshes: HashMap::new(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn mesh_mut(&mut self, mesh: MeshId) -> BackendResult<&mut SoftMesh> {
        self.meshes
            .get_mut(&mesh)
            .ok_or_else(|| unknown(mesh))
    }
}

impl GraphicsBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "Software"
    }

    fn renderer(&self) -> GraphicsRenderer {
        self.renderer
    }

    fn info(&self) -> GraphicsInfo {
        self.info
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> BackendResult<TextureId> {
        let max = self.info.max_texture_size;
        if descriptor.width == 0
            || descriptor.height == 0
            || descriptor.width > max
            || descriptor.height > max
        {
            return Err(BackendError::TextureCreationFailed(format!(
                "unsupported size {}x{}",
                descriptor.width, descriptor.height
            )));
        }
        let texture = SoftTexture::new(descriptor)?;
        let id = TextureId::new(self.allocate_id());
        self.textures.insert(id, texture);
        log::trace!(
            "SoftwareBackend: creating texture {:?} {:?} ({}x{} {:?})",
            id,
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.format
        );
        Ok(id)
    }

    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> BackendResult<()> {
        self.textures
            .get_mut(&texture)
            .ok_or_else(|| unknown(texture))?
            .write(data)
    }

    fn read_texture(&mut self, texture: TextureId) -> BackendResult<Vec<u8>> {
        self.textures
            .get(&texture)
            .map(SoftTexture::read)
            .ok_or_else(|| unknown(texture))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
        attachments: &[TextureId],
    ) -> BackendResult<FrameBufferId> {
        if attachments.is_empty() {
            return Err(BackendError::FrameBufferCreationFailed(
                "no attachments".to_string(),
            ));
        }
        for id in attachments {
            let texture = self
                .textures
                .get(id)
                .ok_or_else(|| BackendError::FrameBufferCreationFailed(format!("{id:?} is unknown")))?;
            if texture.width() != width || texture.height() != height {
                return Err(BackendError::FrameBufferCreationFailed(format!(
                    "{id:?} is {}x{}, framebuffer is {width}x{height}",
                    texture.width(),
                    texture.height()
                )));
            }
        }
        let id = FrameBufferId::new(self.allocate_id());
        self.framebuffers.insert(
            id,
            SoftFrameBuffer {
                width,
                height,
                attachments: attachments.to_vec(),
            },
        );
        Ok(id)
    }

    fn destroy_framebuffer(&mut self, framebuffer: FrameBufferId) {
        self.framebuffers.remove(&framebuffer);
    }

    fn create_shader(&mut self, data: &ShaderData) -> BackendResult<ShaderId> {
        if data.vertex.trim().is_empty() || data.fragment.trim().is_empty() {
            return Err(BackendError::ShaderCreationFailed(
                "empty shader stage source".to_string(),
            ));
        }

        let mut shader = SoftShader::default();
        let mut offset = 0;
        for (i, uniform) in data.uniforms.iter().enumerate() {
            if data.uniforms[..i].iter().any(|u| u.name == uniform.name) {
                return Err(BackendError::ShaderCreationFailed(format!(
                    "duplicate uniform '{}'",
                    uniform.name
                )));
            }
            if uniform.array_length == 0 {
                return Err(BackendError::ShaderCreationFailed(format!(
                    "uniform '{}' has zero elements",
                    uniform.name
                )));
            }
            match (uniform.name.as_str(), uniform.ty) {
                ("u_matrix", UniformType::Mat4x4) => shader.matrix = Some(offset),
                ("u_color", UniformType::Float4) => shader.color = Some(offset),
                _ => {}
            }
            offset += uniform.float_count();
        }

        let id = ShaderId::new(self.allocate_id());
        self.shaders.insert(id, shader);
        Ok(id)
    }

    fn destroy_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn create_material(&mut self, shader: ShaderId) -> BackendResult<MaterialId> {
        if !self.shaders.contains_key(&shader) {
            return Err(BackendError::MaterialCreationFailed(format!(
                "{shader:?} is unknown"
            )));
        }
        let id = MaterialId::new(self.allocate_id());
        self.materials.insert(id, shader);
        Ok(id)
    }

    fn destroy_material(&mut self, material: MaterialId) {
        self.materials.remove(&material);
    }

    fn create_mesh(&mut self) -> BackendResult<MeshId> {
        let id = MeshId::new(self.allocate_id());
        self.meshes.insert(id, SoftMesh::default());
        Ok(id)
    }

    fn write_mesh_vertices(
        &mut self,
        mesh: MeshId,
        format: &VertexFormat,
        data: &[u8],
    ) -> BackendResult<()> {
        let mesh = self.mesh_mut(mesh)?;
        mesh.vertex_format = format.clone();
        mesh.vertices = data.to_vec();
        Ok(())
    }

    fn write_mesh_indices(
        &mut self,
        mesh: MeshId,
        format: IndexFormat,
        data: &[u8],
    ) -> BackendResult<()> {
        let indices = match format {
            IndexFormat::Uint16 => data
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect(),
            IndexFormat::Uint32 => data
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        };
        self.mesh_mut(mesh)?.indices = indices;
        Ok(())
    }

    fn write_mesh_instances(
        &mut self,
        mesh: MeshId,
        format: &VertexFormat,
        data: &[u8],
    ) -> BackendResult<()> {
        let mesh = self.mesh_mut(mesh)?;
        mesh.instance_format = format.clone();
        mesh.instances = data.to_vec();
        Ok(())
    }

    fn destroy_mesh(&mut self, mesh: MeshId) {
        self.meshes.remove(&mesh);
    }

    fn render(&mut self, command: &DrawCommand<'_>) -> BackendResult<()> {
        let framebuffer = self
            .framebuffers
            .get(&command.target)
            .cloned()
            .ok_or_else(|| unknown(&command.target))?;
        let shader = *self
            .shaders
            .get(&command.shader)
            .ok_or_else(|| unknown(&command.shader))?;
        if !self.materials.contains_key(&command.material) {
            return Err(unknown(&command.material));
        }
        let mesh = self.meshes.get(&command.mesh).ok_or_else(|| unknown(&command.mesh))?;

        // Resolve the index range and vertex attributes before touching the target.
        let start = command.index_start as usize;
        let end = start.saturating_add(command.index_count as usize);
        let indices = mesh.indices.get(start..end).ok_or_else(|| {
            BackendError::InvalidParameter(format!(
                "index range {start}..{end} exceeds {} indices",
                mesh.indices.len()
            ))
        })?;
        let vertex_count = mesh.vertex_count();
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(BackendError::InvalidParameter(format!(
                "index {bad} out of range for {vertex_count} vertices"
            )));
        }
        let format = &mesh.vertex_format;
        let position = format
            .attribute(VertexAttributeSemantic::Position)
            .copied()
            .ok_or_else(|| {
                BackendError::InvalidParameter("mesh has no Position attribute".to_string())
            })?;
        let color = format.attribute(VertexAttributeSemantic::Color).copied();
        let uv = format.attribute(VertexAttributeSemantic::TexCoord0).copied();

        let uniform = |offset: Option<usize>, len: usize| {
            offset.and_then(|o| command.values.get(o..o + len))
        };
        let matrix = uniform(shader.matrix, 16)
            .map(Mat4::from_cols_slice)
            .unwrap_or(Mat4::IDENTITY);
        let tint = uniform(shader.color, 4)
            .map(Vec4::from_slice)
            .unwrap_or(Vec4::ONE);
        let constant = Color::from_rgba(command.blend.rgba).to_vec4();

        let instance_position = mesh
            .instance_format
            .attribute(VertexAttributeSemantic::Position)
            .copied();
        let instance_count = element_count(&mesh.instance_format, &mesh.instances);

        // Take the attachments out of the texture map while drawing into them.
        let mut targets: Vec<(TextureId, SoftTexture)> = framebuffer
            .attachments
            .iter()
            .filter_map(|id| self.textures.remove_entry(id))
            .collect();
        let sampled = command
            .textures
            .first()
            .copied()
            .flatten()
            .and_then(|id| self.textures.get(&id));

        let mut bounds_rect = command
            .viewport
            .intersect(&Rect::from_dimensions(framebuffer.width, framebuffer.height));
        if let Some(scissor) = &command.scissor {
            bounds_rect = bounds_rect.intersect(scissor);
        }
        let bounds = PixelBounds::covering(&bounds_rect, framebuffer.width, framebuffer.height);

        let depth_index = targets
            .iter()
            .position(|(_, t)| t.format().is_depth_stencil());
        let depth_test = depth_index.filter(|_| command.depth != Compare::None);
        let stride = format.stride;
        let mut triangles = 0usize;
        let mut fragments = 0usize;

        // Each triangle is transformed and rasterized before the next one is built.
        let instances = if bounds.is_empty() { 0 } else { command.instance_count };
        for instance in 0..instances {
            let offset = match instance_position {
                Some(attribute) if instance < instance_count as u64 => read_attribute(
                    &mesh.instances,
                    mesh.instance_format.stride,
                    instance as usize,
                    &attribute,
                )
                .truncate(),
                _ => Vec3::ZERO,
            };
            for triangle in indices.chunks_exact(3) {
                let mut clip = [Vec4::ZERO; 3];
                let mut attributes = [(Vec4::ONE, Vec2::ZERO); 3];
                for (corner, &index) in triangle.iter().enumerate() {
                    let index = index as usize;
                    let p = read_attribute(&mesh.vertices, stride, index, &position);
                    clip[corner] = matrix * (p + offset.extend(0.0));
                    attributes[corner] = (
                        color.map_or(Vec4::ONE, |a| read_attribute(&mesh.vertices, stride, index, &a)),
                        uv.map_or(Vec2::ZERO, |a| {
                            read_attribute(&mesh.vertices, stride, index, &a).truncate().truncate()
                        }),
                    );
                }

                if clip.iter().any(|c| c.w <= 0.0) {
                    continue;
                }
                let ndc = clip.map(|c| c.truncate() / c.w);
                let area = (ndc[1].x - ndc[0].x) * (ndc[2].y - ndc[0].y)
                    - (ndc[2].x - ndc[0].x) * (ndc[1].y - ndc[0].y);
                if area == 0.0 {
                    continue;
                }
                let face = if area > 0.0 { Cull::FRONT } else { Cull::BACK };
                if command.cull.contains(face) {
                    continue;
                }

                let vertices = [0, 1, 2].map(|i| ScreenVertex {
                    position: to_screen(self.info.origin_bottom_left, ndc[i], &command.viewport),
                    color: attributes[i].0,
                    uv: attributes[i].1,
                });
                triangles += 1;

                raster::rasterize(vertices, bounds, |fragment| {
                    if let Some(d) = depth_test {
                        let stored = targets[d].1.depth(fragment.x, fragment.y).unwrap_or(1.0);
                        if !command.depth.passes(fragment.depth, stored) {
                            return;
                        }
                        targets[d].1.set_depth(fragment.x, fragment.y, fragment.depth);
                    }

                    let texel = sampled.map_or(Vec4::ONE, |t| t.sample(fragment.uv));
                    let src = fragment.color * tint * texel;
                    for (_, target) in targets.iter_mut() {
                        if !target.format().is_color() {
                            continue;
                        }
                        let src = if target.is_normalized() {
                            src.clamp(Vec4::ZERO, Vec4::ONE)
                        } else {
                            src
                        };
                        let dst = target.load(fragment.x, fragment.y);
                        let out = raster::blend(&command.blend, src, dst, constant);
                        target.store(fragment.x, fragment.y, out);
                    }
                    fragments += 1;
                });
            }
        }

        self.textures.extend(targets);
        log::trace!(
            "SoftwareBackend: drew {} triangles, {} fragments into {:?}",
            triangles,
            fragments,
            command.target
        );
        Ok(())
    }

    fn clear(&mut self, target: FrameBufferId, values: &ClearValues) -> BackendResult<()> {
        let framebuffer = self
            .framebuffers
            .get(&target)
            .ok_or_else(|| unknown(target))?;
        let color = Color::from_rgba(values.color).to_vec4();
        for id in &framebuffer.attachments {
            let Some(texture) = self.textures.get_mut(id) else {
                continue;
            };
            if texture.format().is_color() {
                if values.mask.contains(ClearMask::COLOR) {
                    texture.fill_color(color);
                }
                continue;
            }
            if values.mask.contains(ClearMask::DEPTH) {
                texture.fill_depth(values.depth);
            }
            if values.mask.contains(ClearMask::STENCIL) {
                texture.fill_stencil(values.stencil);
            }
        }
        Ok(())
    }

    fn stats(&self) -> BackendStats {
        BackendStats {
            textures: self.textures.len(),
            framebuffers: self.framebuffers.len(),
            shaders: self.shaders.len(),
            materials: self.materials.len(),
            meshes: self.meshes.len(),
        }
    }

    fn shutdown(&mut self) {
        log::debug!(
            "SoftwareBackend: shutting down with {} live objects",
            self.stats().total()
        );
        self.textures.clear();
        self.framebuffers.clear();
        self.shaders.clear();
        self.materials.clear();
        self.meshes.clear();
    }
}
