//! Mesh resource.

use parking_lot::Mutex;

use crate::backend::MeshId;
use crate::device::DeviceLink;
use crate::error::GraphicsError;
use crate::types::{IndexFormat, VertexFormat};

use super::{GpuResource, Linked};

/// Buffer layouts and counts mirrored from the backend.
#[derive(Debug, Clone, Default)]
struct MeshLayout {
    vertex_format: VertexFormat,
    vertex_count: u64,
    index_format: IndexFormat,
    index_count: u64,
    instance_format: VertexFormat,
    instance_count: u64,
}

/// Vertex, index and instance buffers.
///
/// Meshes start empty. Data is uploaded to the backend immediately; the handle
/// only caches formats and element counts so draws can be validated without a
/// backend round trip.
///
/// # Example
///
/// ```ignore
/// let mesh = graphics.create_mesh();
/// let mesh = mesh.get().unwrap();
/// mesh.set_vertices(&format, &[[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]])?;
/// mesh.set_indices_u16(&[0, 1, 2])?;
/// ```
pub struct Mesh {
    link: DeviceLink,
    id: MeshId,
    layout: Mutex<MeshLayout>,
}

fn validate_elements(format: &VertexFormat, data: &[u8], what: &str) -> Result<u64, GraphicsError> {
    if !format.is_valid() {
        return Err(GraphicsError::InvalidParameter(format!(
            "{what} format has attributes outside its stride"
        )));
    }
    let stride = format.stride as usize;
    if data.len() % stride != 0 {
        return Err(GraphicsError::InvalidParameter(format!(
            "{what} data is {} bytes, not a multiple of stride {stride}",
            data.len()
        )));
    }
    Ok((data.len() / stride) as u64)
}

impl Mesh {
    pub(crate) fn new(link: DeviceLink, id: MeshId) -> Self {
        Self {
            link,
            id,
            layout: Mutex::new(MeshLayout::default()),
        }
    }

    /// Backend object id.
    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Upload interleaved vertex data laid out by `format`.
    pub fn set_vertex_data(&self, format: &VertexFormat, data: &[u8]) -> Result<(), GraphicsError> {
        let count = validate_elements(format, data, "vertex")?;
        let device = self.link.device()?;
        device.with_backend(|backend| backend.write_mesh_vertices(self.id, format, data))?;

        let mut layout = self.layout.lock();
        layout.vertex_format = format.clone();
        layout.vertex_count = count;
        Ok(())
    }

    /// Upload vertices from any plain-old-data vertex type.
    pub fn set_vertices<T: bytemuck::Pod>(
        &self,
        format: &VertexFormat,
        vertices: &[T],
    ) -> Result<(), GraphicsError> {
        self.set_vertex_data(format, bytemuck::cast_slice(vertices))
    }

    /// Upload raw index data.
    pub fn set_index_data(&self, format: IndexFormat, data: &[u8]) -> Result<(), GraphicsError> {
        let size = format.size() as usize;
        if data.len() % size != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "index data is {} bytes, not a multiple of {size}",
                data.len()
            )));
        }
        let device = self.link.device()?;
        device.with_backend(|backend| backend.write_mesh_indices(self.id, format, data))?;

        let mut layout = self.layout.lock();
        layout.index_format = format;
        layout.index_count = (data.len() / size) as u64;
        Ok(())
    }

    /// Upload 16-bit indices.
    pub fn set_indices_u16(&self, indices: &[u16]) -> Result<(), GraphicsError> {
        self.set_index_data(IndexFormat::Uint16, bytemuck::cast_slice(indices))
    }

    /// Upload 32-bit indices.
    pub fn set_indices_u32(&self, indices: &[u32]) -> Result<(), GraphicsError> {
        self.set_index_data(IndexFormat::Uint32, bytemuck::cast_slice(indices))
    }

    /// Upload per-instance data laid out by `format`.
    pub fn set_instance_data(
        &self,
        format: &VertexFormat,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let count = validate_elements(format, data, "instance")?;
        let device = self.link.device()?;
        device.with_backend(|backend| backend.write_mesh_instances(self.id, format, data))?;

        let mut layout = self.layout.lock();
        layout.instance_format = format.clone();
        layout.instance_count = count;
        Ok(())
    }

    /// Upload per-instance data from any plain-old-data type.
    pub fn set_instances<T: bytemuck::Pod>(
        &self,
        format: &VertexFormat,
        instances: &[T],
    ) -> Result<(), GraphicsError> {
        self.set_instance_data(format, bytemuck::cast_slice(instances))
    }

    /// Layout of the vertex buffer.
    pub fn vertex_format(&self) -> VertexFormat {
        self.layout.lock().vertex_format.clone()
    }

    /// Number of vertices uploaded.
    pub fn vertex_count(&self) -> u64 {
        self.layout.lock().vertex_count
    }

    /// Format of the index buffer.
    pub fn index_format(&self) -> IndexFormat {
        self.layout.lock().index_format
    }

    /// Number of indices uploaded.
    pub fn index_count(&self) -> u64 {
        self.layout.lock().index_count
    }

    /// Number of instance elements uploaded.
    pub fn instance_count(&self) -> u64 {
        self.layout.lock().instance_count
    }
}

impl Linked for Mesh {
    fn link(&self) -> &DeviceLink {
        &self.link
    }
}

impl GpuResource for Mesh {}

impl Drop for Mesh {
    fn drop(&mut self) {
        if let Some(device) = self.link.live() {
            device.with_backend(|backend| backend.destroy_mesh(self.id));
            log::trace!("Mesh: released {:?}", self.id);
        }
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let layout = self.layout.lock();
        f.debug_struct("Mesh")
            .field("id", &self.id)
            .field("vertex_count", &layout.vertex_count)
            .field("index_count", &layout.index_count)
            .field("instance_count", &layout.instance_count)
            .finish()
    }
}

static_assertions::assert_impl_all!(Mesh: Send, Sync);
