//! Host-memory texture storage.

use glam::{Vec2, Vec4};

use crate::backend::{BackendError, BackendResult};
use crate::types::{TextureDescriptor, TextureFormat};

enum Planes {
    /// Raw bytes in the format's layout.
    Color(Vec<u8>),
    /// Depth in `[0, 1]` plus an optional stencil plane.
    Depth { depth: Vec<f32>, stencil: Vec<u8> },
}

/// A texture living in host memory.
pub(super) struct SoftTexture {
    width: u32,
    height: u32,
    format: TextureFormat,
    planes: Planes,
}

fn allocate<T: Clone>(len: usize, value: T) -> BackendResult<Vec<T>> {
    let mut plane = Vec::new();
    plane
        .try_reserve_exact(len)
        .map_err(|_| BackendError::OutOfMemory)?;
    plane.resize(len, value);
    Ok(plane)
}

fn unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn read_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

const DEPTH24_MAX: f32 = 0x00ff_ffff as f32;

impl SoftTexture {
    pub(super) fn new(descriptor: &TextureDescriptor) -> BackendResult<Self> {
        let format = descriptor.format;
        let texels = descriptor.width as usize * descriptor.height as usize;
        let planes = if format.is_depth_stencil() {
            let stencil_len = if format.has_stencil() { texels } else { 0 };
            Planes::Depth {
                depth: allocate(texels, 1.0)?,
                stencil: allocate(stencil_len, 0)?,
            }
        } else {
            Planes::Color(allocate(descriptor.byte_size(), 0)?)
        };
        Ok(Self {
            width: descriptor.width,
            height: descriptor.height,
            format,
            planes,
        })
    }

    pub(super) fn width(&self) -> u32 {
        self.width
    }

    pub(super) fn height(&self) -> u32 {
        self.height
    }

    pub(super) fn format(&self) -> TextureFormat {
        self.format
    }

    /// Returns true if stored values are clamped to `[0, 1]`.
    pub(super) fn is_normalized(&self) -> bool {
        !matches!(
            self.format,
            TextureFormat::R32Float | TextureFormat::Rgba32Float
        )
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Replace the contents from bytes in the format's layout.
    pub(super) fn write(&mut self, data: &[u8]) -> BackendResult<()> {
        let expected = self.format.image_size(self.width, self.height);
        if data.len() != expected {
            return Err(BackendError::InvalidParameter(format!(
                "texture data is {} bytes, expected {expected}",
                data.len()
            )));
        }
        let format = self.format;
        match &mut self.planes {
            Planes::Color(bytes) => bytes.copy_from_slice(data),
            Planes::Depth { depth, stencil } => match format {
                TextureFormat::Depth16Unorm => {
                    for (d, chunk) in depth.iter_mut().zip(data.chunks_exact(2)) {
                        *d = u16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 65535.0;
                    }
                }
                TextureFormat::Depth32Float => {
                    for (d, chunk) in depth.iter_mut().zip(data.chunks_exact(4)) {
                        *d = read_f32(chunk);
                    }
                }
                _ => {
                    for ((d, s), chunk) in depth
                        .iter_mut()
                        .zip(stencil.iter_mut())
                        .zip(data.chunks_exact(4))
                    {
                        let packed = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                        *d = (packed & 0x00ff_ffff) as f32 / DEPTH24_MAX;
                        *s = (packed >> 24) as u8;
                    }
                }
            },
        }
        Ok(())
    }

    /// Contents as bytes in the format's layout.
    pub(super) fn read(&self) -> Vec<u8> {
        match &self.planes {
            Planes::Color(bytes) => bytes.clone(),
            Planes::Depth { depth, stencil } => match self.format {
                TextureFormat::Depth16Unorm => depth
                    .iter()
                    .flat_map(|d| ((d.clamp(0.0, 1.0) * 65535.0).round() as u16).to_le_bytes())
                    .collect(),
                TextureFormat::Depth32Float => depth.iter().flat_map(|d| d.to_le_bytes()).collect(),
                _ => depth
                    .iter()
                    .zip(stencil.iter())
                    .flat_map(|(d, s)| {
                        let depth = (d.clamp(0.0, 1.0) * DEPTH24_MAX).round() as u32;
                        (depth | (*s as u32) << 24).to_le_bytes()
                    })
                    .collect(),
            },
        }
    }

    /// Load the texel at `(x, y)` as RGBA. Depth reads as `(d, d, d, 1)`.
    pub(super) fn load(&self, x: u32, y: u32) -> Vec4 {
        let index = self.index(x, y);
        let bytes = match &self.planes {
            Planes::Color(bytes) => bytes,
            Planes::Depth { depth, .. } => {
                let d = depth[index];
                return Vec4::new(d, d, d, 1.0);
            }
        };
        let offset = index * self.format.block_size() as usize;
        let texel = &bytes[offset..offset + self.format.block_size() as usize];
        let unorm = |i: usize| texel[i] as f32 / 255.0;
        match self.format {
            TextureFormat::R8Unorm => Vec4::new(unorm(0), 0.0, 0.0, 1.0),
            TextureFormat::Rg8Unorm => Vec4::new(unorm(0), unorm(1), 0.0, 1.0),
            TextureFormat::Bgra8Unorm => Vec4::new(unorm(2), unorm(1), unorm(0), unorm(3)),
            TextureFormat::R32Float => Vec4::new(read_f32(texel), 0.0, 0.0, 1.0),
            TextureFormat::Rgba32Float => Vec4::new(
                read_f32(&texel[0..]),
                read_f32(&texel[4..]),
                read_f32(&texel[8..]),
                read_f32(&texel[12..]),
            ),
            _ => Vec4::new(unorm(0), unorm(1), unorm(2), unorm(3)),
        }
    }

    /// Store an RGBA value at `(x, y)`. Ignored for depth textures.
    pub(super) fn store(&mut self, x: u32, y: u32, value: Vec4) {
        let index = self.index(x, y);
        let format = self.format;
        let Planes::Color(bytes) = &mut self.planes else {
            return;
        };
        let size = format.block_size() as usize;
        let texel = &mut bytes[index * size..(index + 1) * size];
        match format {
            TextureFormat::R8Unorm => texel[0] = unorm8(value.x),
            TextureFormat::Rg8Unorm => {
                texel[0] = unorm8(value.x);
                texel[1] = unorm8(value.y);
            }
            TextureFormat::Bgra8Unorm => texel.copy_from_slice(&[
                unorm8(value.z),
                unorm8(value.y),
                unorm8(value.x),
                unorm8(value.w),
            ]),
            TextureFormat::R32Float => texel.copy_from_slice(&value.x.to_le_bytes()),
            TextureFormat::Rgba32Float => {
                for (chunk, v) in texel.chunks_exact_mut(4).zip(value.to_array()) {
                    chunk.copy_from_slice(&v.to_le_bytes());
                }
            }
            _ => texel.copy_from_slice(&[
                unorm8(value.x),
                unorm8(value.y),
                unorm8(value.z),
                unorm8(value.w),
            ]),
        }
    }

    /// Nearest-neighbour sample with clamp-to-edge addressing.
    pub(super) fn sample(&self, uv: Vec2) -> Vec4 {
        let x = (uv.x * self.width as f32).floor();
        let y = (uv.y * self.height as f32).floor();
        let x = x.clamp(0.0, (self.width - 1) as f32) as u32;
        let y = y.clamp(0.0, (self.height - 1) as f32) as u32;
        self.load(x, y)
    }

    /// Stored depth at `(x, y)`, or `None` for color textures.
    pub(super) fn depth(&self, x: u32, y: u32) -> Option<f32> {
        match &self.planes {
            Planes::Depth { depth, .. } => Some(depth[self.index(x, y)]),
            Planes::Color(_) => None,
        }
    }

    pub(super) fn set_depth(&mut self, x: u32, y: u32, value: f32) {
        let index = self.index(x, y);
        if let Planes::Depth { depth, .. } = &mut self.planes {
            depth[index] = value;
        }
    }

    pub(super) fn fill_color(&mut self, value: Vec4) {
        if !self.format.is_color() {
            return;
        }
        for y in 0..self.height {
            for x in 0..self.width {
                self.store(x, y, value);
            }
        }
    }

    pub(super) fn fill_depth(&mut self, value: f32) {
        if let Planes::Depth { depth, .. } = &mut self.planes {
            depth.fill(value.clamp(0.0, 1.0));
        }
    }

    pub(super) fn fill_stencil(&mut self, value: u8) {
        if let Planes::Depth { stencil, .. } = &mut self.planes {
            stencil.fill(value);
        }
    }
}
