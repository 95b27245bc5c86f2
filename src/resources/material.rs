//! Material resource.
//!
//! A [`Material`] binds a parameter block to a [`Shader`](super::Shader). The
//! block is laid out in the shader's uniform order: every value uniform takes
//! `components * array_length` floats, every `Texture2D` uniform takes
//! `array_length` texture slots. Parameters live on the CPU and are snapshotted
//! into each draw, so changing a material between two `render` calls affects
//! only the second.

use std::sync::Arc;

use glam::{Mat4, Vec4};
use parking_lot::Mutex;

use crate::backend::{MaterialId, TextureId};
use crate::device::{DeviceLink, DeviceShared};
use crate::error::GraphicsError;
use crate::types::{UniformInfo, UniformType};

use super::{GpuResource, Linked, ShaderRef, TextureRef};

/// Where a uniform lives inside the material's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Values { offset: usize, len: usize },
    Textures { first: usize, count: usize },
    Sampler,
}

#[derive(Debug, Default)]
struct Parameters {
    values: Vec<f32>,
    textures: Vec<TextureRef>,
}

/// A shader plus the uniform values and textures used to draw with it.
pub struct Material {
    link: DeviceLink,
    id: MaterialId,
    shader: ShaderRef,
    uniforms: Vec<UniformInfo>,
    slots: Vec<Slot>,
    parameters: Mutex<Parameters>,
}

impl Material {
    pub(crate) fn new(link: DeviceLink, id: MaterialId, shader: ShaderRef) -> Self {
        let uniforms = shader
            .resource()
            .map(|s| s.uniforms().to_vec())
            .unwrap_or_default();

        let mut slots = Vec::with_capacity(uniforms.len());
        let mut value_count = 0;
        let mut texture_count = 0;
        for uniform in &uniforms {
            let slot = match uniform.ty {
                UniformType::Texture2D => {
                    let count = uniform.array_length as usize;
                    let slot = Slot::Textures {
                        first: texture_count,
                        count,
                    };
                    texture_count += count;
                    slot
                }
                UniformType::Sampler2D => Slot::Sampler,
                _ => {
                    let len = uniform.float_count();
                    let slot = Slot::Values {
                        offset: value_count,
                        len,
                    };
                    value_count += len;
                    slot
                }
            };
            slots.push(slot);
        }

        Self {
            link,
            id,
            shader,
            uniforms,
            slots,
            parameters: Mutex::new(Parameters {
                values: vec![0.0; value_count],
                textures: vec![TextureRef::invalid(); texture_count],
            }),
        }
    }

    /// Backend object id.
    pub fn id(&self) -> MaterialId {
        self.id
    }

    /// The shader this material draws with.
    pub fn shader(&self) -> &ShaderRef {
        &self.shader
    }

    fn slot(&self, name: &str) -> Result<Slot, GraphicsError> {
        self.uniforms
            .iter()
            .position(|u| u.name == name)
            .map(|i| self.slots[i])
            .ok_or_else(|| GraphicsError::InvalidParameter(format!("no uniform named '{name}'")))
    }

    /// Write floats into a value uniform, starting at its first element.
    ///
    /// Fails if the uniform does not exist, is a texture/sampler slot, or
    /// `values` is longer than the uniform.
    pub fn set_value(&self, name: &str, values: &[f32]) -> Result<(), GraphicsError> {
        let Slot::Values { offset, len } = self.slot(name)? else {
            return Err(GraphicsError::InvalidParameter(format!(
                "uniform '{name}' does not hold values"
            )));
        };
        if values.len() > len {
            return Err(GraphicsError::InvalidParameter(format!(
                "uniform '{name}' holds {len} floats, got {}",
                values.len()
            )));
        }
        self.parameters.lock().values[offset..offset + values.len()].copy_from_slice(values);
        Ok(())
    }

    /// Set a `Float4` uniform.
    pub fn set_vec4(&self, name: &str, value: Vec4) -> Result<(), GraphicsError> {
        self.set_value(name, &value.to_array())
    }

    /// Set a `Mat4x4` uniform (column major).
    pub fn set_mat4(&self, name: &str, value: &Mat4) -> Result<(), GraphicsError> {
        self.set_value(name, &value.to_cols_array())
    }

    /// Read the full contents of a value uniform.
    pub fn get_value(&self, name: &str) -> Option<Vec<f32>> {
        match self.slot(name).ok()? {
            Slot::Values { offset, len } => {
                Some(self.parameters.lock().values[offset..offset + len].to_vec())
            }
            _ => None,
        }
    }

    /// Bind a texture to the first element of a `Texture2D` uniform.
    pub fn set_texture(&self, name: &str, texture: &TextureRef) -> Result<(), GraphicsError> {
        self.set_texture_at(name, 0, texture)
    }

    /// Bind a texture to element `index` of a `Texture2D` uniform.
    pub fn set_texture_at(
        &self,
        name: &str,
        index: usize,
        texture: &TextureRef,
    ) -> Result<(), GraphicsError> {
        let Slot::Textures { first, count } = self.slot(name)? else {
            return Err(GraphicsError::InvalidParameter(format!(
                "uniform '{name}' is not a texture"
            )));
        };
        if index >= count {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture index {index} out of range for '{name}' ({count})"
            )));
        }
        let previous = std::mem::replace(
            &mut self.parameters.lock().textures[first + index],
            texture.clone(),
        );
        // Released outside the parameter lock.
        drop(previous);
        Ok(())
    }

    /// The texture bound to the first element of a `Texture2D` uniform.
    pub fn get_texture(&self, name: &str) -> TextureRef {
        match self.slot(name) {
            Ok(Slot::Textures { first, count }) if count > 0 => self
                .parameters
                .lock()
                .textures
                .get(first)
                .cloned()
                .unwrap_or_default(),
            _ => TextureRef::invalid(),
        }
    }

    /// Copy of the parameter block plus the backend ids of bound textures.
    ///
    /// Textures that are invalid or owned by another device read as unbound.
    pub(crate) fn snapshot(&self, device: &Arc<DeviceShared>) -> (Vec<f32>, Vec<Option<TextureId>>) {
        let parameters = self.parameters.lock();
        let textures = parameters
            .textures
            .iter()
            .map(|t| {
                t.get()
                    .filter(|t| t.link().belongs_to(device))
                    .map(|t| t.id())
            })
            .collect();
        (parameters.values.clone(), textures)
    }
}

impl Linked for Material {
    fn link(&self) -> &DeviceLink {
        &self.link
    }
}

impl GpuResource for Material {}

impl Drop for Material {
    fn drop(&mut self) {
        if let Some(device) = self.link.live() {
            device.with_backend(|backend| backend.destroy_material(self.id));
            log::trace!("Material: released {:?}", self.id);
        }
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("id", &self.id)
            .field("shader", &self.shader)
            .finish()
    }
}

static_assertions::assert_impl_all!(Material: Send, Sync);
