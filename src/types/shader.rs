//! Backend-agnostic shader description.
//!
//! A [`ShaderData`] carries the per-stage sources plus the uniform interface the
//! shader exposes. Materials size their parameter block from that interface.

bitflags::bitflags! {
    /// Shader stages that can access a uniform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        /// Vertex shader stage.
        const VERTEX = 1 << 0;
        /// Fragment shader stage.
        const FRAGMENT = 1 << 1;
    }
}

/// Type of a shader uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Float2,
    Float3,
    Float4,
    /// 3 columns by 2 rows, the usual 2D affine transform.
    Mat3x2,
    Mat4x4,
    /// Texture slot; bound through [`Material::set_texture`](crate::Material::set_texture).
    Texture2D,
    /// Sampler slot paired with a texture.
    Sampler2D,
}

impl UniformType {
    /// Number of `f32` components a single element occupies in a material's
    /// parameter block. Resource slots occupy none.
    pub fn components(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 => 4,
            Self::Mat3x2 => 6,
            Self::Mat4x4 => 16,
            Self::Texture2D | Self::Sampler2D => 0,
        }
    }

    /// Returns true for texture slots.
    pub fn is_texture(self) -> bool {
        matches!(self, Self::Texture2D)
    }
}

/// A single uniform exposed by a shader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformInfo {
    /// Uniform name as referenced by materials.
    pub name: String,
    /// Uniform type.
    pub ty: UniformType,
    /// Stages that read the uniform.
    pub stages: ShaderStageFlags,
    /// Number of array elements (1 for scalars).
    pub array_length: u32,
}

impl UniformInfo {
    /// Create a uniform visible to both stages.
    pub fn new(name: impl Into<String>, ty: UniformType) -> Self {
        Self {
            name: name.into(),
            ty,
            stages: ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT,
            array_length: 1,
        }
    }

    /// Set the stage visibility.
    pub fn with_stages(mut self, stages: ShaderStageFlags) -> Self {
        self.stages = stages;
        self
    }

    /// Turn the uniform into an array.
    pub fn with_array_length(mut self, length: u32) -> Self {
        self.array_length = length;
        self
    }

    /// Number of `f32` values this uniform occupies.
    pub fn float_count(&self) -> usize {
        self.ty.components() * self.array_length as usize
    }
}

/// Shader sources and interface handed to [`Graphics::create_shader`](crate::Graphics::create_shader).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderData {
    /// Vertex stage source (language is backend dependent).
    pub vertex: String,
    /// Fragment stage source.
    pub fragment: String,
    /// Uniform interface.
    pub uniforms: Vec<UniformInfo>,
}

impl ShaderData {
    /// Create shader data from the two stage sources.
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            uniforms: Vec::new(),
        }
    }

    /// Declare a uniform.
    pub fn with_uniform(mut self, uniform: UniformInfo) -> Self {
        self.uniforms.push(uniform);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(UniformInfo::new("u_matrix", UniformType::Mat4x4).float_count(), 16);
        assert_eq!(
            UniformInfo::new("u_offsets", UniformType::Float2)
                .with_array_length(3)
                .float_count(),
            6
        );
        assert_eq!(UniformInfo::new("u_texture", UniformType::Texture2D).float_count(), 0);
    }
}
