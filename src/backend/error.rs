//! Backend error types.

use thiserror::Error;

/// Errors returned by [`GraphicsBackend`](super::GraphicsBackend) implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend initialization failed: {0}")]
    InitializationFailed(String),
    #[error("failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("failed to create framebuffer: {0}")]
    FrameBufferCreationFailed(String),
    #[error("failed to create shader: {0}")]
    ShaderCreationFailed(String),
    #[error("failed to create material: {0}")]
    MaterialCreationFailed(String),
    #[error("failed to create mesh: {0}")]
    MeshCreationFailed(String),
    #[error("unknown backend object: {0}")]
    UnknownResource(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("GPU device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;
