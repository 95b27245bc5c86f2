//! Graphics error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur in the graphics system.
///
/// Resource factories on [`Graphics`](crate::Graphics) never surface these
/// directly: a failed creation is logged and collapsed into an invalid handle.
/// Lifecycle calls and [`Graphics::submit`](crate::Graphics::submit) return them.
#[derive(Error, Debug)]
pub enum GraphicsError {
    /// The device has not been initialized (or has already been shut down).
    #[error("graphics device is not initialized")]
    NotInitialized,
    /// The requested lifecycle transition is not allowed from the current state.
    #[error("invalid device state: {0}")]
    InvalidState(String),
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// A handle was invalid, released, or owned by another device.
    #[error("invalid resource: {0}")]
    InvalidResource(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A requested feature is not supported by the active backend.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// The backend reported an error.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Image data could not be decoded.
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    /// Reading image data failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
