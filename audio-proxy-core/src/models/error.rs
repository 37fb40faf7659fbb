use thiserror::Error;

/// A failed call into the audio backend.
///
/// Carries the backend operation name and its raw error code. Registry
/// accessors never pass this on to the caller: they log it and fall back to
/// a `false` return or a sentinel value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation} failed: {code:#x}")]
pub struct BackendError {
    pub operation: &'static str,
    pub code: u32,
}

impl BackendError {
    pub fn new(operation: &'static str, code: u32) -> Self {
        Self { operation, code }
    }

    /// The generator returned fewer handles than requested.
    pub fn exhausted(operation: &'static str) -> Self {
        Self { operation, code: 0 }
    }
}

/// Errors returned by the audio system facade and configuration storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProxyError {
    #[error("audio system not initialized")]
    NotInitialized,

    #[error("audio system already initialized")]
    AlreadyInitialized,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("device not available: {0}")]
    DeviceNotAvailable(String),

    #[error("context creation failed: {0}")]
    ContextCreationFailed(String),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("storage error: {0}")]
    StorageError(String),
}
