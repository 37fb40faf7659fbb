use std::sync::Arc;

use super::buffer_backend::BufferBackend;
use super::listener_backend::ListenerBackend;
use super::source_backend::SourceBackend;
use crate::models::audio_models::DeviceDescription;
use crate::models::error::BackendError;

/// A rendering context on an open device.
///
/// Backend calls act on whichever context is current, so callers make a
/// context current before touching its resources.
pub trait AudioContext: Send + Sync {
    fn make_current(&self) -> Result<(), BackendError>;
    fn buffers(&self) -> Arc<dyn BufferBackend>;
    fn sources(&self) -> Arc<dyn SourceBackend>;
    fn listener(&self) -> Arc<dyn ListenerBackend>;
}

/// An open output device.
pub trait AudioDevice: Send + Sync {
    fn name(&self) -> &str;
    fn create_context(&self) -> Result<Arc<dyn AudioContext>, BackendError>;
}

/// Entry point of a backend: lists and opens devices.
pub trait AudioDriver: Send + Sync {
    fn devices(&self) -> Result<Vec<DeviceDescription>, BackendError>;

    /// Open `device`; the default description opens the system default.
    fn open_device(&self, device: &DeviceDescription) -> Result<Arc<dyn AudioDevice>, BackendError>;
}
