use super::handle_backend::{Handle, HandleBackend};
use crate::models::audio_models::Vec3;
use crate::models::error::BackendError;
use crate::models::state::SourceState;

/// Per-source playback control and properties.
///
/// Offsets are raw sample offsets into the bound buffer or, for a queue,
/// into the concatenation of the queued buffers.
pub trait SourceBackend: HandleBackend {
    fn play(&self, handle: Handle) -> Result<(), BackendError>;
    fn pause(&self, handle: Handle) -> Result<(), BackendError>;
    fn stop(&self, handle: Handle) -> Result<(), BackendError>;
    fn rewind(&self, handle: Handle) -> Result<(), BackendError>;

    /// Start every source in `handles` with a single backend call.
    fn play_batch(&self, handles: &[Handle]) -> Result<(), BackendError>;
    /// Pause every source in `handles` with a single backend call.
    fn pause_batch(&self, handles: &[Handle]) -> Result<(), BackendError>;

    fn state(&self, handle: Handle) -> Result<SourceState, BackendError>;

    /// Bind one buffer statically, or unbind everything with `None`.
    fn bind_buffer(&self, handle: Handle, buffer: Option<Handle>) -> Result<(), BackendError>;
    /// Append buffers to the source's streaming queue.
    fn queue_buffers(&self, handle: Handle, buffers: &[Handle]) -> Result<(), BackendError>;
    fn queued_count(&self, handle: Handle) -> Result<u32, BackendError>;
    fn processed_count(&self, handle: Handle) -> Result<u32, BackendError>;

    fn sample_offset(&self, handle: Handle) -> Result<u32, BackendError>;
    fn set_sample_offset(&self, handle: Handle, offset: u32) -> Result<(), BackendError>;

    fn position(&self, handle: Handle) -> Result<Vec3, BackendError>;
    fn set_position(&self, handle: Handle, position: Vec3) -> Result<(), BackendError>;
    fn pitch(&self, handle: Handle) -> Result<f32, BackendError>;
    fn set_pitch(&self, handle: Handle, pitch: f32) -> Result<(), BackendError>;
    fn gain(&self, handle: Handle) -> Result<f32, BackendError>;
    fn set_gain(&self, handle: Handle, gain: f32) -> Result<(), BackendError>;
    fn is_relative(&self, handle: Handle) -> Result<bool, BackendError>;
    fn set_relative(&self, handle: Handle, relative: bool) -> Result<(), BackendError>;
    fn is_looping(&self, handle: Handle) -> Result<bool, BackendError>;
    fn set_looping(&self, handle: Handle, looping: bool) -> Result<(), BackendError>;
}
