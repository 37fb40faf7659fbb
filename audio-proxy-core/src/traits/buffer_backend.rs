use super::handle_backend::{Handle, HandleBackend};
use crate::models::audio_models::DecodedAudio;
use crate::models::error::BackendError;

/// Buffer storage on the backend.
pub trait BufferBackend: HandleBackend {
    /// Upload PCM content into `handle`, replacing whatever it held.
    fn set_data(&self, handle: Handle, audio: &DecodedAudio) -> Result<(), BackendError>;
}
