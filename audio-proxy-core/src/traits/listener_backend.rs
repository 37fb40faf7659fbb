use crate::models::audio_models::{Orientation, Vec3};
use crate::models::error::BackendError;

/// The single listener of a context.
pub trait ListenerBackend: Send + Sync {
    fn gain(&self) -> Result<f32, BackendError>;
    fn set_gain(&self, gain: f32) -> Result<(), BackendError>;
    fn position(&self) -> Result<Vec3, BackendError>;
    fn set_position(&self, position: Vec3) -> Result<(), BackendError>;
    fn orientation(&self) -> Result<Orientation, BackendError>;
    fn set_orientation(&self, orientation: Orientation) -> Result<(), BackendError>;
}
