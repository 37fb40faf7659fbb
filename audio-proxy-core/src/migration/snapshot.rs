use crate::models::audio_models::{Orientation, Vec3};
use crate::models::state::SourceState;
use crate::registry::source_registry::SourceBinding;

/// Everything needed to recreate a source on another context.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSnapshot {
    pub state: SourceState,
    pub binding: SourceBinding,
    pub sample_offset: u32,
    pub position: Vec3,
    pub pitch: f32,
    pub gain: f32,
    pub is_relative: bool,
    pub is_looping: bool,
}

/// Listener state carried across a migration. Fields the backend could not
/// report are `None` and are not re-applied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListenerSnapshot {
    pub gain: Option<f32>,
    pub position: Option<Vec3>,
    pub orientation: Option<Orientation>,
}
