use std::sync::Arc;

use parking_lot::Mutex;

use audio_proxy_core::models::audio_models::{Orientation, Vec3};
use audio_proxy_core::models::error::BackendError;
use audio_proxy_core::traits::listener_backend::ListenerBackend;

use crate::context::ContextTag;
use crate::AL_INVALID_VALUE;

#[derive(Debug, Clone, Copy)]
struct ListenerState {
    gain: f32,
    position: Vec3,
    orientation: Orientation,
}

/// Listener of one context.
pub struct SoftListener {
    tag: Arc<ContextTag>,
    state: Mutex<ListenerState>,
}

impl SoftListener {
    pub(crate) fn new(tag: Arc<ContextTag>) -> Self {
        Self {
            tag,
            state: Mutex::new(ListenerState {
                gain: 1.0,
                position: [0.0; 3],
                orientation: Orientation::default(),
            }),
        }
    }
}

fn finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

impl ListenerBackend for SoftListener {
    fn gain(&self) -> Result<f32, BackendError> {
        self.tag.touch("alGetListenerf");
        Ok(self.state.lock().gain)
    }

    fn set_gain(&self, gain: f32) -> Result<(), BackendError> {
        self.tag.touch("alListenerf");
        if gain.is_nan() || gain < 0.0 {
            return Err(BackendError::new("alListenerf", AL_INVALID_VALUE));
        }
        self.state.lock().gain = gain;
        Ok(())
    }

    fn position(&self) -> Result<Vec3, BackendError> {
        self.tag.touch("alGetListenerfv");
        Ok(self.state.lock().position)
    }

    fn set_position(&self, position: Vec3) -> Result<(), BackendError> {
        self.tag.touch("alListenerfv");
        if !finite(&position) {
            return Err(BackendError::new("alListenerfv", AL_INVALID_VALUE));
        }
        self.state.lock().position = position;
        Ok(())
    }

    fn orientation(&self) -> Result<Orientation, BackendError> {
        self.tag.touch("alGetListenerfv");
        Ok(self.state.lock().orientation)
    }

    fn set_orientation(&self, orientation: Orientation) -> Result<(), BackendError> {
        self.tag.touch("alListenerfv");
        if !finite(&orientation.at) || !finite(&orientation.up) {
            return Err(BackendError::new("alListenerfv", AL_INVALID_VALUE));
        }
        self.state.lock().orientation = orientation;
        Ok(())
    }
}
