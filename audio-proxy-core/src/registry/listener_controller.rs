use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::migration::snapshot::ListenerSnapshot;
use crate::models::audio_models::{Orientation, Vec3, NAN_VEC3};
use crate::models::error::BackendError;
use crate::proxy::listener::Listener;
use crate::traits::listener_backend::ListenerBackend;

pub type SharedListener = Arc<Mutex<ListenerController>>;

fn report<T>(result: Result<T, BackendError>) -> Option<T> {
    result.map_err(|e| log::warn!("Listener: {e}")).ok()
}

/// Listener state of the current context.
pub struct ListenerController {
    backend: Arc<dyn ListenerBackend>,
    this: Weak<Mutex<ListenerController>>,
}

impl ListenerController {
    pub fn new_shared(backend: Arc<dyn ListenerBackend>) -> SharedListener {
        Arc::new_cyclic(|this| {
            Mutex::new(Self {
                backend,
                this: this.clone(),
            })
        })
    }

    pub fn get(&self) -> Listener {
        Listener::new(self.this.clone())
    }

    /// Point the controller at another context's listener.
    pub fn rebind(&mut self, backend: Arc<dyn ListenerBackend>) {
        self.backend = backend;
    }

    /// `-1.0` on failure.
    pub fn gain(&self) -> f32 {
        report(self.backend.gain()).unwrap_or(-1.0)
    }

    pub fn set_gain(&mut self, gain: f32) -> bool {
        report(self.backend.set_gain(gain)).is_some()
    }

    /// NaN components on failure.
    pub fn position(&self) -> Vec3 {
        report(self.backend.position()).unwrap_or(NAN_VEC3)
    }

    pub fn set_position(&mut self, position: Vec3) -> bool {
        report(self.backend.set_position(position)).is_some()
    }

    pub fn orientation(&self) -> Orientation {
        report(self.backend.orientation()).unwrap_or_else(Orientation::nan)
    }

    pub fn set_orientation(&mut self, orientation: Orientation) -> bool {
        report(self.backend.set_orientation(orientation)).is_some()
    }

    pub fn snapshot(&self) -> ListenerSnapshot {
        ListenerSnapshot {
            gain: report(self.backend.gain()),
            position: report(self.backend.position()),
            orientation: report(self.backend.orientation()),
        }
    }

    pub fn restore(&mut self, snapshot: &ListenerSnapshot) -> bool {
        let mut ok = true;
        if let Some(gain) = snapshot.gain {
            ok &= self.set_gain(gain);
        }
        if let Some(position) = snapshot.position {
            ok &= self.set_position(position);
        }
        if let Some(orientation) = snapshot.orientation {
            ok &= self.set_orientation(orientation);
        }
        ok
    }
}
