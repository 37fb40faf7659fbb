use std::fmt;
use std::sync::Weak;

use parking_lot::Mutex;

use crate::models::audio_models::{Orientation, Vec3};
use crate::registry::listener_controller::ListenerController;

/// Handle-less capability for the listener of the active context.
#[derive(Clone, Default)]
pub struct Listener {
    controller: Weak<Mutex<ListenerController>>,
}

impl Listener {
    pub(crate) fn new(controller: Weak<Mutex<ListenerController>>) -> Self {
        Self { controller }
    }

    fn with_controller<R>(&self, f: impl FnOnce(&mut ListenerController) -> R) -> Option<R> {
        let controller = self.controller.upgrade()?;
        let mut controller = controller.lock();
        Some(f(&mut controller))
    }

    pub fn is_valid(&self) -> bool {
        self.controller.strong_count() > 0
    }

    pub fn gain(&self) -> f32 {
        self.with_controller(|c| c.gain()).unwrap_or(-1.0)
    }

    pub fn set_gain(&self, gain: f32) -> bool {
        self.with_controller(|c| c.set_gain(gain)).unwrap_or(false)
    }

    pub fn position(&self) -> Vec3 {
        self.with_controller(|c| c.position()).unwrap_or([f32::NAN; 3])
    }

    pub fn set_position(&self, position: Vec3) -> bool {
        self.with_controller(|c| c.set_position(position)).unwrap_or(false)
    }

    pub fn orientation(&self) -> Orientation {
        self.with_controller(|c| c.orientation())
            .unwrap_or_else(Orientation::nan)
    }

    pub fn set_orientation(&self, orientation: Orientation) -> bool {
        self.with_controller(|c| c.set_orientation(orientation)).unwrap_or(false)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.controller, &other.controller)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("valid", &self.is_valid()).finish()
    }
}
