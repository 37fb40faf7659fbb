use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use audio_proxy_core::models::audio_models::DeviceDescription;
use audio_proxy_core::models::error::BackendError;
use audio_proxy_core::traits::device::{AudioContext, AudioDevice, AudioDriver};

use crate::context::SoftContext;
use crate::ALC_INVALID_DEVICE;

#[derive(Default)]
struct DriverState {
    contexts: Vec<Weak<SoftContext>>,
    failing_devices: HashSet<String>,
    failing_contexts: HashSet<String>,
}

struct Shared {
    names: Vec<String>,
    current: Arc<AtomicU64>,
    next_context_id: AtomicU64,
    state: Mutex<DriverState>,
}

/// Emulated driver exposing a fixed list of output devices.
///
/// The first device in the list is the system default. Every context it
/// creates is tracked weakly so tests can inspect them.
///
/// ```
/// use audio_proxy_soft::SoftDriver;
/// use audio_proxy_core::{AudioConfiguration, AudioSystem};
///
/// let driver = SoftDriver::new(&["Speakers", "Headphones"]);
/// let mut system = AudioSystem::new(driver.clone());
/// system.initialize(AudioConfiguration::default()).unwrap();
/// assert_eq!(system.device_name(), Some("Speakers"));
/// ```
#[derive(Clone)]
pub struct SoftDriver {
    shared: Arc<Shared>,
}

impl SoftDriver {
    pub fn new(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                names: names.iter().map(|n| n.to_string()).collect(),
                current: Arc::new(AtomicU64::new(0)),
                next_context_id: AtomicU64::new(1),
                state: Mutex::new(DriverState::default()),
            }),
        })
    }

    /// Make `open_device` fail for `name`.
    pub fn fail_device(&self, name: &str) {
        self.shared.state.lock().failing_devices.insert(name.to_string());
    }

    /// Make context creation fail on `name` while the device still opens.
    pub fn fail_context_creation(&self, name: &str) {
        self.shared.state.lock().failing_contexts.insert(name.to_string());
    }

    /// Contexts that are still alive, oldest first.
    pub fn contexts(&self) -> Vec<Arc<SoftContext>> {
        let mut state = self.shared.state.lock();
        state.contexts.retain(|c| c.strong_count() > 0);
        state.contexts.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn current_context(&self) -> Option<Arc<SoftContext>> {
        self.contexts().into_iter().find(|c| c.is_current())
    }
}

/// An open emulated device.
pub struct SoftDevice {
    name: String,
    shared: Arc<Shared>,
}

impl AudioDevice for SoftDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_context(&self) -> Result<Arc<dyn AudioContext>, BackendError> {
        let mut state = self.shared.state.lock();
        if state.failing_contexts.contains(&self.name) {
            return Err(BackendError::new("alcCreateContext", ALC_INVALID_DEVICE));
        }
        let id = self.shared.next_context_id.fetch_add(1, Ordering::SeqCst);
        let context = Arc::new(SoftContext::new(id, self.shared.current.clone(), &self.name));
        state.contexts.push(Arc::downgrade(&context));
        log::debug!("Created context {id} on {}", self.name);
        Ok(context)
    }
}

impl AudioDriver for SoftDriver {
    fn devices(&self) -> Result<Vec<DeviceDescription>, BackendError> {
        Ok(self
            .shared
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| DeviceDescription {
                name: name.clone(),
                is_default: i == 0,
            })
            .collect())
    }

    fn open_device(&self, device: &DeviceDescription) -> Result<Arc<dyn AudioDevice>, BackendError> {
        let name = if device.name.is_empty() {
            self.shared.names.first()
        } else {
            self.shared.names.iter().find(|n| **n == device.name)
        }
        .ok_or(BackendError::new("alcOpenDevice", ALC_INVALID_DEVICE))?;

        if self.shared.state.lock().failing_devices.contains(name) {
            log::warn!("Device {name} is unavailable");
            return Err(BackendError::new("alcOpenDevice", ALC_INVALID_DEVICE));
        }
        Ok(Arc::new(SoftDevice {
            name: name.clone(),
            shared: self.shared.clone(),
        }))
    }
}
