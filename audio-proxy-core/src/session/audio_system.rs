use std::sync::Arc;

use crate::migration::coordinator::MigrationCoordinator;
use crate::models::audio_models::DeviceDescription;
use crate::models::config::AudioConfiguration;
use crate::models::error::ProxyError;
use crate::models::migration::MigrationReport;
use crate::proxy::buffer::Buffer;
use crate::proxy::listener::Listener;
use crate::proxy::source::Source;
use crate::registry::buffer_registry::{BufferRegistry, SharedBuffers};
use crate::registry::listener_controller::{ListenerController, SharedListener};
use crate::registry::source_registry::{SharedSources, SourceRegistry};
use crate::traits::device::{AudioContext, AudioDevice, AudioDriver};
use crate::traits::handle_backend::Handle;

/// Everything that exists while the system is initialized.
struct ActiveSystem {
    config: AudioConfiguration,
    device: Arc<dyn AudioDevice>,
    context: Arc<dyn AudioContext>,
    listener: SharedListener,
    buffers: SharedBuffers,
    sources: SharedSources,
}

/// Library entry point: owns the device, its context, the listener and both
/// registries.
///
/// Lifecycle:
/// ```text
/// uninitialized → initialize → active ⟲ reinitialize → deinitialize → uninitialized
/// ```
/// Reinitializing onto a different device migrates every live buffer and
/// source; proxies handed out before the switch keep working.
pub struct AudioSystem {
    driver: Arc<dyn AudioDriver>,
    active: Option<ActiveSystem>,
}

impl AudioSystem {
    pub fn new(driver: Arc<dyn AudioDriver>) -> Self {
        Self {
            driver,
            active: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }

    pub fn available_devices(&self) -> Result<Vec<DeviceDescription>, ProxyError> {
        Ok(self.driver.devices()?)
    }

    fn open(&self, config: &AudioConfiguration) -> Result<(Arc<dyn AudioDevice>, Arc<dyn AudioContext>), ProxyError> {
        let device = self
            .driver
            .open_device(&config.device)
            .map_err(|e| ProxyError::DeviceNotAvailable(format!("{}: {e}", config.device)))?;
        let context = device
            .create_context()
            .map_err(|e| ProxyError::ContextCreationFailed(format!("{}: {e}", device.name())))?;
        Ok((device, context))
    }

    /// Open the configured device and set up empty registries.
    pub fn initialize(&mut self, config: AudioConfiguration) -> Result<(), ProxyError> {
        if self.active.is_some() {
            return Err(ProxyError::AlreadyInitialized);
        }
        config.validate().map_err(ProxyError::ConfigurationFailed)?;

        let (device, context) = self.open(&config).map_err(|e| {
            log::error!("Failed to initialize audio: {e}");
            e
        })?;
        context.make_current()?;

        let mut buffers = BufferRegistry::new(context.buffers());
        buffers.initialize(config.buffer_batch)?;
        let buffers = buffers.into_shared();
        let mut sources = SourceRegistry::new(context.sources(), buffers.clone());
        sources.initialize(config.source_batch)?;
        let sources = sources.into_shared();
        let listener = ListenerController::new_shared(context.listener());

        log::debug!("audio initialized on \"{}\" with {config}", device.name());
        self.active = Some(ActiveSystem {
            config,
            device,
            context,
            listener,
            buffers,
            sources,
        });
        Ok(())
    }

    /// Apply a new configuration.
    ///
    /// Same device: only the batch sizes change and `None` is returned.
    /// Different device: all live state is migrated and the report is
    /// returned. If the new device or context cannot be created, or the
    /// migration aborts, the previous device stays active and untouched.
    pub fn reinitialize(&mut self, config: AudioConfiguration) -> Result<Option<MigrationReport>, ProxyError> {
        config.validate().map_err(ProxyError::ConfigurationFailed)?;
        let Some(active) = self.active.as_ref() else {
            return Err(ProxyError::NotInitialized);
        };

        if active.config.device == config.device {
            active.buffers.lock().initialize(config.buffer_batch)?;
            active.sources.lock().initialize(config.source_batch)?;
            if let Some(active) = self.active.as_mut() {
                active.config = config;
            }
            return Ok(None);
        }

        let (device, context) = self.open(&config).map_err(|e| {
            log::error!("Keeping \"{}\": {e}", active.device.name());
            e
        })?;

        let coordinator = MigrationCoordinator {
            old_context: active.context.as_ref(),
            new_context: context.as_ref(),
            buffers: &active.buffers,
            sources: &active.sources,
            listener: &active.listener,
            buffer_batch: config.buffer_batch,
            source_batch: config.source_batch,
        };
        let report = coordinator.run()?;
        if !report.is_clean() {
            log::warn!(
                "Migration to \"{}\" degraded {} buffers and {} sources",
                device.name(),
                report.degraded_buffers.len(),
                report.degraded_sources.len()
            );
        }

        if let Some(active) = self.active.as_mut() {
            log::debug!("audio moved from \"{}\" to \"{}\"", active.device.name(), device.name());
            active.config = config;
            active.context = context;
            active.device = device;
        }
        Ok(Some(report))
    }

    /// Release every buffer and source and close the device. Outstanding
    /// proxies become invalid.
    pub fn deinitialize(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        if let Err(e) = active.context.make_current() {
            log::warn!("Releasing audio resources without a current context: {e}");
        }
        let ActiveSystem {
            device,
            context,
            listener,
            buffers,
            sources,
            ..
        } = active;
        drop(sources);
        drop(buffers);
        drop(listener);
        drop(context);
        log::debug!("audio on \"{}\" deinitialized", device.name());
    }

    fn active(&self) -> Result<&ActiveSystem, ProxyError> {
        self.active.as_ref().ok_or(ProxyError::NotInitialized)
    }

    pub fn configuration(&self) -> Option<&AudioConfiguration> {
        self.active.as_ref().map(|active| &active.config)
    }

    pub fn device_name(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.device.name())
    }

    pub fn listener(&self) -> Result<Listener, ProxyError> {
        Ok(self.active()?.listener.lock().get())
    }

    pub fn spawn_buffer(&self) -> Result<Buffer, ProxyError> {
        Ok(self.active()?.buffers.lock().spawn()?)
    }

    pub fn buffer(&self, handle: Handle) -> Option<Buffer> {
        self.active.as_ref()?.buffers.lock().get(handle)
    }

    pub fn spawn_source(&self) -> Result<Source, ProxyError> {
        Ok(self.active()?.sources.lock().spawn()?)
    }

    pub fn source(&self, handle: Handle) -> Option<Source> {
        self.active.as_ref()?.sources.lock().get(handle)
    }

    pub fn buffers(&self) -> Option<&SharedBuffers> {
        self.active.as_ref().map(|active| &active.buffers)
    }

    pub fn sources(&self) -> Option<&SharedSources> {
        self.active.as_ref().map(|active| &active.sources)
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.deinitialize();
    }
}
