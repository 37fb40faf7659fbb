use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use audio_proxy_core::models::error::BackendError;
use audio_proxy_core::traits::buffer_backend::BufferBackend;
use audio_proxy_core::traits::device::AudioContext;
use audio_proxy_core::traits::listener_backend::ListenerBackend;
use audio_proxy_core::traits::source_backend::SourceBackend;

use crate::buffers::SoftBuffers;
use crate::listener::SoftListener;
use crate::sources::SoftSources;
use crate::ALC_INVALID_CONTEXT;

/// Identity of one context, shared by its backends.
///
/// Counts calls made while another context is current, which on a real
/// backend would land on the wrong objects.
#[derive(Debug)]
pub(crate) struct ContextTag {
    id: u64,
    current: Arc<AtomicU64>,
    stray: AtomicU64,
}

impl ContextTag {
    pub(crate) fn new(id: u64, current: Arc<AtomicU64>) -> Self {
        Self {
            id,
            current,
            stray: AtomicU64::new(0),
        }
    }

    pub(crate) fn touch(&self, operation: &str) {
        if self.current.load(Ordering::SeqCst) != self.id {
            self.stray.fetch_add(1, Ordering::SeqCst);
            log::warn!("{operation} issued while context {} is not current", self.id);
        }
    }
}

/// Emulated rendering context with its own buffer, source and listener
/// namespaces.
pub struct SoftContext {
    tag: Arc<ContextTag>,
    device_name: String,
    buffers: Arc<SoftBuffers>,
    sources: Arc<SoftSources>,
    listener: Arc<SoftListener>,
    disconnected: AtomicBool,
}

impl SoftContext {
    pub(crate) fn new(id: u64, current: Arc<AtomicU64>, device_name: &str) -> Self {
        let tag = Arc::new(ContextTag::new(id, current));
        let buffers = Arc::new(SoftBuffers::new(tag.clone()));
        Self {
            sources: Arc::new(SoftSources::new(tag.clone(), buffers.clone())),
            listener: Arc::new(SoftListener::new(tag.clone())),
            device_name: device_name.to_string(),
            disconnected: AtomicBool::new(false),
            buffers,
            tag,
        }
    }

    pub fn id(&self) -> u64 {
        self.tag.id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_current(&self) -> bool {
        self.tag.current.load(Ordering::SeqCst) == self.tag.id
    }

    /// Calls made on this context's objects while it was not current.
    pub fn stray_calls(&self) -> u64 {
        self.tag.stray.load(Ordering::SeqCst)
    }

    pub fn soft_buffers(&self) -> &Arc<SoftBuffers> {
        &self.buffers
    }

    pub fn soft_sources(&self) -> &Arc<SoftSources> {
        &self.sources
    }

    pub fn soft_listener(&self) -> &Arc<SoftListener> {
        &self.listener
    }

    /// Emulate the device going away: the context can no longer be made
    /// current.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    /// Let `elapsed` of playback time pass for every playing source.
    pub fn advance(&self, elapsed: Duration) {
        self.sources.advance(elapsed);
    }
}

impl AudioContext for SoftContext {
    fn make_current(&self) -> Result<(), BackendError> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(BackendError::new("alcMakeContextCurrent", ALC_INVALID_CONTEXT));
        }
        self.tag.current.store(self.tag.id, Ordering::SeqCst);
        log::trace!("context {} is current", self.tag.id);
        Ok(())
    }

    fn buffers(&self) -> Arc<dyn BufferBackend> {
        self.buffers.clone()
    }

    fn sources(&self) -> Arc<dyn SourceBackend> {
        self.sources.clone()
    }

    fn listener(&self) -> Arc<dyn ListenerBackend> {
        self.listener.clone()
    }
}
