use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::DecodedAudio;
use crate::registry::buffer_registry::BufferRegistry;
use crate::traits::handle_backend::Handle;

/// Cheap, clonable capability for one pooled buffer.
///
/// All clones share fate: resetting any of them invalidates the rest. The
/// proxy remembers the handle and the registry epoch it was issued at and
/// re-resolves through the registry on every call, so it keeps working
/// across device migrations.
#[derive(Clone, Default)]
pub struct Buffer {
    handle: Handle,
    epoch: usize,
    registry: Weak<Mutex<BufferRegistry>>,
}

impl Buffer {
    pub(crate) fn new(handle: Handle, epoch: usize, registry: Weak<Mutex<BufferRegistry>>) -> Self {
        Self {
            handle,
            epoch,
            registry,
        }
    }

    fn with_registry<R>(&self, f: impl FnOnce(&mut BufferRegistry, Handle) -> R) -> Option<R> {
        let registry = self.registry.upgrade()?;
        let mut registry = registry.lock();
        let handle = registry.resolve(self.handle, self.epoch)?;
        if !registry.is_valid(handle) {
            return None;
        }
        Some(f(&mut registry, handle))
    }

    fn live<R>(&self, f: impl FnOnce(&mut BufferRegistry, Handle) -> R) -> Option<R> {
        let result = self.with_registry(f);
        debug_assert!(result.is_some(), "buffer {} used after reset", self.handle);
        result
    }

    pub fn is_valid(&self) -> bool {
        self.with_registry(|_, _| ()).is_some()
    }

    /// Current backend handle, or `None` once the buffer is gone.
    pub fn handle(&self) -> Option<Handle> {
        self.with_registry(|_, handle| handle)
    }

    pub(crate) fn belongs_to(&self, registry: &Arc<Mutex<BufferRegistry>>) -> bool {
        std::ptr::eq(self.registry.as_ptr(), Arc::as_ptr(registry))
    }

    pub fn set_data(&self, content: Arc<DecodedAudio>) -> bool {
        self.live(|r, h| r.set_buffer_data(h, content)).unwrap_or(false)
    }

    pub fn set_name(&self, name: impl Into<String>) -> bool {
        self.live(|r, h| r.set_buffer_name(h, name)).unwrap_or(false)
    }

    pub fn name(&self) -> String {
        self.live(|r, h| r.buffer_name(h)).unwrap_or_default()
    }

    pub fn channel_count(&self) -> u16 {
        self.live(|r, h| r.channel_count(h)).unwrap_or(0)
    }

    pub fn frequency_hz(&self) -> u32 {
        self.live(|r, h| r.frequency_hz(h)).unwrap_or(0)
    }

    pub fn sample_count(&self) -> u32 {
        self.live(|r, h| r.sample_count(h)).unwrap_or(0)
    }

    pub fn duration(&self) -> Duration {
        self.live(|r, h| r.duration(h)).unwrap_or(Duration::ZERO)
    }

    pub fn content(&self) -> Option<Arc<DecodedAudio>> {
        self.live(|r, h| r.content(h)).flatten()
    }

    /// Return the buffer to its pool. Every clone becomes invalid.
    pub fn reset(&self) -> bool {
        self.live(|r, h| r.reset_buffer(h)).unwrap_or(false)
    }
}

/// Two proxies are equal when they reach the same live object; an
/// invalidated proxy equals nothing.
impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        if !Weak::ptr_eq(&self.registry, &other.registry) {
            return false;
        }
        match (self.handle(), other.handle()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("handle", &self.handle)
            .field("epoch", &self.epoch)
            .finish()
    }
}
