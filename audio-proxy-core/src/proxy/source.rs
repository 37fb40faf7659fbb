use std::fmt;
use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;

use super::buffer::Buffer;
use crate::models::audio_models::Vec3;
use crate::models::state::{SourceState, SourceType};
use crate::registry::source_registry::SourceRegistry;
use crate::traits::handle_backend::Handle;

/// Cheap, clonable capability for one pooled source.
///
/// Shares fate with its clones and survives device migrations the same way
/// [`Buffer`] does.
#[derive(Clone, Default)]
pub struct Source {
    handle: Handle,
    epoch: usize,
    registry: Weak<Mutex<SourceRegistry>>,
}

impl Source {
    pub(crate) fn new(handle: Handle, epoch: usize, registry: Weak<Mutex<SourceRegistry>>) -> Self {
        Self {
            handle,
            epoch,
            registry,
        }
    }

    fn with_registry<R>(&self, f: impl FnOnce(&mut SourceRegistry, Handle) -> R) -> Option<R> {
        let registry = self.registry.upgrade()?;
        let mut registry = registry.lock();
        let handle = registry.resolve(self.handle, self.epoch)?;
        if !registry.is_valid(handle) {
            return None;
        }
        Some(f(&mut registry, handle))
    }

    fn live<R>(&self, f: impl FnOnce(&mut SourceRegistry, Handle) -> R) -> Option<R> {
        let result = self.with_registry(f);
        debug_assert!(result.is_some(), "source {} used after reset", self.handle);
        result
    }

    pub fn is_valid(&self) -> bool {
        self.with_registry(|_, _| ()).is_some()
    }

    pub fn handle(&self) -> Option<Handle> {
        self.with_registry(|_, handle| handle)
    }

    pub fn play(&self) -> bool {
        self.live(|r, h| r.play(h)).unwrap_or(false)
    }

    pub fn pause(&self) -> bool {
        self.live(|r, h| r.pause(h)).unwrap_or(false)
    }

    pub fn stop(&self) -> bool {
        self.live(|r, h| r.stop(h)).unwrap_or(false)
    }

    pub fn rewind(&self) -> bool {
        self.live(|r, h| r.rewind(h)).unwrap_or(false)
    }

    pub fn state(&self) -> SourceState {
        self.live(|r, h| r.state(h)).unwrap_or(SourceState::Unknown)
    }

    pub fn source_type(&self) -> SourceType {
        self.live(|r, h| r.source_type(h)).unwrap_or(SourceType::Undetermined)
    }

    /// Bind `buffer` as the only buffer of this source.
    pub fn set_static_buffer(&self, buffer: &Buffer) -> bool {
        // Resolved before the source lock is taken.
        let Some(buffer_handle) = buffer.handle() else {
            debug_assert!(false, "binding an invalid buffer");
            return false;
        };
        self.live(|r, h| {
            debug_assert!(buffer.belongs_to(r.buffers()), "buffer from another registry");
            r.set_static_buffer(h, Some(buffer_handle))
        })
        .unwrap_or(false)
    }

    /// Unbind whatever is bound.
    pub fn clear_buffer(&self) -> bool {
        self.live(|r, h| r.set_static_buffer(h, None)).unwrap_or(false)
    }

    pub fn queue_buffers(&self, buffers: &[Buffer]) -> bool {
        let Some(handles) = buffers.iter().map(Buffer::handle).collect::<Option<Vec<_>>>() else {
            debug_assert!(false, "queueing an invalid buffer");
            return false;
        };
        self.live(|r, h| {
            debug_assert!(buffers.iter().all(|b| b.belongs_to(r.buffers())));
            r.queue_buffers(h, &handles)
        })
        .unwrap_or(false)
    }

    pub fn static_buffer(&self) -> Option<Buffer> {
        self.live(|r, h| r.static_buffer(h)).flatten()
    }

    pub fn queued_buffers(&self) -> Vec<Buffer> {
        self.live(|r, h| r.queued_buffers(h)).unwrap_or_default()
    }

    pub fn queue_index(&self) -> u32 {
        self.live(|r, h| r.queue_index(h)).unwrap_or(0)
    }

    pub fn active_buffer(&self) -> Option<Buffer> {
        self.live(|r, h| r.active_buffer(h)).flatten()
    }

    pub fn active_buffers(&self) -> Vec<Buffer> {
        self.live(|r, h| r.active_buffers(h)).unwrap_or_default()
    }

    pub fn playback_duration(&self) -> Duration {
        self.live(|r, h| r.playback_duration(h)).unwrap_or(Duration::ZERO)
    }

    pub fn playback_position(&self) -> Duration {
        self.live(|r, h| r.playback_position(h)).unwrap_or(Duration::ZERO)
    }

    pub fn set_playback_position(&self, position: Duration) -> bool {
        self.live(|r, h| r.set_playback_position(h, position)).unwrap_or(false)
    }

    pub fn playback_progress(&self) -> f32 {
        self.live(|r, h| r.playback_progress(h)).unwrap_or(0.0)
    }

    pub fn set_playback_progress(&self, progress: f32) -> bool {
        self.live(|r, h| r.set_playback_progress(h, progress)).unwrap_or(false)
    }

    pub fn position(&self) -> Vec3 {
        self.live(|r, h| r.position(h)).unwrap_or([f32::NAN; 3])
    }

    pub fn set_position(&self, position: Vec3) -> bool {
        self.live(|r, h| r.set_position(h, position)).unwrap_or(false)
    }

    pub fn pitch(&self) -> f32 {
        self.live(|r, h| r.pitch(h)).unwrap_or(-1.0)
    }

    pub fn set_pitch(&self, pitch: f32) -> bool {
        self.live(|r, h| r.set_pitch(h, pitch)).unwrap_or(false)
    }

    pub fn gain(&self) -> f32 {
        self.live(|r, h| r.gain(h)).unwrap_or(-1.0)
    }

    pub fn set_gain(&self, gain: f32) -> bool {
        self.live(|r, h| r.set_gain(h, gain)).unwrap_or(false)
    }

    pub fn is_relative(&self) -> bool {
        self.live(|r, h| r.is_relative(h)).unwrap_or(false)
    }

    pub fn set_relative(&self, relative: bool) -> bool {
        self.live(|r, h| r.set_relative(h, relative)).unwrap_or(false)
    }

    pub fn is_looping(&self) -> bool {
        self.live(|r, h| r.is_looping(h)).unwrap_or(false)
    }

    pub fn set_looping(&self, looping: bool) -> bool {
        self.live(|r, h| r.set_looping(h, looping)).unwrap_or(false)
    }

    /// Stop, unbind and return the source to its pool. Every clone becomes
    /// invalid.
    pub fn reset(&self) -> bool {
        self.live(|r, h| r.reset_source(h)).unwrap_or(false)
    }
}

/// Two proxies are equal when they reach the same live object; an
/// invalidated proxy equals nothing.
impl PartialEq for Source {
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

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("handle", &self.handle)
            .field("epoch", &self.epoch)
            .finish()
    }
}
