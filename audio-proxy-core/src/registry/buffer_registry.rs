use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::DecodedAudio;
use crate::models::error::BackendError;
use crate::models::migration::{InheritOutcome, MigrationMapping};
use crate::pool::handle_pool::HandlePool;
use crate::processing::playback_math::{self, BufferSpan};
use crate::proxy::buffer::Buffer;
use crate::traits::buffer_backend::BufferBackend;
use crate::traits::handle_backend::Handle;

pub type SharedBuffers = Arc<Mutex<BufferRegistry>>;

/// What the registry knows about one live buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferInfo {
    pub name: String,
    pub channel_count: u16,
    pub frequency_hz: u32,
    /// Frames per channel.
    pub sample_count: u32,
    pub duration: Duration,
    /// Decoded content kept so it can be re-uploaded on another device.
    pub content: Option<Arc<DecodedAudio>>,
    /// Bindings from live sources; a bound buffer cannot be reset.
    pub bound_sources: u32,
}

impl BufferInfo {
    pub fn span(&self) -> BufferSpan {
        BufferSpan {
            sample_count: self.sample_count,
            frequency_hz: self.frequency_hz,
        }
    }
}

/// Pool of backend buffers plus their metadata.
///
/// Getters return sentinels (empty name, zero counts) for handles the
/// registry does not know.
pub struct BufferRegistry {
    pool: HandlePool<BufferInfo, dyn BufferBackend>,
    this: Weak<Mutex<BufferRegistry>>,
}

impl BufferRegistry {
    /// A registry not yet reachable through proxies; see [`Self::into_shared`].
    pub fn new(backend: Arc<dyn BufferBackend>) -> Self {
        Self {
            pool: HandlePool::new(backend),
            this: Weak::new(),
        }
    }

    pub fn into_shared(mut self) -> SharedBuffers {
        Arc::new_cyclic(|this| {
            self.this = this.clone();
            Mutex::new(self)
        })
    }

    /// Put `successor` in this registry's place so existing proxies reach
    /// it, returning the registry it replaced.
    pub(crate) fn install(&mut self, mut successor: BufferRegistry) -> BufferRegistry {
        successor.this = self.this.clone();
        let mut previous = std::mem::replace(self, successor);
        previous.this = Weak::new();
        previous
    }

    pub fn initialize(&mut self, batch_size: u32) -> Result<(), BackendError> {
        self.pool.initialize(batch_size)
    }

    pub fn spawn(&mut self) -> Result<Buffer, BackendError> {
        let handle = self.pool.spawn()?;
        log::debug!("spawned buffer {handle}");
        Ok(self.proxy(handle))
    }

    /// Proxy for a live handle.
    pub fn get(&self, handle: Handle) -> Option<Buffer> {
        self.pool.is_valid(handle).then(|| self.proxy(handle))
    }

    fn proxy(&self, handle: Handle) -> Buffer {
        Buffer::new(handle, self.pool.epoch(), self.this.clone())
    }

    pub fn is_valid(&self, handle: Handle) -> bool {
        self.pool.is_valid(handle)
    }

    pub fn resolve(&self, handle: Handle, epoch: usize) -> Option<Handle> {
        self.pool.resolve(handle, epoch)
    }

    pub fn used(&self) -> &[Handle] {
        self.pool.used()
    }

    pub fn pool(&self) -> &HandlePool<BufferInfo, dyn BufferBackend> {
        &self.pool
    }

    pub fn info(&self, handle: Handle) -> Option<&BufferInfo> {
        self.pool.get(handle)
    }

    /// Upload `content` and record its metadata. Metadata is left untouched
    /// when the content is malformed or the upload fails.
    pub fn set_buffer_data(&mut self, handle: Handle, content: Arc<DecodedAudio>) -> bool {
        debug_assert!(self.pool.is_valid(handle), "buffer {handle} is not live");
        if !self.pool.is_valid(handle) {
            return false;
        }
        if let Err(reason) = content.validate() {
            log::warn!("Rejected data for buffer {handle}: {reason}");
            return false;
        }
        if let Err(e) = self.pool.backend().set_data(handle, &content) {
            log::warn!("Failed to upload buffer {handle}: {e}");
            return false;
        }
        let Some(info) = self.pool.get_mut(handle) else {
            return false;
        };
        info.channel_count = content.channels;
        info.frequency_hz = content.sample_rate;
        info.sample_count = content.frame_count();
        info.duration = content.duration();
        info.content = Some(content);
        log::debug!(
            "buffer {handle}: {} frames @ {} Hz, {} ch",
            info.sample_count,
            info.frequency_hz,
            info.channel_count
        );
        true
    }

    pub fn set_buffer_name(&mut self, handle: Handle, name: impl Into<String>) -> bool {
        match self.pool.get_mut(handle) {
            Some(info) => {
                info.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn buffer_name(&self, handle: Handle) -> String {
        self.info(handle).map(|info| info.name.clone()).unwrap_or_default()
    }

    pub fn channel_count(&self, handle: Handle) -> u16 {
        self.info(handle).map_or(0, |info| info.channel_count)
    }

    pub fn frequency_hz(&self, handle: Handle) -> u32 {
        self.info(handle).map_or(0, |info| info.frequency_hz)
    }

    pub fn sample_count(&self, handle: Handle) -> u32 {
        self.info(handle).map_or(0, |info| info.sample_count)
    }

    pub fn duration(&self, handle: Handle) -> Duration {
        self.info(handle).map_or(Duration::ZERO, |info| info.duration)
    }

    pub fn content(&self, handle: Handle) -> Option<Arc<DecodedAudio>> {
        self.info(handle).and_then(|info| info.content.clone())
    }

    pub fn span(&self, handle: Handle) -> Option<BufferSpan> {
        self.info(handle).map(BufferInfo::span)
    }

    pub fn total_duration(&self, handles: &[Handle]) -> Duration {
        let spans: Vec<BufferSpan> = handles.iter().filter_map(|&h| self.span(h)).collect();
        playback_math::total_duration(&spans)
    }

    pub(crate) fn retain_sources(&mut self, handles: &[Handle]) {
        for &handle in handles {
            if let Some(info) = self.pool.get_mut(handle) {
                info.bound_sources += 1;
            }
        }
    }

    pub(crate) fn release_sources(&mut self, handles: &[Handle]) {
        for &handle in handles {
            if let Some(info) = self.pool.get_mut(handle) {
                info.bound_sources = info.bound_sources.saturating_sub(1);
            }
        }
    }

    /// Recycle the handle and forget its metadata. Refused while a source
    /// still has the buffer bound or queued.
    pub fn reset_buffer(&mut self, handle: Handle) -> bool {
        debug_assert!(self.pool.is_valid(handle), "buffer {handle} is not live");
        let bound = self.info(handle).map_or(0, |info| info.bound_sources);
        if bound > 0 {
            log::warn!("Buffer {handle} is still bound to {bound} sources");
            return false;
        }
        let reclaimed = self.pool.reclaim(handle).is_some();
        if reclaimed {
            log::debug!("reset buffer {handle}");
        }
        reclaimed
    }

    /// Recreate every live buffer of `predecessor` in this registry.
    ///
    /// Content is re-uploaded from the retained decoded audio; a buffer whose
    /// upload fails keeps its name but comes over empty and is reported as
    /// degraded. The returned mapping covers every live handle of
    /// `predecessor` and becomes the next link of this registry's lineage.
    pub fn inherit_collection(
        &mut self,
        predecessor: &BufferRegistry,
    ) -> Result<InheritOutcome, BackendError> {
        let old_handles = predecessor.used().to_vec();
        let new_handles = self.pool.prepare_batch(old_handles.len())?;

        let mut mapping = MigrationMapping::with_capacity(old_handles.len());
        let mut degraded = Vec::new();
        for (&old, &new) in old_handles.iter().zip(&new_handles) {
            mapping.insert(old, new);
            let Some(info) = predecessor.info(old) else {
                continue;
            };
            let mut inherited = BufferInfo {
                name: info.name.clone(),
                ..Default::default()
            };
            if let Some(content) = &info.content {
                match self.pool.backend().set_data(new, content) {
                    Ok(()) => {
                        inherited = BufferInfo {
                            bound_sources: 0,
                            ..info.clone()
                        }
                    }
                    Err(e) => {
                        log::warn!("Buffer {old} lost its content moving to {new}: {e}");
                        degraded.push(old);
                    }
                }
            }
            if let Some(slot) = self.pool.get_mut(new) {
                *slot = inherited;
            }
        }

        self.pool.adopt_lineage(predecessor.pool.lineage(), mapping.clone());
        log::debug!(
            "inherited {} buffers ({} degraded)",
            mapping.len(),
            degraded.len()
        );
        Ok(InheritOutcome { mapping, degraded })
    }
}
