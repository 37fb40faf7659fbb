use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use super::buffer_registry::{BufferRegistry, SharedBuffers};
use crate::migration::snapshot::SourceSnapshot;
use crate::models::audio_models::{Vec3, NAN_VEC3};
use crate::models::error::BackendError;
use crate::models::migration::MigrationMapping;
use crate::models::state::{SourceState, SourceType};
use crate::pool::handle_pool::HandlePool;
use crate::processing::playback_math::{self, BufferSpan};
use crate::proxy::buffer::Buffer;
use crate::proxy::source::Source;
use crate::traits::handle_backend::Handle;
use crate::traits::source_backend::SourceBackend;

pub type SharedSources = Arc<Mutex<SourceRegistry>>;

/// Buffers bound to a source. A source is fed either by one static buffer
/// or by a queue, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceBinding {
    #[default]
    Unbound,
    Static(Handle),
    Streaming(Vec<Handle>),
}

impl SourceBinding {
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Unbound => SourceType::Undetermined,
            Self::Static(_) => SourceType::Static,
            Self::Streaming(_) => SourceType::Streaming,
        }
    }

    pub fn buffers(&self) -> &[Handle] {
        match self {
            Self::Unbound => &[],
            Self::Static(buffer) => std::slice::from_ref(buffer),
            Self::Streaming(queue) => queue,
        }
    }

    /// Same binding with every buffer handle translated through `mapping`.
    /// `None` if any buffer has no counterpart.
    pub fn remap(&self, mapping: &MigrationMapping) -> Option<SourceBinding> {
        Some(match self {
            Self::Unbound => Self::Unbound,
            Self::Static(buffer) => Self::Static(*mapping.get(buffer)?),
            Self::Streaming(queue) => Self::Streaming(
                queue
                    .iter()
                    .map(|buffer| mapping.get(buffer).copied())
                    .collect::<Option<Vec<_>>>()?,
            ),
        })
    }
}

/// Totals over the active buffers, cached for progress calculations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Meta {
    pub active_sample_count: u64,
    pub active_total_duration: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct SourceEntry {
    pub binding: SourceBinding,
    pub meta: Meta,
}

/// Pool of backend sources, their buffer bindings and playback control.
///
/// Mutators return `false` and getters return a sentinel when the backend
/// call fails; the failure is logged with its error code.
pub struct SourceRegistry {
    pool: HandlePool<SourceEntry, dyn SourceBackend>,
    buffers: SharedBuffers,
    this: Weak<Mutex<SourceRegistry>>,
}

fn report<T>(handle: Handle, result: Result<T, BackendError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Source {handle}: {e}");
            None
        }
    }
}

fn spans(buffers: &BufferRegistry, handles: &[Handle]) -> Vec<BufferSpan> {
    handles.iter().filter_map(|&h| buffers.span(h)).collect()
}

fn meta_for(buffers: &BufferRegistry, binding: &SourceBinding) -> Meta {
    let spans = spans(buffers, binding.buffers());
    Meta {
        active_sample_count: spans.iter().map(|s| u64::from(s.sample_count)).sum(),
        active_total_duration: playback_math::total_duration(&spans),
    }
}

/// Replace the binding of `entry`, moving the bound-source counts from the
/// old buffers to the new ones and refreshing the cached totals.
fn store_binding(entry: &mut SourceEntry, buffers: &mut BufferRegistry, binding: SourceBinding) {
    buffers.release_sources(entry.binding.buffers());
    buffers.retain_sources(binding.buffers());
    entry.meta = meta_for(buffers, &binding);
    entry.binding = binding;
}

impl SourceRegistry {
    pub fn new(backend: Arc<dyn SourceBackend>, buffers: SharedBuffers) -> Self {
        Self {
            pool: HandlePool::new(backend),
            buffers,
            this: Weak::new(),
        }
    }

    pub fn into_shared(mut self) -> SharedSources {
        Arc::new_cyclic(|this| {
            self.this = this.clone();
            Mutex::new(self)
        })
    }

    pub(crate) fn install(&mut self, mut successor: SourceRegistry) -> SourceRegistry {
        successor.this = self.this.clone();
        let mut previous = std::mem::replace(self, successor);
        previous.this = Weak::new();
        previous
    }

    pub fn initialize(&mut self, batch_size: u32) -> Result<(), BackendError> {
        self.pool.initialize(batch_size)
    }

    pub fn spawn(&mut self) -> Result<Source, BackendError> {
        let handle = self.pool.spawn()?;
        log::debug!("spawned source {handle}");
        Ok(self.proxy(handle))
    }

    pub fn get(&self, handle: Handle) -> Option<Source> {
        self.pool.is_valid(handle).then(|| self.proxy(handle))
    }

    fn proxy(&self, handle: Handle) -> Source {
        Source::new(handle, self.pool.epoch(), self.this.clone())
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

    pub fn pool(&self) -> &HandlePool<SourceEntry, dyn SourceBackend> {
        &self.pool
    }

    pub fn buffers(&self) -> &SharedBuffers {
        &self.buffers
    }

    fn backend(&self) -> &Arc<dyn SourceBackend> {
        self.pool.backend()
    }

    fn binding(&self, handle: Handle) -> SourceBinding {
        self.pool
            .get(handle)
            .map(|entry| entry.binding.clone())
            .unwrap_or_default()
    }

    fn buffer_proxies(&self, handles: &[Handle]) -> Vec<Buffer> {
        let buffers = self.buffers.lock();
        handles.iter().filter_map(|&h| buffers.get(h)).collect()
    }

    // Playback control

    /// Start or resume playback. Refuses sources without a live bound buffer.
    pub fn play(&mut self, handle: Handle) -> bool {
        debug_assert!(self.is_valid(handle), "source {handle} is not live");
        let binding = self.binding(handle);
        let playable = {
            let buffers = self.buffers.lock();
            !binding.buffers().is_empty() && binding.buffers().iter().all(|&b| buffers.is_valid(b))
        };
        if !playable {
            log::warn!("Source {handle} has no buffer to play");
            return false;
        }
        report(handle, self.backend().play(handle)).is_some()
    }

    pub fn pause(&mut self, handle: Handle) -> bool {
        report(handle, self.backend().pause(handle)).is_some()
    }

    pub fn stop(&mut self, handle: Handle) -> bool {
        report(handle, self.backend().stop(handle)).is_some()
    }

    /// Back to `Initial` with the offset at zero.
    pub fn rewind(&mut self, handle: Handle) -> bool {
        report(handle, self.backend().rewind(handle)).is_some()
    }

    pub fn state(&self, handle: Handle) -> SourceState {
        report(handle, self.backend().state(handle)).unwrap_or(SourceState::Unknown)
    }

    pub fn source_type(&self, handle: Handle) -> SourceType {
        self.binding(handle).source_type()
    }

    // Buffer binding

    /// Bind one buffer, replacing a queue or an earlier static buffer.
    /// `None` unbinds everything.
    pub fn set_static_buffer(&mut self, handle: Handle, buffer: Option<Handle>) -> bool {
        debug_assert!(
            self.state(handle).accepts_buffers(),
            "source {handle} must be initial or stopped to bind buffers"
        );
        if report(handle, self.backend().bind_buffer(handle, buffer)).is_none() {
            return false;
        }
        let binding = buffer.map_or(SourceBinding::Unbound, SourceBinding::Static);
        if let Some(entry) = self.pool.get_mut(handle) {
            store_binding(entry, &mut self.buffers.lock(), binding);
        }
        log::debug!("source {handle}: static buffer {buffer:?}");
        true
    }

    /// Append `queue` to the source's streaming queue, dropping a static
    /// binding first.
    pub fn queue_buffers(&mut self, handle: Handle, queue: &[Handle]) -> bool {
        debug_assert!(
            self.state(handle).accepts_buffers(),
            "source {handle} must be initial or stopped to queue buffers"
        );
        let mut combined = match self.binding(handle) {
            SourceBinding::Streaming(existing) => existing,
            SourceBinding::Static(_) => {
                if report(handle, self.backend().bind_buffer(handle, None)).is_none() {
                    return false;
                }
                Vec::new()
            }
            SourceBinding::Unbound => Vec::new(),
        };
        if report(handle, self.backend().queue_buffers(handle, queue)).is_none() {
            return false;
        }
        combined.extend_from_slice(queue);
        let binding = SourceBinding::Streaming(combined);
        if let Some(entry) = self.pool.get_mut(handle) {
            store_binding(entry, &mut self.buffers.lock(), binding);
        }
        log::debug!("source {handle}: queued {} buffers", queue.len());
        true
    }

    pub fn static_buffer(&self, handle: Handle) -> Option<Buffer> {
        match self.binding(handle) {
            SourceBinding::Static(buffer) => self.buffers.lock().get(buffer),
            _ => None,
        }
    }

    pub fn queued_buffers(&self, handle: Handle) -> Vec<Buffer> {
        match self.binding(handle) {
            SourceBinding::Streaming(queue) => self.buffer_proxies(&queue),
            _ => Vec::new(),
        }
    }

    /// Number of queued buffers the backend has finished with.
    pub fn queue_index(&self, handle: Handle) -> u32 {
        report(handle, self.backend().processed_count(handle)).unwrap_or(0)
    }

    /// The buffer currently being played: the static buffer, or the first
    /// unprocessed buffer of the queue.
    pub fn active_buffer(&self, handle: Handle) -> Option<Buffer> {
        match self.binding(handle) {
            SourceBinding::Unbound => None,
            SourceBinding::Static(buffer) => self.buffers.lock().get(buffer),
            SourceBinding::Streaming(queue) => {
                let index = self.queue_index(handle) as usize;
                let buffer = *queue.get(index)?;
                self.buffers.lock().get(buffer)
            }
        }
    }

    pub fn active_buffers(&self, handle: Handle) -> Vec<Buffer> {
        self.buffer_proxies(self.binding(handle).buffers())
    }

    // Playback position

    pub fn meta(&self, handle: Handle) -> Meta {
        self.pool.get(handle).map(|entry| entry.meta).unwrap_or_default()
    }

    pub fn playback_duration(&self, handle: Handle) -> Duration {
        self.meta(handle).active_total_duration
    }

    fn active_spans(&self, handle: Handle) -> Vec<BufferSpan> {
        spans(&self.buffers.lock(), self.binding(handle).buffers())
    }

    /// Time position derived from the backend's raw sample offset.
    pub fn playback_position(&self, handle: Handle) -> Duration {
        let Some(offset) = report(handle, self.backend().sample_offset(handle)) else {
            return Duration::ZERO;
        };
        playback_math::offset_to_position(&self.active_spans(handle), u64::from(offset))
    }

    pub fn set_playback_position(&mut self, handle: Handle, position: Duration) -> bool {
        let offset = playback_math::position_to_offset(&self.active_spans(handle), position);
        let offset = u32::try_from(offset).unwrap_or(u32::MAX);
        report(handle, self.backend().set_sample_offset(handle, offset)).is_some()
    }

    /// Position over total duration, in `[0, 1]`.
    pub fn playback_progress(&self, handle: Handle) -> f32 {
        let total = self.playback_duration(handle);
        if total.is_zero() {
            return 0.0;
        }
        let position = self.playback_position(handle);
        (position.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0) as f32
    }

    pub fn set_playback_progress(&mut self, handle: Handle, progress: f32) -> bool {
        debug_assert!((0.0..=1.0).contains(&progress), "progress {progress} out of range");
        let target = self
            .playback_duration(handle)
            .mul_f64(f64::from(progress.clamp(0.0, 1.0)));
        self.set_playback_position(handle, target)
    }

    // Properties

    pub fn position(&self, handle: Handle) -> Vec3 {
        report(handle, self.backend().position(handle)).unwrap_or(NAN_VEC3)
    }

    pub fn set_position(&mut self, handle: Handle, position: Vec3) -> bool {
        report(handle, self.backend().set_position(handle, position)).is_some()
    }

    pub fn pitch(&self, handle: Handle) -> f32 {
        report(handle, self.backend().pitch(handle)).unwrap_or(-1.0)
    }

    pub fn set_pitch(&mut self, handle: Handle, pitch: f32) -> bool {
        report(handle, self.backend().set_pitch(handle, pitch)).is_some()
    }

    pub fn gain(&self, handle: Handle) -> f32 {
        report(handle, self.backend().gain(handle)).unwrap_or(-1.0)
    }

    pub fn set_gain(&mut self, handle: Handle, gain: f32) -> bool {
        report(handle, self.backend().set_gain(handle, gain)).is_some()
    }

    pub fn is_relative(&self, handle: Handle) -> bool {
        report(handle, self.backend().is_relative(handle)).unwrap_or(false)
    }

    pub fn set_relative(&mut self, handle: Handle, relative: bool) -> bool {
        report(handle, self.backend().set_relative(handle, relative)).is_some()
    }

    pub fn is_looping(&self, handle: Handle) -> bool {
        report(handle, self.backend().is_looping(handle)).unwrap_or(false)
    }

    pub fn set_looping(&mut self, handle: Handle, looping: bool) -> bool {
        report(handle, self.backend().set_looping(handle, looping)).is_some()
    }

    /// Put the source back into a fresh state (unbound, `Initial`, default
    /// properties) and recycle the handle.
    ///
    /// The handle is recycled even if clearing some backend state fails;
    /// those failures are logged.
    pub fn reset_source(&mut self, handle: Handle) -> bool {
        debug_assert!(self.is_valid(handle), "source {handle} is not live");
        if !self.pool.is_valid(handle) {
            return false;
        }
        let backend = self.backend().clone();
        let cleared = [
            backend.stop(handle),
            backend.bind_buffer(handle, None),
            backend.rewind(handle),
            backend.set_position(handle, [0.0; 3]),
            backend.set_pitch(handle, 1.0),
            backend.set_gain(handle, 1.0),
            backend.set_relative(handle, false),
            backend.set_looping(handle, false),
        ];
        let failed = cleared
            .into_iter()
            .filter(|result| result.is_err())
            .count();
        if failed > 0 {
            log::warn!("Source {handle}: {failed} steps failed while resetting");
        }

        if let Some(entry) = self.pool.get_mut(handle) {
            store_binding(entry, &mut self.buffers.lock(), SourceBinding::Unbound);
        }
        self.pool.reclaim(handle);
        log::debug!("reset source {handle}");
        true
    }

    // Migration

    /// Pause every live source with one backend call.
    pub fn pause_all(&mut self) -> bool {
        let handles = self.pool.used().to_vec();
        if handles.is_empty() {
            return true;
        }
        match self.backend().pause_batch(&handles) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to pause {} sources: {e}", handles.len());
                false
            }
        }
    }

    pub fn play_batch(&mut self, handles: &[Handle]) -> bool {
        if handles.is_empty() {
            return true;
        }
        match self.backend().play_batch(handles) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to resume {} sources: {e}", handles.len());
                false
            }
        }
    }

    /// Capture the state of a live source.
    pub fn snapshot(&self, handle: Handle) -> SourceSnapshot {
        SourceSnapshot {
            state: self.state(handle),
            binding: self.binding(handle),
            sample_offset: report(handle, self.backend().sample_offset(handle)).unwrap_or(0),
            position: self.position(handle),
            pitch: self.pitch(handle),
            gain: self.gain(handle),
            is_relative: self.is_relative(handle),
            is_looping: self.is_looping(handle),
        }
    }

    /// Re-apply `snapshot` to a freshly prepared source, translating buffer
    /// handles through `buffer_mapping`. Keeps going after a failed step and
    /// returns `false` if any step failed.
    ///
    /// `buffers` is the registry the mapping points into; it is passed in
    /// because the caller already holds its lock.
    pub fn restore(
        &mut self,
        handle: Handle,
        snapshot: &SourceSnapshot,
        buffer_mapping: &MigrationMapping,
        buffers: &mut BufferRegistry,
    ) -> bool {
        let mut ok = true;
        let backend = self.backend().clone();

        let binding = match snapshot.binding.remap(buffer_mapping) {
            Some(binding) => binding,
            None => {
                log::warn!("Source {handle}: bound buffer has no migrated counterpart");
                ok = false;
                SourceBinding::Unbound
            }
        };
        let bound = match &binding {
            SourceBinding::Unbound => Ok(()),
            SourceBinding::Static(buffer) => backend.bind_buffer(handle, Some(*buffer)),
            SourceBinding::Streaming(queue) => backend.queue_buffers(handle, queue),
        };
        let binding = match report(handle, bound) {
            Some(()) => binding,
            None => {
                ok = false;
                SourceBinding::Unbound
            }
        };

        if binding != SourceBinding::Unbound && snapshot.sample_offset > 0 {
            ok &= report(handle, backend.set_sample_offset(handle, snapshot.sample_offset)).is_some();
        }
        if !snapshot.position.iter().any(|c| c.is_nan()) {
            ok &= report(handle, backend.set_position(handle, snapshot.position)).is_some();
        }
        if snapshot.pitch >= 0.0 {
            ok &= report(handle, backend.set_pitch(handle, snapshot.pitch)).is_some();
        }
        if snapshot.gain >= 0.0 {
            ok &= report(handle, backend.set_gain(handle, snapshot.gain)).is_some();
        }
        ok &= report(handle, backend.set_relative(handle, snapshot.is_relative)).is_some();
        ok &= report(handle, backend.set_looping(handle, snapshot.is_looping)).is_some();

        if let Some(entry) = self.pool.get_mut(handle) {
            store_binding(entry, buffers, binding);
        }
        ok
    }

    pub(crate) fn prepare_batch(&mut self, size: usize) -> Result<Vec<Handle>, BackendError> {
        self.pool.prepare_batch(size)
    }

    pub(crate) fn adopt_lineage(&mut self, predecessor: &SourceRegistry, mapping: MigrationMapping) {
        self.pool.adopt_lineage(predecessor.pool.lineage(), mapping);
    }
}
