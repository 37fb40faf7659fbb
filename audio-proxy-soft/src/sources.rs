use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use audio_proxy_core::models::audio_models::Vec3;
use audio_proxy_core::models::error::BackendError;
use audio_proxy_core::models::state::SourceState;
use audio_proxy_core::traits::handle_backend::{Handle, HandleBackend};
use audio_proxy_core::traits::source_backend::SourceBackend;

use crate::buffers::SoftBuffers;
use crate::context::ContextTag;
use crate::{AL_INVALID_NAME, AL_INVALID_OPERATION, AL_INVALID_VALUE, AL_OUT_OF_MEMORY};

const NANOS_PER_SECOND: f64 = 1e9;

#[derive(Debug, Clone)]
struct SoftSource {
    state: SourceState,
    buffers: Vec<Handle>,
    is_static: bool,
    /// Frames into the concatenation of `buffers`.
    offset: u64,
    position: Vec3,
    pitch: f32,
    gain: f32,
    relative: bool,
    looping: bool,
}

impl Default for SoftSource {
    fn default() -> Self {
        Self {
            state: SourceState::Initial,
            buffers: Vec::new(),
            is_static: false,
            offset: 0,
            position: [0.0; 3],
            pitch: 1.0,
            gain: 1.0,
            relative: false,
            looping: false,
        }
    }
}

impl SoftSource {
    fn stop(&mut self) {
        self.state = SourceState::Stopped;
        self.offset = 0;
    }
}

/// Index of the buffer holding `offset` and the offset within it;
/// `(spans.len(), 0)` past the end.
fn locate(spans: &[(u32, u32)], offset: u64) -> (usize, u64) {
    let mut start = 0u64;
    for (index, &(frames, _)) in spans.iter().enumerate() {
        let end = start + u64::from(frames);
        if offset < end {
            return (index, offset - start);
        }
        start = end;
    }
    (spans.len(), 0)
}

/// Run `source` forward by `elapsed` nanoseconds of wall time.
fn advance_source(source: &mut SoftSource, spans: &[(u32, u32)], elapsed_ns: f64) {
    let cycle_ns: f64 = spans
        .iter()
        .filter(|(_, rate)| *rate > 0)
        .map(|&(frames, rate)| f64::from(frames) * NANOS_PER_SECOND / f64::from(rate))
        .sum();
    if cycle_ns <= 0.0 {
        source.stop();
        return;
    }

    let mut remaining = elapsed_ns * f64::from(source.pitch);
    loop {
        let (index, within) = locate(spans, source.offset);
        if index == spans.len() {
            if !source.looping {
                source.stop();
                return;
            }
            source.offset = 0;
            remaining %= cycle_ns;
            continue;
        }
        let (frames, rate) = spans[index];
        let left = u64::from(frames) - within;
        if rate == 0 {
            source.offset += left;
            continue;
        }
        let needed = left as f64 * NANOS_PER_SECOND / f64::from(rate);
        if remaining < needed {
            source.offset += (remaining * f64::from(rate) / NANOS_PER_SECOND) as u64;
            return;
        }
        remaining -= needed;
        source.offset += left;
    }
}

#[derive(Default)]
struct SourceStore {
    next: Handle,
    live: HashMap<Handle, SoftSource>,
    failing: HashSet<Handle>,
    fail_generate: bool,
}

/// Source namespace of one context, emulating OpenAL source semantics.
///
/// Playback only moves when [`SoftSources::advance`] is called.
pub struct SoftSources {
    tag: Arc<ContextTag>,
    buffers: Arc<SoftBuffers>,
    store: Mutex<SourceStore>,
}

impl SoftSources {
    pub(crate) fn new(tag: Arc<ContextTag>, buffers: Arc<SoftBuffers>) -> Self {
        Self {
            tag,
            buffers,
            store: Mutex::new(SourceStore {
                next: 1,
                ..Default::default()
            }),
        }
    }

    pub fn fail_generate(&self, fail: bool) {
        self.store.lock().fail_generate = fail;
    }

    /// Make every call on `handle` fail with `AL_INVALID_NAME`.
    pub fn fail_source(&self, handle: Handle) {
        self.store.lock().failing.insert(handle);
    }

    pub fn live_count(&self) -> usize {
        self.store.lock().live.len()
    }

    /// Buffers currently attached to `handle`.
    pub fn attached(&self, handle: Handle) -> Vec<Handle> {
        self.store
            .lock()
            .live
            .get(&handle)
            .map(|s| s.buffers.clone())
            .unwrap_or_default()
    }

    fn spans(&self, buffers: &[Handle]) -> Vec<(u32, u32)> {
        buffers
            .iter()
            .map(|&b| self.buffers.span(b).unwrap_or((0, 0)))
            .collect()
    }

    pub fn advance(&self, elapsed: Duration) {
        let mut store = self.store.lock();
        for source in store.live.values_mut() {
            if source.state == SourceState::Playing {
                let spans = self.spans(&source.buffers);
                advance_source(source, &spans, elapsed.as_nanos() as f64);
            }
        }
    }

    fn with_source<R>(
        &self,
        operation: &'static str,
        handle: Handle,
        f: impl FnOnce(&mut SoftSource) -> Result<R, u32>,
    ) -> Result<R, BackendError> {
        self.tag.touch(operation);
        let mut store = self.store.lock();
        if store.failing.contains(&handle) {
            return Err(BackendError::new(operation, AL_INVALID_NAME));
        }
        let source = store
            .live
            .get_mut(&handle)
            .ok_or(BackendError::new(operation, AL_INVALID_NAME))?;
        f(source).map_err(|code| BackendError::new(operation, code))
    }

    fn start(source: &mut SoftSource) -> Result<(), u32> {
        if source.buffers.is_empty() {
            return Err(AL_INVALID_OPERATION);
        }
        if source.state == SourceState::Stopped {
            source.offset = 0;
        }
        source.state = SourceState::Playing;
        Ok(())
    }

    fn validate_batch(store: &SourceStore, handles: &[Handle]) -> Result<(), u32> {
        let all_known = handles
            .iter()
            .all(|h| store.live.contains_key(h) && !store.failing.contains(h));
        if all_known {
            Ok(())
        } else {
            Err(AL_INVALID_NAME)
        }
    }
}

impl HandleBackend for SoftSources {
    fn generate(&self, count: u32) -> Result<Vec<Handle>, BackendError> {
        self.tag.touch("alGenSources");
        let mut store = self.store.lock();
        if store.fail_generate {
            return Err(BackendError::new("alGenSources", AL_OUT_OF_MEMORY));
        }
        let start = store.next;
        store.next += count;
        let handles: Vec<Handle> = (start..start + count).collect();
        for &handle in &handles {
            store.live.insert(handle, SoftSource::default());
        }
        Ok(handles)
    }

    fn reclaim(&self, handle: Handle) {
        self.tag.touch("reclaim source");
        if let Some(source) = self.store.lock().live.get_mut(&handle) {
            *source = SoftSource::default();
        }
    }

    fn delete(&self, handles: &[Handle]) {
        self.tag.touch("alDeleteSources");
        let mut store = self.store.lock();
        for handle in handles {
            store.live.remove(handle);
        }
    }
}

impl SourceBackend for SoftSources {
    fn play(&self, handle: Handle) -> Result<(), BackendError> {
        self.with_source("alSourcePlay", handle, Self::start)
    }

    fn pause(&self, handle: Handle) -> Result<(), BackendError> {
        self.with_source("alSourcePause", handle, |s| {
            if s.state == SourceState::Playing {
                s.state = SourceState::Paused;
            }
            Ok(())
        })
    }

    fn stop(&self, handle: Handle) -> Result<(), BackendError> {
        self.with_source("alSourceStop", handle, |s| {
            s.stop();
            Ok(())
        })
    }

    fn rewind(&self, handle: Handle) -> Result<(), BackendError> {
        self.with_source("alSourceRewind", handle, |s| {
            s.state = SourceState::Initial;
            s.offset = 0;
            Ok(())
        })
    }

    fn play_batch(&self, handles: &[Handle]) -> Result<(), BackendError> {
        self.tag.touch("alSourcePlayv");
        let mut store = self.store.lock();
        Self::validate_batch(&store, handles)
            .map_err(|code| BackendError::new("alSourcePlayv", code))?;
        for handle in handles {
            if let Some(source) = store.live.get_mut(handle) {
                Self::start(source)
                    .map_err(|code| BackendError::new("alSourcePlayv", code))?;
            }
        }
        Ok(())
    }

    fn pause_batch(&self, handles: &[Handle]) -> Result<(), BackendError> {
        self.tag.touch("alSourcePausev");
        let mut store = self.store.lock();
        Self::validate_batch(&store, handles)
            .map_err(|code| BackendError::new("alSourcePausev", code))?;
        for handle in handles {
            if let Some(source) = store.live.get_mut(handle) {
                if source.state == SourceState::Playing {
                    source.state = SourceState::Paused;
                }
            }
        }
        Ok(())
    }

    fn state(&self, handle: Handle) -> Result<SourceState, BackendError> {
        self.with_source("alGetSourcei", handle, |s| Ok(s.state))
    }

    fn bind_buffer(&self, handle: Handle, buffer: Option<Handle>) -> Result<(), BackendError> {
        self.with_source("alSourcei", handle, |s| {
            if !s.state.accepts_buffers() {
                return Err(AL_INVALID_OPERATION);
            }
            match buffer {
                Some(buffer) => {
                    if self.buffers.span(buffer).is_none() {
                        return Err(AL_INVALID_VALUE);
                    }
                    s.buffers = vec![buffer];
                    s.is_static = true;
                }
                None => {
                    s.buffers.clear();
                    s.is_static = false;
                }
            }
            s.offset = 0;
            Ok(())
        })
    }

    fn queue_buffers(&self, handle: Handle, buffers: &[Handle]) -> Result<(), BackendError> {
        self.with_source("alSourceQueueBuffers", handle, |s| {
            if s.is_static {
                return Err(AL_INVALID_OPERATION);
            }
            if buffers.iter().any(|&b| self.buffers.span(b).is_none()) {
                return Err(AL_INVALID_NAME);
            }
            s.buffers.extend_from_slice(buffers);
            Ok(())
        })
    }

    fn queued_count(&self, handle: Handle) -> Result<u32, BackendError> {
        self.with_source("alGetSourcei", handle, |s| Ok(s.buffers.len() as u32))
    }

    fn processed_count(&self, handle: Handle) -> Result<u32, BackendError> {
        self.with_source("alGetSourcei", handle, |s| {
            if s.is_static {
                return Ok(0);
            }
            if s.state == SourceState::Stopped {
                return Ok(s.buffers.len() as u32);
            }
            let (index, _) = locate(&self.spans(&s.buffers), s.offset);
            Ok(index as u32)
        })
    }

    fn sample_offset(&self, handle: Handle) -> Result<u32, BackendError> {
        self.with_source("alGetSourcei", handle, |s| {
            Ok(u32::try_from(s.offset).unwrap_or(u32::MAX))
        })
    }

    fn set_sample_offset(&self, handle: Handle, offset: u32) -> Result<(), BackendError> {
        self.with_source("alSourcei", handle, |s| {
            let total: u64 = self.spans(&s.buffers).iter().map(|&(f, _)| u64::from(f)).sum();
            if u64::from(offset) > total {
                return Err(AL_INVALID_VALUE);
            }
            s.offset = u64::from(offset);
            Ok(())
        })
    }

    fn position(&self, handle: Handle) -> Result<Vec3, BackendError> {
        self.with_source("alGetSourcefv", handle, |s| Ok(s.position))
    }

    fn set_position(&self, handle: Handle, position: Vec3) -> Result<(), BackendError> {
        self.with_source("alSourcefv", handle, |s| {
            if position.iter().any(|c| !c.is_finite()) {
                return Err(AL_INVALID_VALUE);
            }
            s.position = position;
            Ok(())
        })
    }

    fn pitch(&self, handle: Handle) -> Result<f32, BackendError> {
        self.with_source("alGetSourcef", handle, |s| Ok(s.pitch))
    }

    fn set_pitch(&self, handle: Handle, pitch: f32) -> Result<(), BackendError> {
        self.with_source("alSourcef", handle, |s| {
            if pitch.is_nan() || pitch <= 0.0 {
                return Err(AL_INVALID_VALUE);
            }
            s.pitch = pitch;
            Ok(())
        })
    }

    fn gain(&self, handle: Handle) -> Result<f32, BackendError> {
        self.with_source("alGetSourcef", handle, |s| Ok(s.gain))
    }

    fn set_gain(&self, handle: Handle, gain: f32) -> Result<(), BackendError> {
        self.with_source("alSourcef", handle, |s| {
            if gain.is_nan() || gain < 0.0 {
                return Err(AL_INVALID_VALUE);
            }
            s.gain = gain;
            Ok(())
        })
    }

    fn is_relative(&self, handle: Handle) -> Result<bool, BackendError> {
        self.with_source("alGetSourcei", handle, |s| Ok(s.relative))
    }

    fn set_relative(&self, handle: Handle, relative: bool) -> Result<(), BackendError> {
        self.with_source("alSourcei", handle, |s| {
            s.relative = relative;
            Ok(())
        })
    }

    fn is_looping(&self, handle: Handle) -> Result<bool, BackendError> {
        self.with_source("alGetSourcei", handle, |s| Ok(s.looping))
    }

    fn set_looping(&self, handle: Handle, looping: bool) -> Result<(), BackendError> {
        self.with_source("alSourcei", handle, |s| {
            s.looping = looping;
            Ok(())
        })
    }
}
