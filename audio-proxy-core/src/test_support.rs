//! Counting test double for every backend trait.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{DecodedAudio, DeviceDescription, Orientation, Vec3};
use crate::models::error::BackendError;
use crate::models::state::SourceState;
use crate::traits::buffer_backend::BufferBackend;
use crate::traits::device::{AudioContext, AudioDevice, AudioDriver};
use crate::traits::handle_backend::{Handle, HandleBackend};
use crate::traits::listener_backend::ListenerBackend;
use crate::traits::source_backend::SourceBackend;

const INVALID_NAME: u32 = 0xA001;
const INVALID_OPERATION: u32 = 0xA004;

#[derive(Debug, Clone)]
pub struct FakeSource {
    pub state: SourceState,
    pub buffers: Vec<Handle>,
    pub processed: u32,
    pub offset: u32,
    pub position: Vec3,
    pub pitch: f32,
    pub gain: f32,
    pub relative: bool,
    pub looping: bool,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self {
            state: SourceState::Initial,
            buffers: Vec::new(),
            processed: 0,
            offset: 0,
            position: [0.0; 3],
            pitch: 1.0,
            gain: 1.0,
            relative: false,
            looping: false,
        }
    }
}

#[derive(Default)]
struct FakeState {
    next: Handle,
    generated: u32,
    reclaimed: Vec<Handle>,
    deleted: Vec<Handle>,
    fail_generate: bool,
    fail_uploads: bool,
    failing: HashSet<Handle>,
    uploads: HashMap<Handle, DecodedAudio>,
    sources: HashMap<Handle, FakeSource>,
    batch_calls: Vec<(&'static str, Vec<Handle>)>,
    listener_gain: f32,
    listener_position: Vec3,
    listener_orientation: Orientation,
    fail_listener: bool,
}

/// Handles count up from 0. Per-handle failures are switched on with
/// [`FakeBackend::fail_handle`].
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                listener_gain: 1.0,
                ..Default::default()
            }),
        }
    }

    pub fn fail_generate(&self, fail: bool) {
        self.state.lock().fail_generate = fail;
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.state.lock().fail_uploads = fail;
    }

    pub fn fail_handle(&self, handle: Handle) {
        self.state.lock().failing.insert(handle);
    }

    pub fn fail_listener(&self, fail: bool) {
        self.state.lock().fail_listener = fail;
    }

    pub fn generated_count(&self) -> u32 {
        self.state.lock().generated
    }

    pub fn reclaimed(&self) -> Vec<Handle> {
        self.state.lock().reclaimed.clone()
    }

    pub fn deleted(&self) -> Vec<Handle> {
        self.state.lock().deleted.clone()
    }

    pub fn upload(&self, handle: Handle) -> Option<DecodedAudio> {
        self.state.lock().uploads.get(&handle).cloned()
    }

    pub fn source(&self, handle: Handle) -> FakeSource {
        self.state.lock().sources.get(&handle).cloned().unwrap_or_default()
    }

    pub fn batch_calls(&self) -> Vec<(&'static str, Vec<Handle>)> {
        self.state.lock().batch_calls.clone()
    }

    pub fn set_state(&self, handle: Handle, state: SourceState) {
        self.state.lock().sources.entry(handle).or_default().state = state;
    }

    pub fn set_processed(&self, handle: Handle, processed: u32) {
        self.state.lock().sources.entry(handle).or_default().processed = processed;
    }

    fn with_source<R>(
        &self,
        operation: &'static str,
        handle: Handle,
        f: impl FnOnce(&mut FakeSource) -> R,
    ) -> Result<R, BackendError> {
        let mut state = self.state.lock();
        if state.failing.contains(&handle) {
            return Err(BackendError::new(operation, INVALID_NAME));
        }
        Ok(f(state.sources.entry(handle).or_default()))
    }

    fn with_listener<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut FakeState) -> R,
    ) -> Result<R, BackendError> {
        let mut state = self.state.lock();
        if state.fail_listener {
            return Err(BackendError::new(operation, INVALID_OPERATION));
        }
        Ok(f(&mut state))
    }
}

impl HandleBackend for FakeBackend {
    fn generate(&self, count: u32) -> Result<Vec<Handle>, BackendError> {
        let mut state = self.state.lock();
        if state.fail_generate {
            return Err(BackendError::new("generate", INVALID_OPERATION));
        }
        let start = state.next;
        state.next += count;
        state.generated += count;
        Ok((start..start + count).collect())
    }

    fn reclaim(&self, handle: Handle) {
        let mut state = self.state.lock();
        state.reclaimed.push(handle);
        if let Some(source) = state.sources.get_mut(&handle) {
            *source = FakeSource::default();
        }
    }

    fn delete(&self, handles: &[Handle]) {
        let mut state = self.state.lock();
        state.deleted.extend_from_slice(handles);
        for handle in handles {
            state.sources.remove(handle);
            state.uploads.remove(handle);
        }
    }
}

impl BufferBackend for FakeBackend {
    fn set_data(&self, handle: Handle, audio: &DecodedAudio) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if state.fail_uploads || state.failing.contains(&handle) {
            return Err(BackendError::new("set_data", INVALID_OPERATION));
        }
        state.uploads.insert(handle, audio.clone());
        Ok(())
    }
}

impl SourceBackend for FakeBackend {
    fn play(&self, handle: Handle) -> Result<(), BackendError> {
        self.with_source("play", handle, |s| s.state = SourceState::Playing)
    }

    fn pause(&self, handle: Handle) -> Result<(), BackendError> {
        self.with_source("pause", handle, |s| {
            if s.state == SourceState::Playing {
                s.state = SourceState::Paused;
            }
        })
    }

    fn stop(&self, handle: Handle) -> Result<(), BackendError> {
        self.with_source("stop", handle, |s| {
            s.state = SourceState::Stopped;
            s.offset = 0;
        })
    }

    fn rewind(&self, handle: Handle) -> Result<(), BackendError> {
        self.with_source("rewind", handle, |s| {
            s.state = SourceState::Initial;
            s.offset = 0;
        })
    }

    fn play_batch(&self, handles: &[Handle]) -> Result<(), BackendError> {
        self.state.lock().batch_calls.push(("play", handles.to_vec()));
        for &handle in handles {
            self.play(handle)?;
        }
        Ok(())
    }

    fn pause_batch(&self, handles: &[Handle]) -> Result<(), BackendError> {
        self.state.lock().batch_calls.push(("pause", handles.to_vec()));
        for &handle in handles {
            self.pause(handle)?;
        }
        Ok(())
    }

    fn state(&self, handle: Handle) -> Result<SourceState, BackendError> {
        self.with_source("state", handle, |s| s.state)
    }

    fn bind_buffer(&self, handle: Handle, buffer: Option<Handle>) -> Result<(), BackendError> {
        self.with_source("bind_buffer", handle, |s| {
            s.buffers = buffer.into_iter().collect();
            s.processed = 0;
        })
    }

    fn queue_buffers(&self, handle: Handle, buffers: &[Handle]) -> Result<(), BackendError> {
        self.with_source("queue_buffers", handle, |s| s.buffers.extend_from_slice(buffers))
    }

    fn queued_count(&self, handle: Handle) -> Result<u32, BackendError> {
        self.with_source("queued_count", handle, |s| s.buffers.len() as u32)
    }

    fn processed_count(&self, handle: Handle) -> Result<u32, BackendError> {
        self.with_source("processed_count", handle, |s| s.processed)
    }

    fn sample_offset(&self, handle: Handle) -> Result<u32, BackendError> {
        self.with_source("sample_offset", handle, |s| s.offset)
    }

    fn set_sample_offset(&self, handle: Handle, offset: u32) -> Result<(), BackendError> {
        self.with_source("set_sample_offset", handle, |s| s.offset = offset)
    }

    fn position(&self, handle: Handle) -> Result<Vec3, BackendError> {
        self.with_source("position", handle, |s| s.position)
    }

    fn set_position(&self, handle: Handle, position: Vec3) -> Result<(), BackendError> {
        self.with_source("set_position", handle, |s| s.position = position)
    }

    fn pitch(&self, handle: Handle) -> Result<f32, BackendError> {
        self.with_source("pitch", handle, |s| s.pitch)
    }

    fn set_pitch(&self, handle: Handle, pitch: f32) -> Result<(), BackendError> {
        self.with_source("set_pitch", handle, |s| s.pitch = pitch)
    }

    fn gain(&self, handle: Handle) -> Result<f32, BackendError> {
        self.with_source("gain", handle, |s| s.gain)
    }

    fn set_gain(&self, handle: Handle, gain: f32) -> Result<(), BackendError> {
        self.with_source("set_gain", handle, |s| s.gain = gain)
    }

    fn is_relative(&self, handle: Handle) -> Result<bool, BackendError> {
        self.with_source("is_relative", handle, |s| s.relative)
    }

    fn set_relative(&self, handle: Handle, relative: bool) -> Result<(), BackendError> {
        self.with_source("set_relative", handle, |s| s.relative = relative)
    }

    fn is_looping(&self, handle: Handle) -> Result<bool, BackendError> {
        self.with_source("is_looping", handle, |s| s.looping)
    }

    fn set_looping(&self, handle: Handle, looping: bool) -> Result<(), BackendError> {
        self.with_source("set_looping", handle, |s| s.looping = looping)
    }
}

impl ListenerBackend for FakeBackend {
    fn gain(&self) -> Result<f32, BackendError> {
        self.with_listener("listener_gain", |s| s.listener_gain)
    }

    fn set_gain(&self, gain: f32) -> Result<(), BackendError> {
        self.with_listener("set_listener_gain", |s| s.listener_gain = gain)
    }

    fn position(&self) -> Result<Vec3, BackendError> {
        self.with_listener("listener_position", |s| s.listener_position)
    }

    fn set_position(&self, position: Vec3) -> Result<(), BackendError> {
        self.with_listener("set_listener_position", |s| s.listener_position = position)
    }

    fn orientation(&self) -> Result<Orientation, BackendError> {
        self.with_listener("listener_orientation", |s| s.listener_orientation)
    }

    fn set_orientation(&self, orientation: Orientation) -> Result<(), BackendError> {
        self.with_listener("set_listener_orientation", |s| s.listener_orientation = orientation)
    }
}

/// Context whose three backends are separate [`FakeBackend`]s.
pub struct FakeContext {
    pub buffers: Arc<FakeBackend>,
    pub sources: Arc<FakeBackend>,
    pub listener: Arc<FakeBackend>,
    fail_current: AtomicBool,
}

impl FakeContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            buffers: Arc::new(FakeBackend::new()),
            sources: Arc::new(FakeBackend::new()),
            listener: Arc::new(FakeBackend::new()),
            fail_current: AtomicBool::new(false),
        })
    }

    pub fn fail_make_current(&self, fail: bool) {
        self.fail_current.store(fail, Ordering::SeqCst);
    }
}

impl AudioContext for FakeContext {
    fn make_current(&self) -> Result<(), BackendError> {
        if self.fail_current.load(Ordering::SeqCst) {
            return Err(BackendError::new("make_current", INVALID_OPERATION));
        }
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

pub struct FakeDevice {
    name: String,
    pub contexts: Mutex<Vec<Arc<FakeContext>>>,
}

impl AudioDevice for FakeDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_context(&self) -> Result<Arc<dyn AudioContext>, BackendError> {
        let context = FakeContext::new();
        self.contexts.lock().push(context.clone());
        Ok(context)
    }
}

/// Driver listing a fixed set of devices; the first one is the default.
pub struct FakeDriver {
    names: Vec<String>,
    unavailable: Mutex<HashSet<String>>,
    pub opened: Mutex<Vec<Arc<FakeDevice>>>,
}

impl FakeDriver {
    pub fn new(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            unavailable: Mutex::new(HashSet::new()),
            opened: Mutex::new(Vec::new()),
        })
    }

    pub fn make_unavailable(&self, name: &str) {
        self.unavailable.lock().insert(name.to_string());
    }

    /// Most recent context created on the device called `name`.
    pub fn context(&self, name: &str) -> Option<Arc<FakeContext>> {
        let opened = self.opened.lock();
        let device = opened.iter().rev().find(|d| d.name == name)?;
        let context = device.contexts.lock().last().cloned();
        context
    }
}

impl AudioDriver for FakeDriver {
    fn devices(&self) -> Result<Vec<DeviceDescription>, BackendError> {
        Ok(self
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
            self.names.first().cloned().unwrap_or_default()
        } else {
            device.name.clone()
        };
        if !self.names.contains(&name) || self.unavailable.lock().contains(&name) {
            return Err(BackendError::new("open_device", INVALID_NAME));
        }
        let device = Arc::new(FakeDevice {
            name,
            contexts: Mutex::new(Vec::new()),
        });
        self.opened.lock().push(device.clone());
        Ok(device)
    }
}
