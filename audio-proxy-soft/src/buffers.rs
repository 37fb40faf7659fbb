use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use audio_proxy_core::models::audio_models::DecodedAudio;
use audio_proxy_core::models::error::BackendError;
use audio_proxy_core::traits::buffer_backend::BufferBackend;
use audio_proxy_core::traits::handle_backend::{Handle, HandleBackend};

use crate::context::ContextTag;
use crate::{AL_INVALID_NAME, AL_INVALID_VALUE, AL_OUT_OF_MEMORY};

#[derive(Default)]
struct BufferStore {
    next: Handle,
    live: HashMap<Handle, Option<DecodedAudio>>,
    fail_generate: bool,
    fail_uploads: bool,
}

/// Buffer namespace of one context. Handles start at 1.
pub struct SoftBuffers {
    tag: Arc<ContextTag>,
    store: Mutex<BufferStore>,
}

impl SoftBuffers {
    pub(crate) fn new(tag: Arc<ContextTag>) -> Self {
        Self {
            tag,
            store: Mutex::new(BufferStore {
                next: 1,
                ..Default::default()
            }),
        }
    }

    pub fn fail_generate(&self, fail: bool) {
        self.store.lock().fail_generate = fail;
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.store.lock().fail_uploads = fail;
    }

    pub fn live_count(&self) -> usize {
        self.store.lock().live.len()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.store.lock().live.contains_key(&handle)
    }

    /// Content last uploaded into `handle`.
    pub fn data(&self, handle: Handle) -> Option<DecodedAudio> {
        self.store.lock().live.get(&handle).cloned().flatten()
    }

    /// Frames and rate of a live buffer; `(0, 0)` while it is empty.
    pub(crate) fn span(&self, handle: Handle) -> Option<(u32, u32)> {
        let store = self.store.lock();
        let content = store.live.get(&handle)?;
        Some(
            content
                .as_ref()
                .map_or((0, 0), |audio| (audio.frame_count(), audio.sample_rate)),
        )
    }
}

impl HandleBackend for SoftBuffers {
    fn generate(&self, count: u32) -> Result<Vec<Handle>, BackendError> {
        self.tag.touch("alGenBuffers");
        let mut store = self.store.lock();
        if store.fail_generate {
            return Err(BackendError::new("alGenBuffers", AL_OUT_OF_MEMORY));
        }
        let start = store.next;
        store.next += count;
        let handles: Vec<Handle> = (start..start + count).collect();
        for &handle in &handles {
            store.live.insert(handle, None);
        }
        Ok(handles)
    }

    fn reclaim(&self, handle: Handle) {
        self.tag.touch("reclaim buffer");
        if let Some(content) = self.store.lock().live.get_mut(&handle) {
            *content = None;
        }
    }

    fn delete(&self, handles: &[Handle]) {
        self.tag.touch("alDeleteBuffers");
        let mut store = self.store.lock();
        for handle in handles {
            store.live.remove(handle);
        }
    }
}

impl BufferBackend for SoftBuffers {
    fn set_data(&self, handle: Handle, audio: &DecodedAudio) -> Result<(), BackendError> {
        self.tag.touch("alBufferData");
        let mut store = self.store.lock();
        if store.fail_uploads {
            return Err(BackendError::new("alBufferData", AL_OUT_OF_MEMORY));
        }
        if audio.validate().is_err() {
            return Err(BackendError::new("alBufferData", AL_INVALID_VALUE));
        }
        let Some(content) = store.live.get_mut(&handle) else {
            return Err(BackendError::new("alBufferData", AL_INVALID_NAME));
        };
        *content = Some(audio.clone());
        Ok(())
    }
}
