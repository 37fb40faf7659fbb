use std::fmt;

use serde::{Deserialize, Serialize};

use super::audio_models::DeviceDescription;

/// Largest handle batch a single generator call may be asked for.
pub const MAX_BATCH_SIZE: u32 = 4096;

/// Configuration for an audio system instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfiguration {
    /// Buffer handle generation batch size (default: 32).
    pub buffer_batch: u32,

    /// Source handle generation batch size (default: 32).
    pub source_batch: u32,

    /// Output device to open.
    pub device: DeviceDescription,
}

impl AudioConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_batch == 0 || self.buffer_batch > MAX_BATCH_SIZE {
            return Err(format!("unsupported buffer batch size: {}", self.buffer_batch));
        }
        if self.source_batch == 0 || self.source_batch > MAX_BATCH_SIZE {
            return Err(format!("unsupported source batch size: {}", self.source_batch));
        }
        if !self.device.is_default && self.device.name.is_empty() {
            return Err("non-default device requires a name".into());
        }
        Ok(())
    }

    pub fn with_device(mut self, device: DeviceDescription) -> Self {
        self.device = device;
        self
    }
}

impl Default for AudioConfiguration {
    fn default() -> Self {
        Self {
            buffer_batch: 32,
            source_batch: 32,
            device: DeviceDescription::default(),
        }
    }
}

impl fmt::Display for AudioConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioConfiguration {{ buffer_batch: {}, source_batch: {}, device: {} }}",
            self.buffer_batch, self.source_batch, self.device
        )
    }
}
