use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::processing::playback_math;

/// A point or direction in listener space.
pub type Vec3 = [f32; 3];

pub(crate) const NAN_VEC3: Vec3 = [f32::NAN, f32::NAN, f32::NAN];

/// Listener orientation: forward (`at`) and `up` vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub at: Vec3,
    pub up: Vec3,
}

impl Orientation {
    /// Sentinel returned when the backend query fails.
    pub fn nan() -> Self {
        Self {
            at: NAN_VEC3,
            up: NAN_VEC3,
        }
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            at: [0.0, 0.0, -1.0],
            up: [0.0, 1.0, 0.0],
        }
    }
}

/// An audio output device the driver can open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescription {
    /// Device name; empty selects the system default device.
    pub name: String,
    /// Whether the system considers this device its default output.
    pub is_default: bool,
}

impl DeviceDescription {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_default: false,
        }
    }
}

impl Default for DeviceDescription {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_default: true,
        }
    }
}

impl fmt::Display for DeviceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ name: \"{}\", default: {} }}", self.name, self.is_default)
    }
}

/// Decoded 16-bit PCM content ready to be bound to a buffer.
///
/// Samples are interleaved; `frame_count` is the per-channel sample count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl DecodedAudio {
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            channels,
            sample_rate,
            samples,
        }
    }

    /// Mono silence of the given length, mostly useful for tests and demos.
    pub fn silence(sample_rate: u32, frames: usize) -> Self {
        Self::new(1, sample_rate, vec![0; frames])
    }

    pub fn frame_count(&self) -> u32 {
        if self.channels == 0 {
            return 0;
        }
        (self.samples.len() / self.channels as usize) as u32
    }

    pub fn duration(&self) -> Duration {
        playback_math::samples_to_duration(u64::from(self.frame_count()), self.sample_rate)
    }

    /// Checks the layout a backend buffer can hold: mono or stereo, a
    /// non-zero rate and whole frames.
    pub fn validate(&self) -> Result<(), String> {
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.samples.len() % self.channels as usize != 0 {
            return Err(format!(
                "{} samples do not form whole {}-channel frames",
                self.samples.len(),
                self.channels
            ));
        }
        if self.samples.len() / self.channels as usize > u32::MAX as usize {
            return Err("too many frames".into());
        }
        Ok(())
    }
}
