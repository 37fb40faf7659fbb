//! # audio-proxy-soft
//!
//! In-memory emulated audio backend for audio-proxy-core.
//!
//! Provides:
//! - `SoftDriver`: Fixed device list with failure injection
//! - `SoftContext`: One rendering context and its object namespaces
//! - `SoftBuffers` / `SoftSources` / `SoftListener`: OpenAL-style object semantics
//!
//! Nothing is rendered. Playback time only passes when
//! [`SoftContext::advance`] is called. Calls made on a context that is not
//! current are counted in [`SoftContext::stray_calls`].
//!
//! ## Usage
//! ```ignore
//! use audio_proxy_core::{AudioConfiguration, AudioSystem};
//! use audio_proxy_soft::SoftDriver;
//!
//! let driver = SoftDriver::new(&["Speakers", "Headphones"]);
//! let mut system = AudioSystem::new(driver.clone());
//! system.initialize(AudioConfiguration::default())?;
//! driver.current_context().unwrap().advance(Duration::from_secs(1));
//! ```

pub mod buffers;
pub mod context;
pub mod driver;
pub mod listener;
pub mod sources;

pub use buffers::SoftBuffers;
pub use context::SoftContext;
pub use driver::{SoftDevice, SoftDriver};
pub use listener::SoftListener;
pub use sources::SoftSources;

// OpenAL error codes reported through `BackendError::code`.
pub const AL_INVALID_NAME: u32 = 0xA001;
pub const AL_INVALID_VALUE: u32 = 0xA003;
pub const AL_INVALID_OPERATION: u32 = 0xA004;
pub const AL_OUT_OF_MEMORY: u32 = 0xA005;

// ALC error codes.
pub const ALC_INVALID_DEVICE: u32 = 0xA001;
pub const ALC_INVALID_CONTEXT: u32 = 0xA002;
