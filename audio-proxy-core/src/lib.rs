//! # audio-proxy-core
//!
//! Backend-agnostic audio proxy core library.
//!
//! Provides pooled handles for audio buffers and sources, clonable proxy
//! objects over them, and migration of all live audio state when the output
//! device changes. Backends (an OpenAL binding, the `audio-proxy-soft`
//! emulator) implement the traits in `traits/` and plug into `AudioSystem`.
//!
//! ## Architecture
//!
//! ```text
//! audio-proxy-core (this crate)
//! ├── traits/       ← HandleBackend, BufferBackend, SourceBackend, ListenerBackend, AudioDriver
//! ├── models/       ← BackendError, ProxyError, SourceState, AudioConfiguration, DecodedAudio
//! ├── pool/         ← HandlePool (batched handle arena with migration lineage)
//! ├── registry/     ← BufferRegistry, SourceRegistry, ListenerController
//! ├── proxy/        ← Buffer, Source, Listener
//! ├── processing/   ← sample ↔ time conversions
//! ├── migration/    ← MigrationCoordinator, snapshots
//! ├── session/      ← AudioSystem (entry point)
//! └── storage/      ← configuration file
//! ```

pub mod migration;
pub mod models;
pub mod pool;
pub mod processing;
pub mod proxy;
pub mod registry;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types at crate root for convenience.
pub use migration::coordinator::MigrationCoordinator;
pub use migration::snapshot::{ListenerSnapshot, SourceSnapshot};
pub use models::audio_models::{DecodedAudio, DeviceDescription, Orientation, Vec3};
pub use models::config::AudioConfiguration;
pub use models::error::{BackendError, ProxyError};
pub use models::migration::{MigrationMapping, MigrationReport};
pub use models::state::{SourceState, SourceType};
pub use pool::handle_pool::HandlePool;
pub use proxy::buffer::Buffer;
pub use proxy::listener::Listener;
pub use proxy::source::Source;
pub use registry::buffer_registry::{BufferRegistry, SharedBuffers};
pub use registry::listener_controller::{ListenerController, SharedListener};
pub use registry::source_registry::{SharedSources, SourceBinding, SourceRegistry};
pub use session::audio_system::AudioSystem;
pub use traits::buffer_backend::BufferBackend;
pub use traits::device::{AudioContext, AudioDevice, AudioDriver};
pub use traits::handle_backend::{Handle, HandleBackend};
pub use traits::listener_backend::ListenerBackend;
pub use traits::source_backend::SourceBackend;
