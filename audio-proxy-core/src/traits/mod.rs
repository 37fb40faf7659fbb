pub mod buffer_backend;
pub mod device;
pub mod handle_backend;
pub mod listener_backend;
pub mod source_backend;
