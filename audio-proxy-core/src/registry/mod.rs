pub mod buffer_registry;
pub mod listener_controller;
pub mod source_registry;
