pub mod buffer;
pub mod listener;
pub mod source;
