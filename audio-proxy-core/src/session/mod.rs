pub mod audio_system;
