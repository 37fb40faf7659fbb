pub mod playback_math;
