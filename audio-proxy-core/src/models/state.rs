use std::fmt;

/// Playback state of a source, as reported by the backend.
///
/// State transitions:
/// ```text
/// initial → playing ↔ paused
///              ↓        ↓
///           stopped ←───┘        (any non-initial) → initial via rewind
/// ```
/// `Unknown` is what callers see when the backend state query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceState {
    Initial,
    Playing,
    Paused,
    Stopped,
    Unknown,
}

impl SourceState {
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Buffers may only be bound or queued while the source is idle.
    pub fn accepts_buffers(&self) -> bool {
        matches!(self, Self::Initial | Self::Stopped)
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "Initial",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// How a source is fed, derived from its buffer binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Undetermined,
    Static,
    Streaming,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undetermined => "Undetermined",
            Self::Static => "Static",
            Self::Streaming => "Streaming",
        };
        f.write_str(name)
    }
}
