//! Sample ↔ time conversions for playback position.
//!
//! A source's raw sample offset counts samples across its active buffers in
//! order. Queued buffers may each have their own sample rate, so position is
//! found by walking the buffers rather than dividing by a single rate.

use std::time::Duration;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Length and rate of one active buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSpan {
    pub sample_count: u32,
    pub frequency_hz: u32,
}

impl BufferSpan {
    pub fn duration(&self) -> Duration {
        samples_to_duration(u64::from(self.sample_count), self.frequency_hz)
    }
}

/// `round(samples * 1e9 / frequency)` nanoseconds, halves rounded up.
/// A zero frequency yields zero.
pub fn samples_to_duration(samples: u64, frequency_hz: u32) -> Duration {
    if frequency_hz == 0 {
        return Duration::ZERO;
    }
    let frequency = u128::from(frequency_hz);
    let nanos = (u128::from(samples) * NANOS_PER_SECOND + frequency / 2) / frequency;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Nearest whole sample count for `duration` at `frequency_hz`.
pub fn duration_to_samples(duration: Duration, frequency_hz: u32) -> u64 {
    let samples =
        (duration.as_nanos() * u128::from(frequency_hz) + NANOS_PER_SECOND / 2) / NANOS_PER_SECOND;
    u64::try_from(samples).unwrap_or(u64::MAX)
}

pub fn total_duration(spans: &[BufferSpan]) -> Duration {
    spans.iter().map(BufferSpan::duration).sum()
}

/// Time position reached after consuming `offset` samples across `spans`.
/// Offsets past the end are capped at the total duration.
pub fn offset_to_position(spans: &[BufferSpan], offset: u64) -> Duration {
    let mut remaining = offset;
    let mut position = Duration::ZERO;
    for span in spans {
        if remaining == 0 {
            break;
        }
        let consumed = remaining.min(u64::from(span.sample_count));
        position += samples_to_duration(consumed, span.frequency_hz);
        remaining -= consumed;
    }
    position
}

/// Raw sample offset for `position`, rounded to the nearest sample of the
/// buffer the position falls in. Positions past the end map to the total
/// sample count.
pub fn position_to_offset(spans: &[BufferSpan], position: Duration) -> u64 {
    let mut remaining = position;
    let mut offset = 0u64;
    for span in spans {
        let span_duration = span.duration();
        if remaining > span_duration {
            offset += u64::from(span.sample_count);
            remaining -= span_duration;
            continue;
        }
        let samples = duration_to_samples(remaining, span.frequency_hz);
        return offset + samples.min(u64::from(span.sample_count));
    }
    offset
}
