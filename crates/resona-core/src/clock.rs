//! Clock capabilities for time-producing components.
//!
//! The audio sink and the MIDI input each run on their own device-native
//! clock. To make scheduled events land at the right sample position, both
//! are aligned onto one master timeline: an external coordinator computes
//! "master time at stream start minus device-native time at stream start"
//! and pushes that delta into each clock once, through
//! [`AdjustableAudioClock::set_time_offset`].

use crate::time::AudioTime;

/// A component that can report the current position on the master timeline.
pub trait AudioClock {
    /// The current time, including any configured offset.
    fn audio_time(&self) -> AudioTime;
}

/// A clock with a settable offset.
///
/// Setting the offset updates both the sample-domain and nanosecond-domain
/// representations in one step; no intermediate state is observable through
/// [`time_offset`](AdjustableAudioClock::time_offset) or
/// [`audio_time`](AudioClock::audio_time). The offset is set before or
/// between active playback sessions; callers serialize offset changes
/// against concurrent reads.
pub trait AdjustableAudioClock: AudioClock {
    /// The currently configured offset.
    fn time_offset(&self) -> AudioTime;

    /// Replace the offset, aligning this clock to the master timeline.
    fn set_time_offset(&mut self, offset: AudioTime);
}

/// A clock offset held in both domains.
///
/// A device reporting its position in samples wants the offset in samples; a
/// device reporting nanoseconds wants nanoseconds. Both representations are
/// derived together at construction, so an owner that swaps a `ClockOffset`
/// whole (under its own lock) can never expose an old sample-domain value
/// paired with a new nanosecond-domain value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockOffset {
    samples: i64,
    nanos: i64,
}

impl ClockOffset {
    /// The zero offset.
    pub const ZERO: ClockOffset = ClockOffset {
        samples: 0,
        nanos: 0,
    };

    /// Derive both domains from an offset instant at the given sample rate.
    pub fn new(offset: AudioTime, sample_rate: f64) -> Self {
        Self {
            samples: offset.samples(sample_rate),
            nanos: offset.nanos(),
        }
    }

    /// The offset in samples at the rate it was constructed with.
    pub const fn samples(&self) -> i64 {
        self.samples
    }

    /// The offset in nanoseconds.
    pub const fn nanos(&self) -> i64 {
        self.nanos
    }

    /// The offset as an instant on the master timeline.
    pub const fn as_time(&self) -> AudioTime {
        AudioTime::from_nanos(self.nanos)
    }
}
