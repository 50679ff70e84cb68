//! A device-less sink for offline rendering and tests.

use resona_core::{AdjustableAudioClock, AudioClock, AudioFormat, AudioTime, ClockOffset, RenderBuffer};

use crate::sink::AudioSink;

/// Default latency the null sink pretends to have, in milliseconds.
const DEFAULT_LATENCY_MILLIS: f64 = 100.0;

/// An [`AudioSink`] with no device behind it.
///
/// Accepts every buffer instantly and counts the samples written, which
/// makes it the natural sink for offline rendering, scheduler tests, and
/// end-to-end runs that should not touch audio hardware. It is always open,
/// and its audio clock reports written-samples time (a perfect device
/// position: the "playback head" is wherever the writer is).
#[derive(Clone, Debug)]
pub struct NullSink {
    format: AudioFormat,
    written_samples: u64,
    offset: ClockOffset,
}

impl NullSink {
    /// Create a null sink for the given stream format.
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            written_samples: 0,
            offset: ClockOffset::ZERO,
        }
    }

    /// Zero the written counter and the clock offset for a new run.
    pub fn reset(&mut self) {
        self.written_samples = 0;
        self.offset = ClockOffset::ZERO;
    }

    /// Total samples written so far.
    pub fn written_samples(&self) -> u64 {
        self.written_samples
    }

    /// The written position as an instant, excluding the clock offset.
    pub fn written_time(&self) -> AudioTime {
        AudioTime::from_samples(self.written_samples as i64, self.format.sample_rate)
    }
}

impl AudioSink for NullSink {
    fn write(&mut self, buffer: &RenderBuffer) {
        self.written_samples += buffer.frames() as u64;
    }

    fn is_open(&self) -> bool {
        true
    }

    fn close(&mut self) {
        // nothing to release
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn buffer_size(&self) -> usize {
        resona_core::math::millis_to_samples(DEFAULT_LATENCY_MILLIS, self.format.sample_rate)
            as usize
    }
}

impl AudioClock for NullSink {
    fn audio_time(&self) -> AudioTime {
        AudioTime::from_samples(
            self.written_samples as i64 + self.offset.samples(),
            self.format.sample_rate,
        )
    }
}

impl AdjustableAudioClock for NullSink {
    fn time_offset(&self) -> AudioTime {
        self.offset.as_time()
    }

    fn set_time_offset(&mut self, offset: AudioTime) {
        self.offset = ClockOffset::new(offset, self.format.sample_rate);
    }
}
