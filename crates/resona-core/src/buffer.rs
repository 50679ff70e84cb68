//! Rendered-audio buffer and stream format.
//!
//! The synthesis engine renders into a [`RenderBuffer`] — interleaved `f32`
//! samples tagged with channel count and sample rate — and the audio sink
//! converts that into the device's native byte layout (16-bit little-endian
//! interleaved).

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::time::AudioTime;

/// Channel count and sample rate of an audio stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioFormat {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: f64,
}

impl AudioFormat {
    /// Bytes per sample in the device's native layout (16-bit PCM).
    pub const BYTES_PER_SAMPLE: usize = 2;

    /// Create a format.
    ///
    /// Zero channels or a non-positive rate is a caller contract violation.
    pub fn new(channels: u16, sample_rate: f64) -> Self {
        debug_assert!(channels > 0, "at least one channel required");
        debug_assert!(sample_rate > 0.0, "sample rate must be positive");
        Self {
            channels,
            sample_rate,
        }
    }

    /// A stereo format at the given rate.
    pub fn stereo(sample_rate: f64) -> Self {
        Self::new(2, sample_rate)
    }

    /// A mono format at the given rate.
    pub fn mono(sample_rate: f64) -> Self {
        Self::new(1, sample_rate)
    }

    /// Bytes per frame in the device's native layout.
    pub fn frame_size(&self) -> usize {
        self.channels as usize * Self::BYTES_PER_SAMPLE
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::stereo(44100.0)
    }
}

/// A block of rendered audio.
///
/// Samples are interleaved `f32` in the nominal `[-1, 1]` range. The buffer
/// carries its own format so downstream consumers (the sink, per-voice
/// filters) can react to sample-rate changes without a side channel.
#[derive(Clone, Debug)]
pub struct RenderBuffer {
    channels: u16,
    sample_rate: f64,
    data: Vec<f32>,
}

impl RenderBuffer {
    /// Allocate a silent buffer of `frames` frames.
    pub fn new(channels: u16, sample_rate: f64, frames: usize) -> Self {
        debug_assert!(channels > 0, "at least one channel required");
        debug_assert!(sample_rate > 0.0, "sample rate must be positive");
        Self {
            channels,
            sample_rate,
            data: vec![0.0; frames * channels as usize],
        }
    }

    /// Allocate a silent buffer matching `format`.
    pub fn with_format(format: AudioFormat, frames: usize) -> Self {
        Self::new(format.channels, format.sample_rate, frames)
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    /// The format of this buffer.
    pub fn format(&self) -> AudioFormat {
        AudioFormat::new(self.channels, self.sample_rate)
    }

    /// The playing duration of this buffer.
    pub fn duration(&self) -> AudioTime {
        AudioTime::from_samples(self.frames() as i64, self.sample_rate)
    }

    /// The interleaved sample data.
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// The interleaved sample data, mutably.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Zero every sample.
    pub fn fill_silence(&mut self) {
        self.data.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_frame_size() {
        assert_eq!(AudioFormat::stereo(44100.0).frame_size(), 4);
        assert_eq!(AudioFormat::mono(48000.0).frame_size(), 2);
    }

    #[test]
    fn test_buffer_dimensions() {
        let buf = RenderBuffer::new(2, 44100.0, 512);
        assert_eq!(buf.frames(), 512);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.samples().len(), 1024);
    }

    #[test]
    fn test_buffer_duration() {
        let buf = RenderBuffer::new(1, 44100.0, 44100);
        assert_eq!(buf.duration(), AudioTime::from_nanos(1_000_000_000));
    }

    #[test]
    fn test_fill_silence() {
        let mut buf = RenderBuffer::new(1, 48000.0, 8);
        buf.samples_mut().fill(0.5);
        buf.fill_silence();
        assert!(buf.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_with_format() {
        let buf = RenderBuffer::with_format(AudioFormat::stereo(48000.0), 64);
        assert_eq!(buf.format(), AudioFormat::stereo(48000.0));
        assert_eq!(buf.frames(), 64);
    }
}
