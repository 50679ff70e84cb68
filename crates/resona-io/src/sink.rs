//! The audio sink contract.

use resona_core::{AudioFormat, RenderBuffer};

/// Buffer size reported by a sink that has never been opened.
///
/// Downstream code sizes its render blocks off the sink before opening it,
/// so a closed sink answers with this default instead of zero.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// How a sink derives the current playback position for its audio clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeStrategy {
    /// Wall clock elapsed since the first write of the session, plus the
    /// clock offset. Used when the underlying device cannot report an
    /// accurate playback head position (its counter resets or drifts
    /// independently of actual output latency).
    #[default]
    Emulated,
    /// The device-reported playback position in samples, plus the clock
    /// offset in samples. Requires a monotonic position query from the
    /// device; implementations fall back to [`TimeStrategy::Emulated`]
    /// when none is available.
    DeviceReported,
}

/// Per-instance sink configuration.
#[derive(Clone, Debug, Default)]
pub struct SinkConfig {
    /// Output device name, matched case-insensitively as a substring; the
    /// platform default device when `None`.
    pub device_name: Option<String>,
    /// Time-reporting strategy for the sink's audio clock.
    pub time_strategy: TimeStrategy,
}

/// The push-style consumer of rendered audio.
///
/// Lifecycle: `Closed → Open → (Stopped ⇄ Started) → Closed`. Opening is a
/// concrete-type concern (a device sink needs a format and a fallible device
/// handshake, a null sink does not); everything after open is uniform.
///
/// Control calls take `&mut self`, so a sink shared between the audio pump
/// and a control thread is wrapped in a mutex by its owner; the methods
/// themselves hold no lock across the blocking device write.
pub trait AudioSink {
    /// Write a rendered block to the device.
    ///
    /// A silent no-op when the sink is not open — upstream producers are not
    /// expected to track sink lifecycle precisely. The first write after
    /// open (or after a stop) starts the stream and records the session's
    /// start reference. May block until device buffer space is available;
    /// that blocking is the engine's backpressure mechanism.
    fn write(&mut self, buffer: &RenderBuffer);

    /// Whether the sink currently holds an open session.
    fn is_open(&self) -> bool;

    /// Stop and release the device. Idempotent.
    fn close(&mut self);

    /// The current (or, when closed, previous) stream format.
    fn format(&self) -> AudioFormat;

    /// The configured buffer size in samples, or [`DEFAULT_BUFFER_SIZE`]
    /// when no session has been opened.
    fn buffer_size(&self) -> usize;

    /// Number of output channels.
    fn channels(&self) -> u16 {
        self.format().channels
    }

    /// Output sample rate in Hz.
    fn sample_rate(&self) -> f64 {
        self.format().sample_rate
    }
}
