//! Audio output layer for the resona synthesizer engine.
//!
//! This crate provides:
//!
//! - **The sink contract**: [`AudioSink`], the push-style consumer of
//!   rendered audio, with [`DeviceSink`] (cpal-backed) and [`NullSink`]
//!   (device-less, for offline rendering and tests) implementations
//! - **The servicing scheduler**: [`ServiceScheduler`], which fires the
//!   synthesis engine's housekeeping hook at a fixed sample cadence
//!   independent of buffer size and enforces a stop boundary
//! - **The audio pump**: [`AudioPump`], the pull loop that renders blocks
//!   from an [`AudioRenderer`] and feeds them to a sink
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resona_core::AudioFormat;
//! use resona_io::{AudioPump, DeviceSink, ServiceScheduler, SinkConfig};
//!
//! let format = AudioFormat::stereo(44100.0);
//! let mut sink = DeviceSink::new(SinkConfig::default());
//! sink.open(format, 1024)?;
//!
//! let mut scheduler = ServiceScheduler::with_interval_millis(100.0, 44100.0);
//! let pump = AudioPump::new();
//! pump.run(&mut synth, &mut sink, &mut scheduler, 441);
//! ```

mod convert;
mod device;
mod null;
mod pump;
mod scheduler;
mod sink;

pub use device::DeviceSink;
pub use null::NullSink;
pub use pump::{AudioPump, AudioRenderer, PumpHandle};
pub use scheduler::{ServiceAction, ServiceScheduler};
pub use sink::{AudioSink, DEFAULT_BUFFER_SIZE, SinkConfig, TimeStrategy};

/// Error types for audio output operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Audio stream setup or runtime error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio output device available on the system.
    #[error("no audio output device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The requested stream configuration is not supported by the device.
    #[error("unsupported stream configuration: {0}")]
    UnsupportedConfig(String),
}

/// Convenience result type for audio output operations.
pub type Result<T> = std::result::Result<T, Error>;
