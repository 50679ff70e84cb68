//! Resona Core - timing and buffer primitives for the synthesizer engine
//!
//! This crate provides the foundational types shared by every part of the
//! engine: the unified time model, the clock capability traits used to keep
//! independent time sources (audio output, MIDI input) on one master
//! timeline, the rendered-audio buffer, and the musical math helpers the
//! synthesis path needs.
//!
//! # Core Abstractions
//!
//! ## Time Model
//!
//! - [`AudioTime`] - An immutable instant, convertible between a sample
//!   count at a given rate and a nanosecond count
//!
//! ## Clock Capabilities
//!
//! - [`AudioClock`] - Anything that can report the current engine time
//! - [`AdjustableAudioClock`] - A clock with a settable offset, used to
//!   align device-local time onto the shared master timeline
//! - [`ClockOffset`] - The offset held in both domains (samples and
//!   nanoseconds) so readers never observe a half-updated pair
//!
//! ## Buffers
//!
//! - [`AudioFormat`] - Channel count and sample rate of a stream
//! - [`RenderBuffer`] - Interleaved `f32` samples tagged with their format
//!
//! ## Math
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Level conversions
//! - [`cents_to_hz`] / [`semitones_to_ratio`] - Pitch conversions used by
//!   the voice filter's layered modulation
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! resona-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod buffer;
pub mod clock;
pub mod math;
pub mod time;

pub use buffer::{AudioFormat, RenderBuffer};
pub use clock::{AdjustableAudioClock, AudioClock, ClockOffset};
pub use math::{
    cents_to_hz, db_to_linear, linear_to_db, millis_to_samples, samples_to_millis,
    seconds_to_samples, semitones_to_ratio,
};
pub use time::AudioTime;
