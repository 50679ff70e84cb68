//! MIDI layer for the resona synthesizer engine.
//!
//! This crate provides:
//!
//! - **The event model**: [`MidiMessage`] and [`MidiEvent`] — the one shape
//!   every message source is normalized into before reaching the engine
//! - **The dispatcher**: [`MidiDispatcher`], which resolves device
//!   timestamps onto the master timeline and fans events out to registered
//!   [`MidiListener`]s
//! - **The transport**: [`SmfTransport`], lifecycle and seek control over a
//!   MIDI-file [`Sequencer`], doubling as the playback clock
//!
//! Byte-level MIDI file parsing is not this crate's concern; it lives
//! behind the [`Sequencer`] trait.

mod dispatch;
mod event;
mod transport;

pub use dispatch::{ListenerId, MidiDispatcher, MidiListener};
pub use event::{MidiEvent, MidiMessage};
pub use transport::{Sequencer, SmfTransport};

/// Error types for MIDI operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The sequencer rejected or failed to play a sequence.
    #[error("sequence error: {0}")]
    Sequence(String),

    /// A MIDI file could not be read.
    #[error("failed to read midi file: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for MIDI operations.
pub type Result<T> = std::result::Result<T, Error>;
