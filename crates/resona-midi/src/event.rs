//! The normalized MIDI event shape.
//!
//! Heterogeneous sources (live device input, file-sequencer playback) are
//! normalized into one event type before fan-out: short messages are
//! decomposed into channel/status/data bytes, longer messages (system
//! exclusive) stay raw.

use resona_core::AudioTime;

/// Status byte threshold: everything at or above is a system or real-time
/// message and carries no channel.
const SYSTEM_STATUS: u8 = 0xF0;

/// A decomposed or raw MIDI message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    /// A channel-voice or system message of up to three bytes.
    Short {
        /// Channel 0-15 for channel-voice messages, 0 for system messages.
        channel: u8,
        /// Status byte with the channel nibble masked off for channel-voice
        /// messages; the full byte for system messages.
        status: u8,
        /// First data byte, 0 when absent.
        data1: u8,
        /// Second data byte, 0 when absent.
        data2: u8,
    },
    /// A message longer than three bytes, forwarded undecomposed.
    Long(Vec<u8>),
}

impl MidiMessage {
    /// Classify a raw message.
    ///
    /// Three bytes or fewer decompose into [`MidiMessage::Short`]: for a
    /// status below `0xF0` the channel is the low nibble of the status byte,
    /// system and real-time messages get channel 0. Missing data bytes read
    /// as zero. Anything longer stays [`MidiMessage::Long`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.len() > 3 {
            return Self::Long(bytes.to_vec());
        }
        let raw_status = bytes.first().copied().unwrap_or(0);
        let (channel, status) = if raw_status < SYSTEM_STATUS {
            (raw_status & 0x0F, raw_status & 0xF0)
        } else {
            (0, raw_status)
        };
        Self::Short {
            channel,
            status,
            data1: bytes.get(1).copied().unwrap_or(0),
            data2: bytes.get(2).copied().unwrap_or(0),
        }
    }

    /// The status byte, or the leading byte for a long message.
    pub fn status(&self) -> u8 {
        match self {
            Self::Short { status, .. } => *status,
            Self::Long(bytes) => bytes.first().copied().unwrap_or(0),
        }
    }

    /// Whether this is a system or real-time message.
    pub fn is_system(&self) -> bool {
        self.status() >= SYSTEM_STATUS
    }
}

/// A MIDI message stamped with its position on the master timeline.
///
/// A zero time means "apply immediately"; scheduling is the receiver's
/// responsibility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    /// Resolved timestamp on the master timeline.
    pub time: AudioTime,
    /// The normalized message.
    pub message: MidiMessage,
}
