//! Resona Synth - per-voice DSP for the synthesizer engine
//!
//! Currently this crate provides the per-voice tone-shaping stage:
//!
//! - [`VoiceFilter`] - A state-variable low-pass filter whose cutoff and
//!   resonance are layered from instrument data, MIDI continuous
//!   controllers, and per-block performance modulation
//!
//! Voice allocation, sample playback, and envelope/LFO generation live
//! upstream; they feed the filter its modulation input each render block.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod filter;

pub use filter::{CC_CUTOFF, CC_RESONANCE, VoiceFilter};
