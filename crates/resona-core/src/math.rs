//! Musical math helpers.
//!
//! Level and pitch conversions used by the voice filter's layered modulation
//! model, plus time/sample conversions shared by the sink and scheduler.
//! All functions are allocation-free and `no_std` compatible.

use libm::{exp2f, expf, logf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use resona_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Convert SoundFont absolute cents to a frequency in Hz.
///
/// Absolute cents place 0 at 8.176 Hz (MIDI key 0), with 1200 cents per
/// octave, so the default filter cutoff of 13500 cents lands near 20 kHz.
///
/// # Example
/// ```rust
/// use resona_core::cents_to_hz;
///
/// // 6900 absolute cents = A440
/// assert!((cents_to_hz(6900.0) - 440.0).abs() < 0.5);
/// ```
#[inline]
pub fn cents_to_hz(cents: f32) -> f32 {
    8.176 * exp2f(cents / 1200.0)
}

/// Convert a relative pitch offset in semitones to a frequency ratio.
///
/// # Example
/// ```rust
/// use resona_core::semitones_to_ratio;
///
/// assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-5);
/// assert!((semitones_to_ratio(0.0) - 1.0).abs() < 1e-6);
/// ```
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    exp2f(semitones / 12.0)
}

/// Convert milliseconds to a whole sample count at the given rate.
#[inline]
pub fn millis_to_samples(millis: f64, sample_rate: f64) -> i64 {
    (millis * sample_rate / 1000.0) as i64
}

/// Convert a sample count to milliseconds at the given rate.
#[inline]
pub fn samples_to_millis(samples: i64, sample_rate: f64) -> f64 {
    samples as f64 * 1000.0 / sample_rate
}

/// Convert seconds to a whole sample count at the given rate.
#[inline]
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> i64 {
    (seconds * sample_rate) as i64
}
