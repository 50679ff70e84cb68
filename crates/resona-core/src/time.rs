//! The unified time model.
//!
//! Every component of the engine — the audio sink, the MIDI dispatcher, the
//! servicing scheduler — expresses "now" as an [`AudioTime`]. An instant can
//! be constructed either from a sample count at a known sample rate or from a
//! raw nanosecond count; both views describe the same point on the master
//! timeline, and equality and ordering are defined on the normalized
//! nanosecond value.

use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign};

const NANOS_PER_SECOND: f64 = 1.0e9;

/// An immutable point in time on the engine's master timeline.
///
/// Internally held as a signed nanosecond count. Conversion from the sample
/// domain truncates toward zero and conversion back rounds to the nearest
/// sample, so a sample→nano→sample round trip at a fixed rate is stable
/// within one unit of rounding after the first conversion.
///
/// `AudioTime` is `Copy` and safe to share without synchronization.
///
/// # Example
///
/// ```rust
/// use resona_core::AudioTime;
///
/// let t = AudioTime::from_samples(44100, 44100.0);
/// assert_eq!(t.nanos(), 1_000_000_000);
/// assert_eq!(t.samples(44100.0), 44100);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AudioTime {
    nanos: i64,
}

impl AudioTime {
    /// The zero instant, the origin of the master timeline.
    pub const ZERO: AudioTime = AudioTime { nanos: 0 };

    /// Create an instant from a raw nanosecond count.
    pub const fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    /// Create an instant from a sample count at the given sample rate.
    ///
    /// A zero or negative rate is a caller contract violation.
    pub fn from_samples(samples: i64, sample_rate: f64) -> Self {
        debug_assert!(sample_rate > 0.0, "sample rate must be positive");
        Self {
            nanos: (samples as f64 * NANOS_PER_SECOND / sample_rate) as i64,
        }
    }

    /// Create an instant from a microsecond count.
    pub const fn from_micros(micros: i64) -> Self {
        Self {
            nanos: micros * 1_000,
        }
    }

    /// Create an instant from a millisecond count.
    pub const fn from_millis(millis: i64) -> Self {
        Self {
            nanos: millis * 1_000_000,
        }
    }

    /// Create an instant from seconds.
    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            nanos: (seconds * NANOS_PER_SECOND) as i64,
        }
    }

    /// The raw nanosecond count of this instant.
    pub const fn nanos(&self) -> i64 {
        self.nanos
    }

    /// This instant expressed as a sample count at the given sample rate,
    /// rounded to the nearest whole sample.
    ///
    /// Rounding (rather than truncating) here is what makes the
    /// sample→nano→sample round trip idempotent: the sub-nanosecond loss of
    /// [`from_samples`](AudioTime::from_samples) stays well under half a
    /// sample period and is absorbed on the way back.
    ///
    /// A zero or negative rate is a caller contract violation.
    pub fn samples(&self, sample_rate: f64) -> i64 {
        debug_assert!(sample_rate > 0.0, "sample rate must be positive");
        libm::round(self.nanos as f64 * sample_rate / NANOS_PER_SECOND) as i64
    }

    /// This instant expressed in whole milliseconds.
    pub const fn millis(&self) -> i64 {
        self.nanos / 1_000_000
    }

    /// This instant expressed in seconds.
    pub fn seconds(&self) -> f64 {
        self.nanos as f64 / NANOS_PER_SECOND
    }

    /// Whether this is the zero instant.
    pub const fn is_zero(&self) -> bool {
        self.nanos == 0
    }
}

impl Add for AudioTime {
    type Output = AudioTime;

    fn add(self, rhs: AudioTime) -> AudioTime {
        AudioTime {
            nanos: self.nanos + rhs.nanos,
        }
    }
}

impl AddAssign for AudioTime {
    fn add_assign(&mut self, rhs: AudioTime) {
        self.nanos += rhs.nanos;
    }
}

impl Sub for AudioTime {
    type Output = AudioTime;

    fn sub(self, rhs: AudioTime) -> AudioTime {
        AudioTime {
            nanos: self.nanos - rhs.nanos,
        }
    }
}

impl SubAssign for AudioTime {
    fn sub_assign(&mut self, rhs: AudioTime) {
        self.nanos -= rhs.nanos;
    }
}

impl fmt::Display for AudioTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_samples_to_nanos() {
        // One second of audio at 44.1 kHz
        let t = AudioTime::from_samples(44100, 44100.0);
        assert_eq!(t.nanos(), 1_000_000_000);

        // Half a second at 48 kHz
        let t = AudioTime::from_samples(24000, 48000.0);
        assert_eq!(t.nanos(), 500_000_000);
    }

    #[test]
    fn test_nanos_to_samples() {
        let t = AudioTime::from_nanos(1_000_000_000);
        assert_eq!(t.samples(44100.0), 44100);
        assert_eq!(t.samples(48000.0), 48000);
    }

    #[test]
    fn test_zero() {
        assert!(AudioTime::ZERO.is_zero());
        assert_eq!(AudioTime::ZERO.nanos(), 0);
        assert_eq!(AudioTime::default(), AudioTime::ZERO);
    }

    #[test]
    fn test_ordering_on_nanos() {
        let a = AudioTime::from_samples(100, 44100.0);
        let b = AudioTime::from_samples(200, 44100.0);
        assert!(a < b);
        assert_eq!(a, AudioTime::from_nanos(a.nanos()));
    }

    #[test]
    fn test_arithmetic() {
        let a = AudioTime::from_millis(10);
        let b = AudioTime::from_millis(5);
        assert_eq!((a + b).millis(), 15);
        assert_eq!((a - b).millis(), 5);

        let mut c = a;
        c += b;
        assert_eq!(c.millis(), 15);
        c -= b;
        assert_eq!(c, a);
    }

    #[test]
    fn test_unit_constructors() {
        assert_eq!(AudioTime::from_micros(1_000).nanos(), 1_000_000);
        assert_eq!(AudioTime::from_millis(1).nanos(), 1_000_000);
        assert_eq!(AudioTime::from_seconds(0.5).nanos(), 500_000_000);
        assert!((AudioTime::from_seconds(1.5).seconds() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_display() {
        let t = AudioTime::from_millis(1500);
        assert_eq!(format!("{t}"), "1.500s");
    }

    proptest! {
        /// Sample→nano→sample round trip at a fixed rate stays within one
        /// unit of rounding, for all non-negative sample counts and common
        /// rates.
        #[test]
        fn prop_sample_roundtrip(samples in 0i64..1_000_000_000, rate in prop::sample::select(vec![8000.0, 22050.0, 44100.0, 48000.0, 96000.0, 192000.0])) {
            let t = AudioTime::from_samples(samples, rate);
            let back = t.samples(rate);
            prop_assert!((samples - back).abs() <= 1, "samples={samples} back={back} rate={rate}");
        }

        /// After the first conversion the representation is stable: another
        /// round trip through the nanosecond domain is idempotent.
        #[test]
        fn prop_roundtrip_idempotent(samples in 0i64..1_000_000_000, rate in prop::sample::select(vec![22050.0, 44100.0, 48000.0, 96000.0])) {
            let first = AudioTime::from_samples(samples, rate).samples(rate);
            let second = AudioTime::from_samples(first, rate).samples(rate);
            prop_assert_eq!(first, second);
        }
    }
}
