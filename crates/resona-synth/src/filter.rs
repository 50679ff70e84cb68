//! Per-voice state-variable low-pass filter.
//!
//! A second-order filter applied to a voice's mono signal after mixing.
//! Both tunable parameters are the sum of three layered sources:
//!
//! | layer       | cutoff                    | resonance              |
//! |-------------|---------------------------|------------------------|
//! | initial     | absolute cents, per patch | centibels, per patch   |
//! | controller  | CC 74, ±64 → ±1 octave    | CC 71, ±64 → ±40 dB    |
//! | performance | semitones, per block      | —                      |
//!
//! Coefficients are only re-derived when the effective cutoff or resonance
//! input actually changed since the last call, so a voice in steady sustain
//! pays for the recursive update and nothing else.
//!
//! When the effective cutoff reaches the flat ceiling (0.97 of the
//! normalized range) the filter has no audible effect and is bypassed
//! entirely; its history is cleared on that transition so that modulation
//! sweeping the cutoff back down re-engages without a glitch.
//!
//! The recursive core is the classic two-integrator state-variable topology
//! (Olli Niemitalo's public-domain formulation).

use core::f32::consts::PI;
use libm::sinf;

use resona_core::math::{cents_to_hz, db_to_linear, semitones_to_ratio};

/// MIDI continuous controller moving the filter cutoff (Brightness).
pub const CC_CUTOFF: u8 = 74;

/// MIDI continuous controller moving the filter resonance (Timbre).
pub const CC_RESONANCE: u8 = 71;

/// Normalized cutoff above which the filter is flat and gets bypassed.
///
/// Kept just below Nyquist so that large upward modulation still leaves the
/// filter acting as an anti-aliasing ceiling rather than going unstable.
const FLAT_CUTOFF: f32 = 0.97;

/// Semitones of cutoff change per controller step away from center.
///
/// Full deflection (±64) moves the cutoff by ±1 octave.
const CUTOFF_CC_SENSITIVITY: f32 = 12.0 / 64.0;

/// Decibels of resonance change per controller step away from center.
///
/// Full deflection (±64) moves the resonance level by ±40 dB.
const RESONANCE_CC_SENSITIVITY: f32 = 40.0 / 64.0;

/// Per-voice state-variable low-pass filter.
///
/// One instance is owned exclusively by its voice; modulation inputs are
/// passed in explicitly each call, and no locking is needed as long as a
/// voice is rendered by a single thread.
///
/// # Example
///
/// ```rust
/// use resona_synth::VoiceFilter;
///
/// let mut filter = VoiceFilter::new();
/// filter.set_cutoff_cents(7200); // ~523 Hz
/// filter.setup();
///
/// let mut block = [0.5f32; 64];
/// filter.modulate(0.0);
/// filter.process(&mut block, 44100.0);
/// ```
#[derive(Clone, Debug)]
pub struct VoiceFilter {
    /// False when the effective cutoff sits at the flat ceiling.
    enabled: bool,

    /// Initial cutoff in absolute cents, from instrument data.
    initial_cutoff_cents: i32,
    /// Initial cutoff as a fraction of Nyquist, `2·fc/rate`; recomputed on
    /// every sample-rate change.
    initial_normalized_cutoff: f32,
    /// Cutoff offset in semitones from the cutoff controller.
    cutoff_controller: f32,

    /// Initial resonance in centibels, from instrument data.
    initial_resonance_cb: i32,
    /// Initial resonance as a linear factor.
    initial_normalized_resonance: f32,
    /// Resonance offset in dB from the resonance controller.
    resonance_controller: f32,

    /// Rate the coefficients were derived for; `None` until first process.
    current_sample_rate: Option<f64>,
    /// Performance cutoff offset (semitones) from the last `modulate` call.
    current_cutoff_offset: f32,

    /// Frequency coefficient.
    f1: f32,
    /// Damping coefficient.
    q1: f32,
    /// Low-pass history sample.
    last_lp: f32,
    /// Band-pass history sample.
    last_bp: f32,

    /// Effective cutoff offset the coefficients were last derived from;
    /// `None` forces re-derivation.
    last_cutoff_offset: Option<f32>,
    last_cutoff: f32,
    /// Resonance controller offset the coefficients were last derived from;
    /// `None` forces re-derivation.
    last_resonance_offset: Option<f32>,
    last_resonance: f32,
}

impl Default for VoiceFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceFilter {
    /// Create a filter with the SoundFont default parameters: a 13500-cent
    /// (~20 kHz) cutoff and zero resonance, i.e. effectively wide open.
    pub fn new() -> Self {
        Self {
            enabled: false,
            initial_cutoff_cents: 13500,
            initial_normalized_cutoff: 1.0,
            cutoff_controller: 0.0,
            initial_resonance_cb: 0,
            initial_normalized_resonance: 1.0,
            resonance_controller: 0.0,
            current_sample_rate: None,
            current_cutoff_offset: 0.0,
            f1: 0.0,
            q1: 0.0,
            last_lp: 0.0,
            last_bp: 0.0,
            last_cutoff_offset: None,
            last_cutoff: 1.0,
            last_resonance_offset: None,
            last_resonance: 0.0,
        }
    }

    /// Finalize voice setup.
    ///
    /// Call once after the initial cutoff and resonance have been loaded
    /// from instrument data. Derives the normalized resonance and arranges
    /// for a full coefficient derivation on the first `process` call.
    pub fn setup(&mut self) {
        self.calc_resonance();
        self.current_cutoff_offset = 0.0;
        self.last_cutoff_offset = None;
        self.current_sample_rate = None;
    }

    /// Set the initial cutoff, in absolute cents.
    pub fn set_cutoff_cents(&mut self, cents: i32) {
        self.initial_cutoff_cents = cents;
    }

    /// Add to the initial cutoff, in cents. Generators from instrument data
    /// accumulate through this.
    pub fn add_cutoff_cents(&mut self, cents: i32) {
        self.initial_cutoff_cents += cents;
    }

    /// Set the initial resonance, in centibels.
    pub fn set_resonance_cb(&mut self, centibels: i32) {
        self.initial_resonance_cb = centibels;
    }

    /// Add to the initial resonance, in centibels.
    pub fn add_resonance_cb(&mut self, centibels: i32) {
        self.initial_resonance_cb += centibels;
    }

    /// Whether the filter currently has an audible effect.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// React to a MIDI controller change.
    ///
    /// Only [`CC_CUTOFF`] and [`CC_RESONANCE`] are recognized; any other
    /// controller number is ignored by this component.
    pub fn control_change(&mut self, controller: u8, value: u8) {
        match controller {
            CC_CUTOFF => {
                self.cutoff_controller =
                    (i32::from(value) - 64) as f32 * CUTOFF_CC_SENSITIVITY;
                self.calc_filter();
            }
            CC_RESONANCE => {
                self.resonance_controller =
                    (i32::from(value) - 64) as f32 * RESONANCE_CC_SENSITIVITY;
                self.calc_filter();
            }
            _ => {}
        }
    }

    /// Supply the per-block performance cutoff offset, in semitones.
    ///
    /// Comes from the voice's envelope/LFO modulation. Coefficients are
    /// re-derived only if the offset differs from the previous block.
    pub fn modulate(&mut self, cutoff_offset_semitones: f32) {
        if self.current_cutoff_offset != cutoff_offset_semitones
            || self.last_cutoff_offset.is_none()
        {
            self.current_cutoff_offset = cutoff_offset_semitones;
            self.calc_filter();
        }
    }

    /// Filter a block of mono samples in place.
    ///
    /// A sample-rate change re-derives the normalized initial cutoff and
    /// invalidates both coefficient caches before processing. If the
    /// effective cutoff sits at the flat ceiling the block passes through
    /// untouched.
    pub fn process(&mut self, samples: &mut [f32], sample_rate: f64) {
        if self.current_sample_rate != Some(sample_rate) {
            self.set_sample_rate(sample_rate);
            self.calc_filter();
        }
        if self.enabled {
            self.run(samples);
        }
    }

    /// Clear the filter history.
    pub fn reset(&mut self) {
        self.last_lp = 0.0;
        self.last_bp = 0.0;
    }

    /// Re-derive the normalized initial cutoff for a new sample rate and
    /// invalidate both coefficient caches.
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.current_sample_rate = Some(sample_rate);
        let cutoff_hz = cents_to_hz(self.initial_cutoff_cents as f32);
        self.initial_normalized_cutoff = 2.0 * cutoff_hz / sample_rate as f32;
        self.last_cutoff_offset = None;
        self.last_resonance_offset = None;
    }

    /// Derive the normalized initial resonance from centibels.
    ///
    /// The initial resonance is clamped non-negative before conversion; the
    /// recursive update expects the linear factor in `[0, 1]`.
    fn calc_resonance(&mut self) {
        let res_db = (self.initial_resonance_cb as f32 / 10.0).max(0.0);
        self.initial_normalized_resonance = db_to_linear(-res_db);
        self.last_resonance_offset = None;
    }

    /// Derive the filter coefficients from the layered modulation inputs.
    ///
    /// Each half is cached on its last-seen offset, so repeated calls with
    /// unchanged inputs cost two comparisons.
    fn calc_filter(&mut self) {
        let cutoff_offset = self.current_cutoff_offset + self.cutoff_controller;
        let cutoff = if self.last_cutoff_offset != Some(cutoff_offset) {
            self.last_cutoff_offset = Some(cutoff_offset);
            let mut cutoff =
                self.initial_normalized_cutoff * semitones_to_ratio(cutoff_offset);
            // the recursive core has a slow transient response, so double the
            // linear cutoff to compensate
            cutoff *= 2.0;
            if cutoff > FLAT_CUTOFF {
                cutoff = FLAT_CUTOFF;
            }
            self.last_cutoff = cutoff;
            cutoff
        } else {
            self.last_cutoff
        };

        let resonance = if self.last_resonance_offset != Some(self.resonance_controller) {
            self.last_resonance_offset = Some(self.resonance_controller);
            let resonance =
                self.initial_normalized_resonance * db_to_linear(-self.resonance_controller);
            self.last_resonance = resonance;
            resonance
        } else {
            self.last_resonance
        };

        self.enabled = cutoff < FLAT_CUTOFF;
        if self.enabled {
            self.f1 = 2.0 * sinf(PI * cutoff * 0.25);
            self.q1 = resonance.clamp(0.0, 1.0) * 0.66 + 0.04;
        } else {
            // clear everything so re-engaging later starts from silence
            // instead of stale history
            self.f1 = 0.0;
            self.q1 = 0.0;
            self.last_lp = 0.0;
            self.last_bp = 0.0;
        }
    }

    /// The two-integrator recursive update, one channel.
    fn run(&mut self, samples: &mut [f32]) {
        let mut lp = self.last_lp;
        let mut bp = self.last_bp;
        let f1 = self.f1;
        let q1 = self.q1;

        for sample in samples.iter_mut() {
            bp += f1 * (*sample - lp - q1 * bp);
            lp += f1 * bp;
            *sample = lp;
        }

        self.last_lp = lp;
        self.last_bp = bp;
    }
}
