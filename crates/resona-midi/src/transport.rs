//! Transport control over a MIDI file sequencer.

use std::path::{Path, PathBuf};

use resona_core::{AdjustableAudioClock, AudioClock, AudioTime};

use crate::Result;
use crate::dispatch::MidiDispatcher;

/// End-of-track meta message type in a standard MIDI file.
const META_END_OF_TRACK: u8 = 47;

/// The sequencer boundary.
///
/// Byte-level MIDI file parsing and tick-accurate playback live behind this
/// trait; the transport layers lifecycle, seeking, position formatting, and
/// event dispatch on top. Positions are reported both in ticks (musical
/// domain) and microseconds (time domain).
pub trait Sequencer {
    /// Load a sequence from a file, replacing any currently loaded one.
    fn open(&mut self, path: &Path) -> Result<()>;

    /// Release the loaded sequence. Idempotent.
    fn close(&mut self);

    /// Whether a sequence is loaded.
    fn is_open(&self) -> bool;

    /// Whether playback is running.
    fn is_running(&self) -> bool;

    /// Begin playback from the current position.
    fn start(&mut self);

    /// Pause playback, keeping the position.
    fn stop(&mut self);

    /// Current position in ticks.
    fn tick_position(&self) -> u64;

    /// Seek to a tick position.
    fn set_tick_position(&mut self, tick: u64);

    /// Sequence length in ticks.
    fn tick_length(&self) -> u64;

    /// Current position in microseconds.
    fn microsecond_position(&self) -> u64;

    /// Seek to a microsecond position.
    fn set_microsecond_position(&mut self, micros: u64);

    /// Sequence length in microseconds.
    fn microsecond_length(&self) -> u64;

    /// Ticks per quarter note of the loaded sequence.
    fn resolution(&self) -> u32;
}

/// Transport and clock over a standard-MIDI-file sequencer.
///
/// Owns the [`MidiDispatcher`] that fans the sequencer's messages out to the
/// engine, and doubles as the playback clock: its [`AudioClock`] reports the
/// sequencer's microsecond position projected through the adjustable offset,
/// so events and audio share one master timeline.
///
/// The driver feeding playback calls [`handle_message`] for each raw MIDI
/// message and [`handle_meta`] for meta events; the end-of-track meta fires
/// the registered stop callback once per natural end of playback.
///
/// [`handle_message`]: SmfTransport::handle_message
/// [`handle_meta`]: SmfTransport::handle_meta
pub struct SmfTransport<S: Sequencer> {
    sequencer: S,
    path: Option<PathBuf>,
    dispatcher: MidiDispatcher,
    stop_callback: Option<Box<dyn FnMut() + Send>>,
    end_signaled: bool,
}

impl<S: Sequencer> SmfTransport<S> {
    /// Wrap a sequencer with a fresh dispatcher.
    pub fn new(sequencer: S) -> Self {
        Self {
            sequencer,
            path: None,
            dispatcher: MidiDispatcher::new(),
            stop_callback: None,
            end_signaled: false,
        }
    }

    /// The dispatcher delivering this transport's events.
    pub fn dispatcher(&self) -> &MidiDispatcher {
        &self.dispatcher
    }

    /// Register the callback fired when playback reaches the end of the
    /// sequence. Replaces any previous callback.
    pub fn set_stop_callback(&mut self, callback: Box<dyn FnMut() + Send>) {
        self.stop_callback = Some(callback);
    }

    /// The currently loaded file, if any.
    pub fn file(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load a MIDI file, closing any current one first.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        self.close();
        self.sequencer.open(path)?;
        self.path = Some(path.to_path_buf());
        tracing::info!(
            file = %path.display(),
            duration_secs = self.sequencer.microsecond_length() as f64 / 1_000_000.0,
            "midi file opened"
        );
        Ok(())
    }

    /// Unload the sequence. Idempotent.
    pub fn close(&mut self) {
        if self.path.take().is_some() {
            self.sequencer.close();
            tracing::debug!("midi file closed");
        }
        self.end_signaled = false;
    }

    /// Whether a sequence is loaded.
    pub fn is_open(&self) -> bool {
        self.sequencer.is_open()
    }

    /// Whether playback is running.
    pub fn is_started(&self) -> bool {
        self.is_open() && self.sequencer.is_running()
    }

    /// Start playback. A transport sitting at the end of the sequence
    /// rewinds first, so start always produces sound.
    pub fn start(&mut self) {
        if !self.is_open() {
            return;
        }
        if self.sequencer.tick_position() >= self.sequencer.tick_length() {
            self.rewind();
        }
        self.end_signaled = false;
        self.sequencer.start();
        tracing::debug!(
            position_secs = self.sequencer.microsecond_position() as f64 / 1_000_000.0,
            "sequencer started"
        );
    }

    /// Pause playback, keeping the position.
    pub fn stop(&mut self) {
        if self.is_open() {
            self.sequencer.stop();
            tracing::debug!(
                position_secs = self.sequencer.microsecond_position() as f64 / 1_000_000.0,
                "sequencer stopped"
            );
        }
    }

    /// Seek back to the start of the sequence.
    pub fn rewind(&mut self) {
        if self.is_open() {
            self.sequencer.set_tick_position(0);
            self.end_signaled = false;
        }
    }

    /// Seek relative to the current position, clamped to the sequence.
    pub fn wind_seconds(&mut self, seconds: f64) {
        if !self.is_open() {
            return;
        }
        let delta = (seconds * 1_000_000.0) as i64;
        let target = (self.sequencer.microsecond_position() as i64 + delta)
            .clamp(0, self.sequencer.microsecond_length() as i64);
        self.sequencer.set_microsecond_position(target as u64);
    }

    /// Seek to a percentage of the sequence length, clamped to `[0, length)`
    /// so the result is always a playable position.
    pub fn set_position_percent(&mut self, percent: f64) {
        if !self.is_open() {
            return;
        }
        let tick_length = self.sequencer.tick_length();
        let target = (tick_length as f64 * percent / 100.0) as i64;
        let target = target.clamp(0, tick_length.saturating_sub(1) as i64);
        self.sequencer.set_tick_position(target as u64);
    }

    /// Playback position as a whole percentage of the sequence length.
    pub fn position_percent(&self) -> f64 {
        if !self.is_open() || self.sequencer.tick_length() == 0 {
            return 0.0;
        }
        let ratio =
            self.sequencer.tick_position() as f64 * 100.0 / self.sequencer.tick_length() as f64;
        ratio.floor()
    }

    /// Playback position in milliseconds.
    pub fn position_millis(&self) -> u64 {
        if self.is_open() {
            self.sequencer.microsecond_position() / 1_000
        } else {
            0
        }
    }

    /// Playback position as a bars string `"B:b.ff"`, assuming a 4/4 meter.
    ///
    /// Frames subdivide the beat on a 12 scale derived from the sequence
    /// resolution; bars, beats, and frames are all 1-based. Returns an empty
    /// string when no sequence is loaded.
    pub fn position_bars(&self) -> String {
        if !self.is_open() {
            return String::new();
        }
        let resolution = u64::from(self.sequencer.resolution().max(1));
        let tick = self.sequencer.tick_position();

        let frames = (tick % resolution) * 12 / resolution + 1;
        let beats_total = tick / resolution;
        let beat = beats_total % 4 + 1;
        let bars = beats_total / 4 + 1;
        format!("{bars}:{beat}.{frames:02}")
    }

    /// Feed one raw MIDI message from the sequencer into the dispatcher.
    ///
    /// `device_micros` is the sequencer's own timestamp for the message,
    /// `None` when it has none.
    pub fn handle_message(&self, device_micros: Option<u64>, bytes: &[u8]) {
        let now = self.audio_time();
        self.dispatcher.dispatch(device_micros, bytes, now);
    }

    /// React to a meta event from the sequencer. The end-of-track meta
    /// fires the stop callback once; everything else is ignored.
    pub fn handle_meta(&mut self, meta_type: u8) {
        if meta_type == META_END_OF_TRACK && !self.end_signaled {
            self.end_signaled = true;
            tracing::debug!("end of track reached");
            if let Some(callback) = &mut self.stop_callback {
                callback();
            }
        }
    }
}

impl<S: Sequencer> AudioClock for SmfTransport<S> {
    fn audio_time(&self) -> AudioTime {
        AudioTime::from_nanos(
            self.sequencer.microsecond_position() as i64 * 1_000 + self.dispatcher.offset().nanos(),
        )
    }
}

impl<S: Sequencer> AdjustableAudioClock for SmfTransport<S> {
    fn time_offset(&self) -> AudioTime {
        self.dispatcher.offset()
    }

    fn set_time_offset(&mut self, offset: AudioTime) {
        self.dispatcher.set_offset(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MidiListener;
    use crate::event::{MidiEvent, MidiMessage};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory sequencer with a fixed tick-to-microsecond mapping
    /// (500 µs per tick, 120 bpm at resolution 1000).
    struct FakeSequencer {
        open: bool,
        running: bool,
        tick: u64,
        tick_length: u64,
        resolution: u32,
        micros_per_tick: u64,
    }

    impl FakeSequencer {
        fn with_length(tick_length: u64, resolution: u32) -> Self {
            Self {
                open: false,
                running: false,
                tick: 0,
                tick_length,
                resolution,
                micros_per_tick: 500,
            }
        }
    }

    impl Sequencer for FakeSequencer {
        fn open(&mut self, _path: &Path) -> Result<()> {
            self.open = true;
            self.tick = 0;
            Ok(())
        }

        fn close(&mut self) {
            self.open = false;
            self.running = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn is_running(&self) -> bool {
            self.running
        }

        fn start(&mut self) {
            self.running = true;
        }

        fn stop(&mut self) {
            self.running = false;
        }

        fn tick_position(&self) -> u64 {
            self.tick
        }

        fn set_tick_position(&mut self, tick: u64) {
            self.tick = tick;
        }

        fn tick_length(&self) -> u64 {
            self.tick_length
        }

        fn microsecond_position(&self) -> u64 {
            self.tick * self.micros_per_tick
        }

        fn set_microsecond_position(&mut self, micros: u64) {
            self.tick = micros / self.micros_per_tick;
        }

        fn microsecond_length(&self) -> u64 {
            self.tick_length * self.micros_per_tick
        }

        fn resolution(&self) -> u32 {
            self.resolution
        }
    }

    fn open_transport(tick_length: u64, resolution: u32) -> SmfTransport<FakeSequencer> {
        let mut transport = SmfTransport::new(FakeSequencer::with_length(tick_length, resolution));
        transport.open(Path::new("test.mid")).unwrap();
        transport
    }

    #[test]
    fn test_start_rewinds_at_end() {
        let mut transport = open_transport(1000, 480);
        transport.sequencer.set_tick_position(1000);

        transport.start();
        assert!(transport.is_started());
        assert_eq!(transport.sequencer.tick_position(), 0);
    }

    #[test]
    fn test_start_keeps_mid_sequence_position() {
        let mut transport = open_transport(1000, 480);
        transport.sequencer.set_tick_position(500);

        transport.start();
        assert_eq!(transport.sequencer.tick_position(), 500);
    }

    #[test]
    fn test_wind_seconds_clamps() {
        // 2000 ticks at 500 µs/tick = 1 second total
        let mut transport = open_transport(2000, 480);

        transport.wind_seconds(-5.0);
        assert_eq!(transport.sequencer.microsecond_position(), 0);

        transport.wind_seconds(0.25);
        assert_eq!(transport.sequencer.microsecond_position(), 250_000);

        transport.wind_seconds(10.0);
        assert_eq!(transport.sequencer.microsecond_position(), 1_000_000);
    }

    #[test]
    fn test_position_percent_seek_clamps_below_length() {
        let mut transport = open_transport(1000, 480);

        transport.set_position_percent(100.0);
        assert_eq!(transport.sequencer.tick_position(), 999);

        transport.set_position_percent(-10.0);
        assert_eq!(transport.sequencer.tick_position(), 0);

        transport.set_position_percent(50.0);
        assert_eq!(transport.sequencer.tick_position(), 500);
        assert_eq!(transport.position_percent(), 50.0);
    }

    #[test]
    fn test_position_millis() {
        let mut transport = open_transport(2000, 480);
        transport.sequencer.set_tick_position(500);
        assert_eq!(transport.position_millis(), 250);
    }

    #[test]
    fn test_position_bars_at_start() {
        let transport = open_transport(4000, 480);
        assert_eq!(transport.position_bars(), "1:1.01");
    }

    #[test]
    fn test_position_bars_mid_sequence() {
        let mut transport = open_transport(4000, 480);
        // Five and a half beats in: bar 2, beat 2, frame 240*12/480+1 = 7
        transport.sequencer.set_tick_position(480 * 5 + 240);
        assert_eq!(transport.position_bars(), "2:2.07");
    }

    #[test]
    fn test_position_queries_when_closed() {
        let transport = SmfTransport::new(FakeSequencer::with_length(1000, 480));
        assert_eq!(transport.position_bars(), "");
        assert_eq!(transport.position_millis(), 0);
        assert_eq!(transport.position_percent(), 0.0);
    }

    #[test]
    fn test_end_of_track_fires_stop_callback_once() {
        let mut transport = open_transport(1000, 480);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        transport.set_stop_callback(Box::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        transport.start();
        transport.handle_meta(META_END_OF_TRACK);
        transport.handle_meta(META_END_OF_TRACK);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A new playback run can signal again
        transport.start();
        transport.handle_meta(META_END_OF_TRACK);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_other_meta_ignored() {
        let mut transport = open_transport(1000, 480);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        transport.set_stop_callback(Box::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        // Tempo change meta
        transport.handle_meta(81);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clock_projects_microsecond_position() {
        let mut transport = open_transport(2000, 480);
        transport.sequencer.set_tick_position(2000);
        assert_eq!(transport.audio_time(), AudioTime::from_seconds(1.0));

        transport.set_time_offset(AudioTime::from_millis(250));
        assert_eq!(transport.audio_time(), AudioTime::from_millis(1250));
        assert_eq!(transport.time_offset(), AudioTime::from_millis(250));
    }

    #[test]
    fn test_messages_flow_through_dispatcher() {
        struct Capture {
            events: Arc<parking_lot::Mutex<Vec<MidiEvent>>>,
        }
        impl MidiListener for Capture {
            fn midi_received(&mut self, event: &MidiEvent) {
                self.events.lock().push(event.clone());
            }
        }

        let transport = open_transport(1000, 480);
        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        transport.dispatcher().add_listener(Box::new(Capture {
            events: Arc::clone(&events),
        }));
        transport.dispatcher().set_timestamping(true);

        transport.handle_message(Some(2000), &[0x91, 60, 100]);

        let events = events.lock();
        assert_eq!(events[0].time, AudioTime::from_micros(2000));
        assert_eq!(
            events[0].message,
            MidiMessage::Short {
                channel: 1,
                status: 0x90,
                data1: 60,
                data2: 100,
            }
        );
    }
}
