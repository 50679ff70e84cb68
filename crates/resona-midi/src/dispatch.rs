//! Timestamp-resolving MIDI fan-out.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use parking_lot::Mutex;
use resona_core::AudioTime;

use crate::event::{MidiEvent, MidiMessage};

/// A consumer of dispatched MIDI events.
///
/// Callbacks run synchronously on the dispatching thread, inside the
/// dispatcher's listener lock. A listener must not add or remove listeners
/// from within its callback; that deadlocks. Panics in a callback unwind
/// through the dispatcher.
pub trait MidiListener: Send {
    /// Receive one event. Called in listener-registration order.
    fn midi_received(&mut self, event: &MidiEvent);
}

/// Handle for removing a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Normalizes raw MIDI messages, resolves their timestamps onto the master
/// timeline, and delivers them to registered listeners.
///
/// Timestamp resolution, given a device timestamp in microseconds (`None`
/// meaning the device had none):
///
/// - timestamping disabled: the event is stamped zero, "apply immediately"
/// - no device timestamp while timestamping is enabled: the dispatching
///   clock's current time, best-effort "now"
/// - otherwise: `micros * 1000 + offset_nanos`, projecting device-relative
///   time onto the master timeline through the same offset the audio sink
///   uses
///
/// Delivery and listener registration share one mutex, so a listener never
/// observes a mutating listener set mid-iteration. The offset and the
/// timestamping flag are atomics: MIDI delivery threads read them without
/// taking the listener lock, and an offset store is visible whole.
#[derive(Default)]
pub struct MidiDispatcher {
    listeners: Mutex<Vec<(ListenerId, Box<dyn MidiListener>)>>,
    next_id: AtomicU64,
    timestamping: AtomicBool,
    offset_nanos: AtomicI64,
}

impl MidiDispatcher {
    /// Create a dispatcher with no listeners, timestamping disabled, and a
    /// zero offset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; delivery follows registration order.
    pub fn add_listener(&self, listener: Box<dyn MidiListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Remove a previously registered listener. Unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Enable or disable event timestamping. When disabled, every event is
    /// stamped zero and the receiver schedules it itself.
    pub fn set_timestamping(&self, enabled: bool) {
        self.timestamping.store(enabled, Ordering::Release);
    }

    /// Whether events carry resolved timestamps.
    pub fn is_timestamping(&self) -> bool {
        self.timestamping.load(Ordering::Acquire)
    }

    /// The clock offset used to project device timestamps, in nanoseconds.
    pub fn offset(&self) -> AudioTime {
        AudioTime::from_nanos(self.offset_nanos.load(Ordering::Acquire))
    }

    /// Replace the projection offset.
    pub fn set_offset(&self, offset: AudioTime) {
        self.offset_nanos.store(offset.nanos(), Ordering::Release);
    }

    /// Resolve a device timestamp onto the master timeline.
    ///
    /// `now` is the dispatching clock's current time, consulted only for
    /// the missing-timestamp fallback.
    pub fn resolve_timestamp(&self, device_micros: Option<u64>, now: AudioTime) -> AudioTime {
        if !self.is_timestamping() {
            return AudioTime::ZERO;
        }
        match device_micros {
            None => now,
            Some(micros) => AudioTime::from_nanos(
                micros as i64 * 1_000 + self.offset_nanos.load(Ordering::Acquire),
            ),
        }
    }

    /// Classify a raw message, resolve its timestamp, and deliver it to
    /// every listener in order.
    pub fn dispatch(&self, device_micros: Option<u64>, bytes: &[u8], now: AudioTime) {
        let event = MidiEvent {
            time: self.resolve_timestamp(device_micros, now),
            message: MidiMessage::from_bytes(bytes),
        };
        tracing::trace!(
            time = %event.time,
            status = format_args!("{:#04x}", event.message.status()),
            len = bytes.len(),
            "midi dispatch"
        );
        let mut listeners = self.listeners.lock();
        for (_, listener) in listeners.iter_mut() {
            listener.midi_received(&event);
        }
    }
}

impl core::fmt::Debug for MidiDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MidiDispatcher")
            .field("listeners", &self.listener_count())
            .field("timestamping", &self.is_timestamping())
            .field("offset", &self.offset())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Capture {
        events: Arc<Mutex<Vec<MidiEvent>>>,
    }

    impl MidiListener for Capture {
        fn midi_received(&mut self, event: &MidiEvent) {
            self.events.lock().push(event.clone());
        }
    }

    fn dispatcher_with_capture() -> (MidiDispatcher, Capture) {
        let dispatcher = MidiDispatcher::new();
        let capture = Capture::default();
        dispatcher.add_listener(Box::new(capture.clone()));
        (dispatcher, capture)
    }

    #[test]
    fn test_device_timestamp_projected_through_offset() {
        let (dispatcher, capture) = dispatcher_with_capture();
        dispatcher.set_timestamping(true);
        dispatcher.set_offset(AudioTime::from_millis(5));

        dispatcher.dispatch(Some(1000), &[0x90, 60, 100], AudioTime::ZERO);

        let events = capture.events.lock();
        assert_eq!(events[0].time, AudioTime::from_millis(6));
    }

    #[test]
    fn test_disabled_timestamping_stamps_zero() {
        let (dispatcher, capture) = dispatcher_with_capture();
        dispatcher.set_offset(AudioTime::from_millis(5));

        dispatcher.dispatch(Some(1000), &[0x90, 60, 100], AudioTime::from_seconds(9.0));
        dispatcher.dispatch(None, &[0x80, 60, 0], AudioTime::from_seconds(9.0));

        let events = capture.events.lock();
        assert_eq!(events[0].time, AudioTime::ZERO);
        assert_eq!(events[1].time, AudioTime::ZERO);
    }

    #[test]
    fn test_missing_timestamp_falls_back_to_now() {
        let (dispatcher, capture) = dispatcher_with_capture();
        dispatcher.set_timestamping(true);

        let now = AudioTime::from_millis(1234);
        dispatcher.dispatch(None, &[0x90, 60, 100], now);

        assert_eq!(capture.events.lock()[0].time, now);
    }

    #[test]
    fn test_dispatch_decomposes_channel_voice() {
        let (dispatcher, capture) = dispatcher_with_capture();
        dispatcher.dispatch(None, &[0x91, 60, 100], AudioTime::ZERO);

        let events = capture.events.lock();
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

    #[test]
    fn test_delivery_in_registration_order() {
        struct Tagger {
            tag: u8,
            log: Arc<Mutex<Vec<u8>>>,
        }
        impl MidiListener for Tagger {
            fn midi_received(&mut self, _: &MidiEvent) {
                self.log.lock().push(self.tag);
            }
        }

        let dispatcher = MidiDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3 {
            dispatcher.add_listener(Box::new(Tagger {
                tag,
                log: Arc::clone(&log),
            }));
        }

        dispatcher.dispatch(None, &[0xF8], AudioTime::ZERO);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_listener() {
        let dispatcher = MidiDispatcher::new();
        let capture = Capture::default();
        let id = dispatcher.add_listener(Box::new(capture.clone()));
        assert_eq!(dispatcher.listener_count(), 1);

        dispatcher.remove_listener(id);
        assert_eq!(dispatcher.listener_count(), 0);

        dispatcher.dispatch(None, &[0x90, 60, 100], AudioTime::ZERO);
        assert!(capture.events.lock().is_empty());
    }
}
