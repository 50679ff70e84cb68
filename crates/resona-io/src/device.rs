//! cpal-backed audio device sink.
//!
//! Wraps [cpal](https://crates.io/crates/cpal) for cross-platform audio
//! output: ALSA (Linux), CoreAudio (macOS), WASAPI (Windows). The sink is
//! push-style — callers hand it rendered blocks — while cpal is pull-style,
//! so a bounded channel sits between the writer and the device callback and
//! doubles as the engine's backpressure: `write` blocks once the channel is
//! full, pacing the renderer to the device's consumption rate.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, sync_channel};
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use resona_core::{AdjustableAudioClock, AudioClock, AudioFormat, AudioTime, ClockOffset, RenderBuffer};

use crate::sink::{AudioSink, DEFAULT_BUFFER_SIZE, SinkConfig, TimeStrategy};
use crate::{Error, Result, convert};

/// Blocks queued between the writer and the device callback.
///
/// Depth trades latency for underrun headroom: with the default 1024-sample
/// device buffer this holds well under 100 ms of audio.
const CHANNEL_DEPTH: usize = 4;

/// An open device session. Dropping it tears the stream down.
struct Session {
    stream: cpal::Stream,
    tx: SyncSender<Vec<i16>>,
    buffer_size: usize,
    /// Set on the first write; the stream is built paused so the device
    /// clock does not run ahead of the first rendered block.
    started: bool,
    start_instant: Option<Instant>,
    /// Frames the device callback has consumed, including starvation
    /// padding. Written by the callback thread, read for
    /// [`TimeStrategy::DeviceReported`].
    consumed_frames: Arc<AtomicU64>,
}

/// An [`AudioSink`] writing 16-bit PCM to a system audio device.
///
/// Construction is cheap and infallible; the device handshake happens in
/// [`DeviceSink::open`]. Time reporting follows the configured
/// [`TimeStrategy`].
pub struct DeviceSink {
    config: SinkConfig,
    format: AudioFormat,
    offset: ClockOffset,
    scratch: Vec<i16>,
    session: Option<Session>,
}

impl DeviceSink {
    /// Create a closed sink with the given configuration.
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            format: AudioFormat::stereo(44100.0),
            offset: ClockOffset::ZERO,
            scratch: Vec::new(),
            session: None,
        }
    }

    /// Open a session on the configured device.
    ///
    /// Builds (but does not start) an output stream for `format` with a
    /// fixed buffer of `buffer_size` frames. The stream starts on the first
    /// [`AudioSink::write`]. Opening an already-open sink closes the
    /// previous session first.
    pub fn open(&mut self, format: AudioFormat, buffer_size: usize) -> Result<()> {
        if self.session.is_some() {
            self.close();
        }

        let device = find_output_device(self.config.device_name.as_deref())?;
        let stream_config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: format.sample_rate as cpal::SampleRate,
            buffer_size: cpal::BufferSize::Fixed(buffer_size as u32),
        };

        let (tx, rx) = sync_channel::<Vec<i16>>(CHANNEL_DEPTH);
        let consumed_frames = Arc::new(AtomicU64::new(0));
        let channels = format.channels as usize;

        let stream = device
            .build_output_stream(
                &stream_config,
                feed_callback(rx, Arc::clone(&consumed_frames), channels),
                |err| {
                    tracing::error!(error = %err, "output stream error");
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        tracing::info!(
            channels = format.channels,
            sample_rate = format.sample_rate,
            buffer_size,
            strategy = ?self.config.time_strategy,
            "device sink opened"
        );

        self.format = format;
        self.offset = ClockOffset::new(self.offset.as_time(), format.sample_rate);
        self.session = Some(Session {
            stream,
            tx,
            buffer_size,
            started: false,
            start_instant: None,
            consumed_frames,
        });
        Ok(())
    }
}

/// Build the pull callback that drains queued blocks into the device buffer.
///
/// Partially consumed blocks carry over between callbacks; when the queue is
/// empty the remainder is padded with silence rather than stalling the
/// device thread.
fn feed_callback(
    rx: Receiver<Vec<i16>>,
    consumed_frames: Arc<AtomicU64>,
    channels: usize,
) -> impl FnMut(&mut [i16], &cpal::OutputCallbackInfo) {
    let mut pending: Vec<i16> = Vec::new();
    let mut cursor = 0usize;

    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
        let mut filled = 0;
        while filled < data.len() {
            if cursor >= pending.len() {
                match rx.try_recv() {
                    Ok(block) => {
                        pending = block;
                        cursor = 0;
                    }
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                        data[filled..].fill(0);
                        break;
                    }
                }
            }
            let n = (data.len() - filled).min(pending.len() - cursor);
            data[filled..filled + n].copy_from_slice(&pending[cursor..cursor + n]);
            cursor += n;
            filled += n;
        }
        consumed_frames.fetch_add((data.len() / channels) as u64, Ordering::Relaxed);
    }
}

/// Find a cpal output device by case-insensitive name substring, or the
/// platform default.
fn find_output_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match name {
        Some(search) => {
            let search_lower = search.to_lowercase();
            let devices = host
                .output_devices()
                .map_err(|e| Error::Stream(e.to_string()))?;

            for device in devices {
                if let Ok(dev_name) = device.name()
                    && dev_name.to_lowercase().contains(search_lower.as_str())
                {
                    return Ok(device);
                }
            }
            Err(Error::DeviceNotFound(format!(
                "no output device matching '{}'",
                search
            )))
        }
        None => host.default_output_device().ok_or(Error::NoDevice),
    }
}

impl AudioSink for DeviceSink {
    fn write(&mut self, buffer: &RenderBuffer) {
        let Some(session) = &mut self.session else {
            tracing::trace!("write on closed sink ignored");
            return;
        };

        let block = convert::f32_to_i16_into(buffer.samples(), &mut self.scratch);

        if !session.started {
            if let Err(e) = session.stream.play() {
                tracing::error!(error = %e, "failed to start output stream");
                return;
            }
            session.started = true;
            session.start_instant = Some(Instant::now());
            tracing::debug!("output stream started on first write");
        }

        // Blocks while CHANNEL_DEPTH blocks are queued; fails only if the
        // stream thread is gone.
        if session.tx.send(block.to_vec()).is_err() {
            tracing::warn!("output stream receiver gone, dropping block");
        }
    }

    fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn close(&mut self) {
        if let Some(session) = self.session.take() {
            if session.started {
                if let Err(e) = session.stream.pause() {
                    tracing::debug!(error = %e, "pause on close failed");
                }
            }
            drop(session);
            tracing::info!("device sink closed");
        }
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn buffer_size(&self) -> usize {
        self.session
            .as_ref()
            .map_or(DEFAULT_BUFFER_SIZE, |s| s.buffer_size)
    }
}

impl AudioClock for DeviceSink {
    fn audio_time(&self) -> AudioTime {
        let Some(session) = &self.session else {
            return self.offset.as_time();
        };

        match self.config.time_strategy {
            TimeStrategy::Emulated => match session.start_instant {
                Some(start) => {
                    AudioTime::from_nanos(start.elapsed().as_nanos() as i64 + self.offset.nanos())
                }
                None => self.offset.as_time(),
            },
            TimeStrategy::DeviceReported => {
                let consumed = session.consumed_frames.load(Ordering::Relaxed) as i64;
                AudioTime::from_samples(consumed + self.offset.samples(), self.format.sample_rate)
            }
        }
    }
}

impl AdjustableAudioClock for DeviceSink {
    fn time_offset(&self) -> AudioTime {
        self.offset.as_time()
    }

    fn set_time_offset(&mut self, offset: AudioTime) {
        self.offset = ClockOffset::new(offset, self.format.sample_rate);
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        self.close();
    }
}
