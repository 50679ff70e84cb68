//! The audio pump: the render loop that drives a sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use resona_core::RenderBuffer;

use crate::scheduler::{ServiceAction, ServiceScheduler};
use crate::sink::AudioSink;

/// A producer of rendered audio blocks with a housekeeping hook.
///
/// The synthesis engine implements this; the pump calls [`render`] once per
/// block and [`service`] whenever the scheduler's cadence elapses.
///
/// [`render`]: AudioRenderer::render
/// [`service`]: AudioRenderer::service
pub trait AudioRenderer {
    /// Fill `buffer` with the next block of audio, overwriting its contents.
    fn render(&mut self, buffer: &mut RenderBuffer);

    /// Perform periodic housekeeping: voice reaping, control-rate updates,
    /// anything too coarse for per-sample work but too fine for per-session.
    fn service(&mut self);
}

/// Cooperative stop flag for a running pump, usable from any thread.
#[derive(Clone, Debug)]
pub struct PumpHandle {
    running: Arc<AtomicBool>,
}

impl PumpHandle {
    /// Ask the pump to stop after the block currently in flight.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether the pump loop is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// The blocking render loop.
///
/// Each cycle renders one block, writes it to the sink (which blocks when
/// the device is saturated — that is the loop's pacing), then consults the
/// scheduler: `Service` invokes the renderer's housekeeping hook, `Stop`
/// ends the loop. The loop also ends when a [`PumpHandle`] requests it.
///
/// [`run`](AudioPump::run) blocks the calling thread; spawn it on a
/// dedicated thread for live output.
#[derive(Debug, Default)]
pub struct AudioPump {
    running: Arc<AtomicBool>,
}

impl AudioPump {
    /// Create a pump that is not yet running.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stop handle valid across this pump's runs.
    pub fn handle(&self) -> PumpHandle {
        PumpHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Run the render loop until the scheduler's stop boundary is crossed
    /// or a handle requests a stop. Returns total samples written.
    pub fn run(
        &self,
        renderer: &mut dyn AudioRenderer,
        sink: &mut dyn AudioSink,
        scheduler: &mut ServiceScheduler,
        block_frames: usize,
    ) -> u64 {
        let mut buffer = RenderBuffer::new(sink.channels(), sink.sample_rate(), block_frames);
        self.running.store(true, Ordering::Release);
        tracing::info!(block_frames, "audio pump started");

        while self.running.load(Ordering::Acquire) {
            buffer.fill_silence();
            renderer.render(&mut buffer);
            sink.write(&buffer);

            match scheduler.advance(buffer.frames() as u64) {
                ServiceAction::Continue => {}
                ServiceAction::Service => renderer.service(),
                ServiceAction::Stop => break,
            }
        }

        self.running.store(false, Ordering::Release);
        let written = scheduler.written();
        tracing::info!(written_samples = written, "audio pump stopped");
        written
    }
}
