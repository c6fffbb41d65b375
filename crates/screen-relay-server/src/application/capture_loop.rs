//! Adaptive capture loop: the producer side of the pipeline.
//!
//! One dedicated OS thread runs [`CaptureLoop::run`].  Every cycle it
//!
//! 1. waits until one capture interval (`1 / (target_fps × multiplier)`) has
//!    passed since the previous cycle started, or the session stops;
//! 2. captures a raw frame and the pointer image;
//! 3. draws the pointer into the frame;
//! 4. encodes the frame at the current quality level;
//! 5. feeds the encoded size to the [`QualityController`], which picks the
//!    level for the *next* cycle;
//! 6. publishes the bytes to the [`FrameMailbox`].
//!
//! Because the wait is measured from the start of the previous cycle, the
//! time spent in steps 2–6 is subtracted from the next wait (floored at
//! zero).  The loop is interval-paced even when encoding is cheap.
//!
//! A failed capture or encode skips the rest of the cycle; the previous frame
//! stays in the mailbox and the next cycle tries again.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use screen_relay_core::{
    Cadence, Frame, FrameMailbox, QualityAdjustment, QualityController, SessionControl, Tick,
};
use tracing::{debug, info, warn};

use super::diagnostics::PipelineStats;
use super::gateways::{CapturedScreen, FrameEncoder, ScreenCapturer};

/// What one call to [`CaptureLoop::run_cycle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A frame of `bytes` bytes was published.  It was encoded at `quality`;
    /// `adjustment` is what the controller did for the next cycle.
    Published {
        bytes: usize,
        quality: u8,
        adjustment: QualityAdjustment,
    },
    CaptureFailed,
    EncodeFailed,
    /// The encoder returned zero bytes; nothing was published.
    EmptyEncode,
}

/// The producer: owns the capture and encoder gateways and the quality level.
pub struct CaptureLoop {
    capturer: Box<dyn ScreenCapturer>,
    encoder: Box<dyn FrameEncoder>,
    quality: QualityController,
    control: Arc<SessionControl>,
    mailbox: Arc<FrameMailbox>,
    stats: Arc<PipelineStats>,
}

impl CaptureLoop {
    pub fn new(
        capturer: Box<dyn ScreenCapturer>,
        encoder: Box<dyn FrameEncoder>,
        control: Arc<SessionControl>,
        mailbox: Arc<FrameMailbox>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            capturer,
            encoder,
            quality: QualityController::new(),
            control,
            mailbox,
            stats,
        }
    }

    /// Quality level the next cycle will encode at.
    pub fn quality(&self) -> u8 {
        self.quality.level()
    }

    /// Runs steps 2–6 once, without waiting.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let capture_start = Instant::now();
        let CapturedScreen { mut frame, cursor } = match self.capturer.capture() {
            Ok(captured) => captured,
            Err(e) => {
                warn!("capture failed: {e}");
                self.stats.record_capture_failure();
                return CycleOutcome::CaptureFailed;
            }
        };
        if let Some(cursor) = &cursor {
            frame.composite_cursor(cursor);
        }
        self.stats.record_capture(capture_start.elapsed());

        let quality = self.quality.level();
        let encode_start = Instant::now();
        let encoded = match self.encoder.encode(&frame, quality) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("encode failed at quality {quality}: {e}");
                self.stats.record_encode_failure();
                return CycleOutcome::EncodeFailed;
            }
        };
        self.stats.record_encode(encode_start.elapsed(), encoded.len());

        if encoded.is_empty() {
            warn!("encoder produced an empty frame; not publishing");
            return CycleOutcome::EmptyEncode;
        }

        let bytes = encoded.len();
        let budget = self.control.params().size_budget_bytes;
        let adjustment = self.quality.observe(bytes, budget);
        if adjustment != QualityAdjustment::Held {
            debug!(
                "frame {bytes} B vs budget {budget} B: quality {quality} -> {}",
                self.quality.level()
            );
        }
        self.stats.set_quality(self.quality.level());

        self.mailbox.publish(Frame::new(encoded));
        self.stats.record_published();

        CycleOutcome::Published {
            bytes,
            quality,
            adjustment,
        }
    }

    /// Runs cycles until the session stops.
    pub fn run(mut self) {
        let (width, height) = self.capturer.dimensions();
        info!("capture loop started ({width}x{height})");
        let mut cycle_start = Instant::now();
        while self.control.wait_until_due(cycle_start, Cadence::Capture) == Tick::Due {
            cycle_start = Instant::now();
            self.run_cycle();
        }
        info!("capture loop stopped");
    }

    /// Moves the loop onto its own named thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("relay-capture".to_string())
            .spawn(move || self.run())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
