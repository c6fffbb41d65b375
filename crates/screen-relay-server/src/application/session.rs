//! StreamingSession: wires the pipeline together and owns its threads.
//!
//! ```text
//!  ScreenCapturer ─┐
//!  FrameEncoder  ──┼─► CaptureLoop ──► FrameMailbox ──► BroadcastLoop ──► ClientRegistry
//!                  │                                                        ▲
//!  InputInjector ──┴─► ControlChannel ◄── transport (per-viewer tasks) ──────┘
//! ```
//!
//! Every session owns its own [`SessionControl`], [`FrameMailbox`] and
//! [`ClientRegistry`]; nothing is process-global.
//!
//! # Shutdown
//!
//! [`StreamingSession::shutdown`] sets the stop flag, which wakes both pacing
//! waits, then joins the capture, broadcast and reporter threads.  Each loop
//! finishes the cycle it is in before it sees the flag.  The gateways are
//! dropped only after the join, when the capture thread releases them.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use screen_relay_core::{ClientRegistry, FrameMailbox, SessionControl, SessionError, SessionParams};
use thiserror::Error;
use tracing::{error, info};

use super::broadcast_loop::BroadcastLoop;
use super::capture_loop::CaptureLoop;
use super::control_channel::ControlChannel;
use super::diagnostics::{spawn_reporter, PipelineStats};
use super::gateways::{FrameEncoder, InputInjector, ScreenCapturer};

/// Why a session could not start.
#[derive(Debug, Error)]
pub enum SessionStartError {
    #[error("invalid session parameters: {0}")]
    Params(#[from] SessionError),

    #[error("failed to spawn pipeline thread: {0}")]
    Spawn(#[from] io::Error),
}

/// The three platform adapters a session drives.
pub struct SessionGateways {
    pub capturer: Box<dyn ScreenCapturer>,
    pub encoder: Box<dyn FrameEncoder>,
    pub injector: Arc<dyn InputInjector>,
}

/// Optional diagnostic reporter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsOptions {
    pub enabled: bool,
    pub interval: Duration,
}

impl Default for DiagnosticsOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(1),
        }
    }
}

/// A running capture → broadcast pipeline.
pub struct StreamingSession {
    control: Arc<SessionControl>,
    mailbox: Arc<FrameMailbox>,
    registry: Arc<ClientRegistry>,
    stats: Arc<PipelineStats>,
    channel: Arc<ControlChannel>,
    threads: Vec<(&'static str, JoinHandle<()>)>,
}

impl StreamingSession {
    /// Validates `params` and starts the capture and broadcast threads (and
    /// the reporter, if enabled).
    ///
    /// # Errors
    ///
    /// Returns [`SessionStartError`] if the parameters are invalid or a
    /// thread cannot be spawned.  Threads already started are stopped and
    /// joined before the error is returned.
    pub fn start(
        params: SessionParams,
        gateways: SessionGateways,
        diagnostics: DiagnosticsOptions,
    ) -> Result<Self, SessionStartError> {
        let control = Arc::new(SessionControl::new(params)?);
        let mailbox = Arc::new(FrameMailbox::new());
        let registry = Arc::new(ClientRegistry::new());
        let stats = Arc::new(PipelineStats::new());
        let channel = Arc::new(ControlChannel::new(
            Arc::clone(&control),
            gateways.injector,
        ));

        let mut session = Self {
            control: Arc::clone(&control),
            mailbox: Arc::clone(&mailbox),
            registry: Arc::clone(&registry),
            stats: Arc::clone(&stats),
            channel,
            threads: Vec::new(),
        };

        // On early return `session` is dropped, which stops and joins
        // whatever was already spawned.
        let capture = CaptureLoop::new(
            gateways.capturer,
            gateways.encoder,
            Arc::clone(&control),
            Arc::clone(&mailbox),
            Arc::clone(&stats),
        );
        session.threads.push(("capture", capture.spawn()?));

        let broadcast = BroadcastLoop::new(
            Arc::clone(&control),
            Arc::clone(&mailbox),
            Arc::clone(&registry),
            Arc::clone(&stats),
        );
        session.threads.push(("broadcast", broadcast.spawn()?));

        if diagnostics.enabled {
            let reporter = spawn_reporter(
                Arc::clone(&control),
                Arc::clone(&stats),
                Arc::clone(&registry),
                diagnostics.interval,
            )?;
            session.threads.push(("diagnostics", reporter));
        }

        info!(
            "streaming session started: {} FPS, capture x{}, budget {} KiB",
            params.target_fps,
            params.capture_multiplier,
            params.size_budget_bytes / 1024
        );
        Ok(session)
    }

    pub fn control(&self) -> &Arc<SessionControl> {
        &self.control
    }

    pub fn mailbox(&self) -> &Arc<FrameMailbox> {
        &self.mailbox
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// The dispatcher viewer connections feed their text messages into.
    pub fn control_channel(&self) -> Arc<ControlChannel> {
        Arc::clone(&self.channel)
    }

    /// Stops every loop and waits for all of them to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
        info!("streaming session stopped");
    }

    fn stop_and_join(&mut self) {
        self.control.stop();
        for (name, handle) in self.threads.drain(..) {
            if handle.join().is_err() {
                error!("{name} thread panicked");
            }
        }
    }
}

impl Drop for StreamingSession {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
