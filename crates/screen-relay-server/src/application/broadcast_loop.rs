//! Broadcast loop: the consumer side of the pipeline.
//!
//! Paced at `1 / target_fps` (the viewer-facing rate, not the capture rate).
//! Each cycle reads the newest frame from the [`FrameMailbox`] and hands it
//! to every viewer in a [`ClientRegistry`] snapshot.
//!
//! - If the mailbox has nothing usable the last frame this loop sent is
//!   repeated; before the first frame ever arrives the cycle is skipped.
//! - A viewer whose sink fails is logged and removed after the fan-out.  The
//!   other viewers still get the frame.
//! - Sinks hand the frame to the connection's own writer task and return, so
//!   no cycle waits on network I/O.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use screen_relay_core::{
    Cadence, ClientRegistry, Frame, FrameMailbox, SessionControl, Tick, ViewerId,
};
use tracing::{info, warn};

use super::diagnostics::PipelineStats;

/// What one call to [`BroadcastLoop::broadcast_once`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// No frame has ever been available; nothing was sent.
    Idle,
    Sent {
        /// Viewers that accepted the frame.
        delivered: usize,
        /// Viewers whose sink failed; they are no longer registered.
        dropped: Vec<ViewerId>,
        /// `true` when the mailbox was empty and the previous frame was repeated.
        repeated: bool,
    },
}

pub struct BroadcastLoop {
    control: Arc<SessionControl>,
    mailbox: Arc<FrameMailbox>,
    registry: Arc<ClientRegistry>,
    stats: Arc<PipelineStats>,
    last_sent: Option<Frame>,
}

impl BroadcastLoop {
    pub fn new(
        control: Arc<SessionControl>,
        mailbox: Arc<FrameMailbox>,
        registry: Arc<ClientRegistry>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            control,
            mailbox,
            registry,
            stats,
            last_sent: None,
        }
    }

    /// Runs one fan-out without waiting.
    pub fn broadcast_once(&mut self) -> BroadcastOutcome {
        let (frame, repeated) = match self.mailbox.latest().filter(|f| !f.is_empty()) {
            Some(frame) => (frame, false),
            None => match &self.last_sent {
                Some(previous) => (previous.clone(), true),
                None => return BroadcastOutcome::Idle,
            },
        };

        let mut delivered = 0;
        let mut dropped = Vec::new();
        for (id, sink) in self.registry.snapshot() {
            match sink.deliver(&frame) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("viewer {id}: send failed: {e}");
                    self.stats.record_send_failure();
                    dropped.push(id);
                }
            }
        }
        for id in &dropped {
            self.registry.remove(*id);
        }

        self.stats.record_broadcast();
        self.last_sent = Some(frame);
        BroadcastOutcome::Sent {
            delivered,
            dropped,
            repeated,
        }
    }

    /// Runs cycles until the session stops.
    pub fn run(mut self) {
        info!("broadcast loop started");
        let mut cycle_start = Instant::now();
        while self.control.wait_until_due(cycle_start, Cadence::Broadcast) == Tick::Due {
            cycle_start = Instant::now();
            self.broadcast_once();
        }
        info!("broadcast loop stopped");
    }

    /// Moves the loop onto its own named thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("relay-broadcast".to_string())
            .spawn(move || self.run())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use screen_relay_core::{DeliveryError, SessionParams, ViewerSink};
    use std::sync::Mutex;

    /// Records every payload; optionally fails every delivery.
    #[derive(Default)]
    struct RecordingSink {
        received: Mutex<Vec<Vec<u8>>>,
        fail: bool,
    }

    impl ViewerSink for RecordingSink {
        fn deliver(&self, frame: &Frame) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Disconnected);
            }
            self.received.lock().unwrap().push(frame.to_vec());
            Ok(())
        }
    }

    /// Removes another viewer from the registry while it is being called,
    /// simulating a disconnect in the middle of a fan-out.
    struct DisconnectingSink {
        registry: Arc<ClientRegistry>,
        victim: Mutex<Option<ViewerId>>,
    }

    impl ViewerSink for DisconnectingSink {
        fn deliver(&self, _frame: &Frame) -> Result<(), DeliveryError> {
            if let Some(id) = self.victim.lock().unwrap().take() {
                self.registry.remove(id);
            }
            Ok(())
        }
    }

    struct Fixture {
        lp: BroadcastLoop,
        mailbox: Arc<FrameMailbox>,
        registry: Arc<ClientRegistry>,
    }

    fn fixture() -> Fixture {
        let control = Arc::new(SessionControl::new(SessionParams::default()).unwrap());
        let mailbox = Arc::new(FrameMailbox::new());
        let registry = Arc::new(ClientRegistry::new());
        let lp = BroadcastLoop::new(
            control,
            Arc::clone(&mailbox),
            Arc::clone(&registry),
            Arc::new(PipelineStats::new()),
        );
        Fixture {
            lp,
            mailbox,
            registry,
        }
    }

    #[test]
    fn test_idle_before_first_frame() {
        let mut f = fixture();
        let sink = Arc::new(RecordingSink::default());
        f.registry.add(sink.clone());

        assert_eq!(f.lp.broadcast_once(), BroadcastOutcome::Idle);
        assert!(sink.received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_latest_frame_reaches_every_viewer() {
        // Arrange
        let mut f = fixture();
        let a = Arc::new(RecordingSink::default());
        let b = Arc::new(RecordingSink::default());
        f.registry.add(a.clone());
        f.registry.add(b.clone());
        f.mailbox.publish(Frame::new(vec![1]));
        f.mailbox.publish(Frame::new(vec![2]));

        // Act
        let outcome = f.lp.broadcast_once();

        // Assert
        assert_eq!(
            outcome,
            BroadcastOutcome::Sent {
                delivered: 2,
                dropped: vec![],
                repeated: false
            }
        );
        assert_eq!(*a.received.lock().unwrap(), vec![vec![2]]);
        assert_eq!(*b.received.lock().unwrap(), vec![vec![2]]);
    }

    #[test]
    fn test_empty_mailbox_frame_repeats_previous() {
        // Arrange: one real frame, then an empty one
        let mut f = fixture();
        let sink = Arc::new(RecordingSink::default());
        f.registry.add(sink.clone());
        f.mailbox.publish(Frame::new(vec![7, 7]));
        f.lp.broadcast_once();
        f.mailbox.publish(Frame::new(Vec::new()));

        // Act
        let outcome = f.lp.broadcast_once();

        // Assert: never an empty payload
        assert!(matches!(
            outcome,
            BroadcastOutcome::Sent { repeated: true, .. }
        ));
        assert_eq!(*sink.received.lock().unwrap(), vec![vec![7, 7], vec![7, 7]]);
    }

    #[test]
    fn test_failed_viewer_is_dropped_and_others_still_served() {
        // Arrange
        let mut f = fixture();
        let good = Arc::new(RecordingSink::default());
        let bad = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });
        let good_id = f.registry.add(good.clone());
        let bad_id = f.registry.add(bad);
        f.mailbox.publish(Frame::new(vec![9]));

        // Act
        let outcome = f.lp.broadcast_once();

        // Assert
        assert_eq!(
            outcome,
            BroadcastOutcome::Sent {
                delivered: 1,
                dropped: vec![bad_id],
                repeated: false
            }
        );
        assert!(f.registry.contains(good_id));
        assert!(!f.registry.contains(bad_id));
        assert_eq!(good.received.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_disconnect_during_fan_out() {
        // Arrange: a sink that removes the second viewer when called
        let mut f = fixture();
        let other = Arc::new(RecordingSink::default());
        let other_id = f.registry.add(other.clone());
        f.registry.add(Arc::new(DisconnectingSink {
            registry: Arc::clone(&f.registry),
            victim: Mutex::new(Some(other_id)),
        }));
        f.mailbox.publish(Frame::new(vec![3]));

        // Act: iteration runs over the snapshot, so nothing breaks
        let outcome = f.lp.broadcast_once();

        // Assert
        assert!(matches!(outcome, BroadcastOutcome::Sent { .. }));
        assert!(!f
            .registry
            .snapshot()
            .iter()
            .any(|(id, _)| *id == other_id));
        assert_eq!(f.registry.len(), 1);
    }
}
