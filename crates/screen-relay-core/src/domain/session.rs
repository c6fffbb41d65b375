//! Session parameters and the pacing wait shared by both pipeline loops.
//!
//! [`SessionControl`] guards the mutable [`SessionParams`] and the session's
//! stop flag with one mutex and one condition variable.  Every write
//! (parameter change or stop) notifies all waiters, and a waiter recomputes
//! its deadline from the *current* parameters on every wake.  A viewer that
//! raises the frame rate therefore shortens the very next wait instead of
//! waiting out the stale interval.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

/// Broadcast frame rate used when nothing else is configured.
pub const DEFAULT_TARGET_FPS: u32 = 60;
/// Capture runs this many times faster than broadcast by default.
pub const DEFAULT_CAPTURE_MULTIPLIER: f64 = 2.0;
/// Encoded frame size budget used when nothing else is configured.
pub const DEFAULT_SIZE_BUDGET_BYTES: usize = 60 * 1024;

/// Rejected parameter values.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("target FPS must be at least 1")]
    InvalidTargetFps,
    #[error("capture multiplier must be a finite number >= 1, got {0}")]
    InvalidCaptureMultiplier(f64),
    #[error("size budget must be at least 1 byte")]
    InvalidSizeBudget,
}

/// The tunable parameters of one streaming session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionParams {
    /// Viewer-facing broadcast rate.
    pub target_fps: u32,
    /// Capture rate divided by broadcast rate; always `>= 1` so the mailbox
    /// is refreshed at least as often as it is read.
    pub capture_multiplier: f64,
    /// Maximum desired encoded frame size.
    pub size_budget_bytes: usize,
}

impl SessionParams {
    /// Checks the invariants of every field.
    ///
    /// # Errors
    ///
    /// Returns the first [`SessionError`] found.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.target_fps == 0 {
            return Err(SessionError::InvalidTargetFps);
        }
        if !self.capture_multiplier.is_finite() || self.capture_multiplier < 1.0 {
            return Err(SessionError::InvalidCaptureMultiplier(
                self.capture_multiplier,
            ));
        }
        if self.size_budget_bytes == 0 {
            return Err(SessionError::InvalidSizeBudget);
        }
        Ok(())
    }

    /// Interval between capture cycles: `1 / (target_fps * multiplier)`.
    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / (f64::from(self.target_fps) * self.capture_multiplier))
    }

    /// Interval between broadcast cycles: `1 / target_fps`.
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps))
    }

    /// The interval that paces `cadence`.
    pub fn interval(&self, cadence: Cadence) -> Duration {
        match cadence {
            Cadence::Capture => self.capture_interval(),
            Cadence::Broadcast => self.broadcast_interval(),
        }
    }
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            capture_multiplier: DEFAULT_CAPTURE_MULTIPLIER,
            size_budget_bytes: DEFAULT_SIZE_BUDGET_BYTES,
        }
    }
}

/// Converts a budget in KiB to bytes.
///
/// # Errors
///
/// Returns [`SessionError::InvalidSizeBudget`] for `0` or for a value whose
/// byte count does not fit in `usize`.
pub fn budget_bytes_from_kib(kib: u32) -> Result<usize, SessionError> {
    if kib == 0 {
        return Err(SessionError::InvalidSizeBudget);
    }
    usize::try_from(kib)
        .ok()
        .and_then(|kib| kib.checked_mul(1024))
        .ok_or(SessionError::InvalidSizeBudget)
}

/// Which loop is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Capture,
    Broadcast,
}

/// Result of a pacing wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The interval has elapsed; run the next cycle.
    Due,
    /// The session was stopped; exit the loop.
    Stopped,
}

#[derive(Debug)]
struct ControlState {
    params: SessionParams,
    stopped: bool,
}

/// Shared, lock-guarded session state.
#[derive(Debug)]
pub struct SessionControl {
    state: Mutex<ControlState>,
    changed: Condvar,
}

impl SessionControl {
    /// # Errors
    ///
    /// Returns [`SessionError`] if `params` violates an invariant.
    pub fn new(params: SessionParams) -> Result<Self, SessionError> {
        params.validate()?;
        Ok(Self {
            state: Mutex::new(ControlState {
                params,
                stopped: false,
            }),
            changed: Condvar::new(),
        })
    }

    /// A copy of the current parameters.
    pub fn params(&self) -> SessionParams {
        self.lock().params
    }

    /// Changes the broadcast rate and wakes every pacing wait.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTargetFps`] for `0`.
    pub fn set_target_fps(&self, fps: u32) -> Result<(), SessionError> {
        if fps == 0 {
            return Err(SessionError::InvalidTargetFps);
        }
        self.lock().params.target_fps = fps;
        self.changed.notify_all();
        info!("target FPS set to {fps}");
        Ok(())
    }

    /// Changes the encoded size budget (given in KiB) and wakes every
    /// pacing wait.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSizeBudget`] for `0` or a budget too
    /// large to address.
    pub fn set_size_budget_kib(&self, kib: u32) -> Result<(), SessionError> {
        let bytes = budget_bytes_from_kib(kib)?;
        self.lock().params.size_budget_bytes = bytes;
        self.changed.notify_all();
        info!("size budget set to {kib} KiB ({bytes} bytes)");
        Ok(())
    }

    /// Sets the stop flag and wakes every waiter.
    pub fn stop(&self) {
        self.lock().stopped = true;
        self.changed.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Blocks until `since + interval(cadence)` or until the session stops.
    ///
    /// The interval is recomputed on every wake, so a parameter change made
    /// while waiting moves the deadline immediately.  A deadline already in
    /// the past returns [`Tick::Due`] without blocking.
    pub fn wait_until_due(&self, since: Instant, cadence: Cadence) -> Tick {
        let mut state = self.lock();
        loop {
            if state.stopped {
                return Tick::Stopped;
            }
            let deadline = since + state.params.interval(cadence);
            let now = Instant::now();
            if now >= deadline {
                return Tick::Due;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Blocks for `period` or until the session stops, ignoring parameter
    /// changes.  Used by the diagnostic reporter.
    pub fn wait_for(&self, period: Duration) -> Tick {
        let deadline = Instant::now() + period;
        let mut state = self.lock();
        loop {
            if state.stopped {
                return Tick::Stopped;
            }
            let now = Instant::now();
            if now >= deadline {
                return Tick::Due;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn control(fps: u32, multiplier: f64) -> Arc<SessionControl> {
        Arc::new(
            SessionControl::new(SessionParams {
                target_fps: fps,
                capture_multiplier: multiplier,
                size_budget_bytes: 60 * 1024,
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(SessionParams::default().validate(), Ok(()));
        assert_eq!(SessionParams::default().size_budget_bytes, 61_440);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = SessionParams::default();
        assert_eq!(
            SessionParams { target_fps: 0, ..base }.validate(),
            Err(SessionError::InvalidTargetFps)
        );
        assert_eq!(
            SessionParams { capture_multiplier: 0.5, ..base }.validate(),
            Err(SessionError::InvalidCaptureMultiplier(0.5))
        );
        assert!(SessionParams { capture_multiplier: f64::NAN, ..base }
            .validate()
            .is_err());
        assert_eq!(
            SessionParams { size_budget_bytes: 0, ..base }.validate(),
            Err(SessionError::InvalidSizeBudget)
        );
    }

    #[test]
    fn test_intervals_follow_fps_and_multiplier() {
        let params = SessionParams {
            target_fps: 25,
            capture_multiplier: 2.0,
            size_budget_bytes: 1,
        };
        assert!((params.broadcast_interval().as_secs_f64() - 0.040).abs() < 1e-9);
        assert!((params.capture_interval().as_secs_f64() - 0.020).abs() < 1e-9);
    }

    #[test]
    fn test_setters_update_params() {
        let ctl = control(60, 2.0);

        ctl.set_target_fps(30).unwrap();
        ctl.set_size_budget_kib(80).unwrap();

        let params = ctl.params();
        assert_eq!(params.target_fps, 30);
        assert_eq!(params.size_budget_bytes, 81_920);
    }

    #[test]
    fn test_setters_reject_zero() {
        let ctl = control(60, 2.0);
        assert_eq!(ctl.set_target_fps(0), Err(SessionError::InvalidTargetFps));
        assert_eq!(
            ctl.set_size_budget_kib(0),
            Err(SessionError::InvalidSizeBudget)
        );
        assert_eq!(ctl.params().target_fps, 60);
    }

    #[test]
    fn test_budget_conversion_is_checked() {
        assert_eq!(budget_bytes_from_kib(0), Err(SessionError::InvalidSizeBudget));
        assert_eq!(budget_bytes_from_kib(60), Ok(61_440));

        // The parser admits up to i32::MAX KiB; that must never panic.
        let largest = i32::MAX as u32;
        let expected = usize::try_from(u64::from(largest) * 1024)
            .map_err(|_| SessionError::InvalidSizeBudget);
        assert_eq!(budget_bytes_from_kib(largest), expected);

        let ctl = control(60, 2.0);
        assert_eq!(ctl.set_size_budget_kib(largest), expected.map(|_| ()));
    }

    #[test]
    fn test_past_deadline_is_due_immediately() {
        let ctl = control(60, 2.0);
        let since = Instant::now() - Duration::from_secs(1);
        assert_eq!(ctl.wait_until_due(since, Cadence::Capture), Tick::Due);
    }

    #[test]
    fn test_stop_interrupts_wait() {
        // Arrange: 1 FPS means a one-second broadcast wait.
        let ctl = control(1, 1.0);
        let waiter = {
            let ctl = Arc::clone(&ctl);
            thread::spawn(move || {
                let start = Instant::now();
                (ctl.wait_until_due(start, Cadence::Broadcast), start.elapsed())
            })
        };

        // Act
        thread::sleep(Duration::from_millis(50));
        ctl.stop();

        // Assert
        let (tick, elapsed) = waiter.join().unwrap();
        assert_eq!(tick, Tick::Stopped);
        assert!(elapsed < Duration::from_millis(900), "elapsed {elapsed:?}");
    }

    #[test]
    fn test_fps_increase_shortens_pending_wait() {
        // Arrange: 1 FPS, so the wait would normally last a full second.
        let ctl = control(1, 1.0);
        let waiter = {
            let ctl = Arc::clone(&ctl);
            thread::spawn(move || {
                let start = Instant::now();
                (ctl.wait_until_due(start, Cadence::Capture), start.elapsed())
            })
        };

        // Act: switch to 20 FPS (50 ms interval) while the waiter is blocked.
        thread::sleep(Duration::from_millis(100));
        ctl.set_target_fps(20).unwrap();

        // Assert: the wait ends right after the change, not at the old
        // deadline, and never before the new 50 ms interval.
        let (tick, elapsed) = waiter.join().unwrap();
        assert_eq!(tick, Tick::Due);
        assert!(elapsed < Duration::from_millis(900), "elapsed {elapsed:?}");
        assert!(elapsed >= Duration::from_millis(50), "elapsed {elapsed:?}");
    }

    #[test]
    fn test_wait_lasts_the_full_interval() {
        // Arrange: 20 FPS x 1.0 is a 50 ms capture interval.
        let ctl = control(20, 1.0);

        // Act
        let start = Instant::now();
        let tick = ctl.wait_until_due(start, Cadence::Capture);
        let elapsed = start.elapsed();

        // Assert
        assert_eq!(tick, Tick::Due);
        assert!(elapsed >= Duration::from_millis(45), "elapsed {elapsed:?}");
    }

    #[test]
    fn test_fps_decrease_extends_pending_wait() {
        // Arrange: 20 FPS x 1.0, a 50 ms wait.
        let ctl = control(20, 1.0);
        let waiter = {
            let ctl = Arc::clone(&ctl);
            thread::spawn(move || {
                let start = Instant::now();
                (ctl.wait_until_due(start, Cadence::Capture), start.elapsed())
            })
        };

        // Act: drop to 5 FPS (200 ms) before the first deadline passes.
        thread::sleep(Duration::from_millis(10));
        ctl.set_target_fps(5).unwrap();

        // Assert
        let (tick, elapsed) = waiter.join().unwrap();
        assert_eq!(tick, Tick::Due);
        assert!(elapsed >= Duration::from_millis(190), "elapsed {elapsed:?}");
    }

    #[test]
    fn test_stopped_session_never_waits() {
        let ctl = control(1, 1.0);
        ctl.stop();
        assert!(ctl.is_stopped());
        assert_eq!(ctl.wait_for(Duration::from_secs(10)), Tick::Stopped);
    }
}
