//! Pipeline counters and the optional diagnostic reporter.
//!
//! [`PipelineStats`] is a bag of lock-free counters.  The capture and
//! broadcast loops bump them on every cycle; the reporter thread (started
//! only with `--verbose`) drains them once per interval and logs one summary
//! line.  Nothing in the pipeline ever reads the counters back, so the
//! reporter is strictly read-only with respect to streaming.

use std::io;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use screen_relay_core::domain::quality::INITIAL_QUALITY;
use screen_relay_core::{ClientRegistry, SessionControl, SessionParams, Tick};
use tracing::info;

/// Counters shared by the pipeline threads.
#[derive(Debug)]
pub struct PipelineStats {
    capture_nanos: AtomicU64,
    captures: AtomicU64,
    capture_failures: AtomicU64,
    encode_nanos: AtomicU64,
    encodes: AtomicU64,
    encode_failures: AtomicU64,
    encoded_bytes: AtomicU64,
    frames_published: AtomicU64,
    frames_broadcast: AtomicU64,
    send_failures: AtomicU64,
    quality: AtomicU8,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self {
            capture_nanos: AtomicU64::new(0),
            captures: AtomicU64::new(0),
            capture_failures: AtomicU64::new(0),
            encode_nanos: AtomicU64::new(0),
            encodes: AtomicU64::new(0),
            encode_failures: AtomicU64::new(0),
            encoded_bytes: AtomicU64::new(0),
            frames_published: AtomicU64::new(0),
            frames_broadcast: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            quality: AtomicU8::new(INITIAL_QUALITY),
        }
    }
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time spent obtaining and compositing one frame.
    pub fn record_capture(&self, elapsed: Duration) {
        self.capture_nanos
            .fetch_add(duration_nanos(elapsed), Ordering::Relaxed);
        self.captures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture_failure(&self) {
        self.capture_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Time spent encoding one frame and the size of the result.
    pub fn record_encode(&self, elapsed: Duration, encoded_len: usize) {
        self.encode_nanos
            .fetch_add(duration_nanos(elapsed), Ordering::Relaxed);
        self.encodes.fetch_add(1, Ordering::Relaxed);
        self.encoded_bytes
            .fetch_add(encoded_len as u64, Ordering::Relaxed);
    }

    pub fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    /// One broadcast cycle that had a frame to send.
    pub fn record_broadcast(&self) {
        self.frames_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_quality(&self, level: u8) {
        self.quality.store(level, Ordering::Relaxed);
    }

    pub fn quality(&self) -> u8 {
        self.quality.load(Ordering::Relaxed)
    }

    /// Returns the counters accumulated since the previous call and resets
    /// them.  The quality level is a gauge and is not reset.
    pub fn take_window(&self) -> StatsWindow {
        StatsWindow {
            capture_nanos: self.capture_nanos.swap(0, Ordering::Relaxed),
            captures: self.captures.swap(0, Ordering::Relaxed),
            capture_failures: self.capture_failures.swap(0, Ordering::Relaxed),
            encode_nanos: self.encode_nanos.swap(0, Ordering::Relaxed),
            encodes: self.encodes.swap(0, Ordering::Relaxed),
            encode_failures: self.encode_failures.swap(0, Ordering::Relaxed),
            encoded_bytes: self.encoded_bytes.swap(0, Ordering::Relaxed),
            frames_published: self.frames_published.swap(0, Ordering::Relaxed),
            frames_broadcast: self.frames_broadcast.swap(0, Ordering::Relaxed),
            send_failures: self.send_failures.swap(0, Ordering::Relaxed),
            quality: self.quality(),
        }
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// A drained snapshot of [`PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsWindow {
    pub capture_nanos: u64,
    pub captures: u64,
    pub capture_failures: u64,
    pub encode_nanos: u64,
    pub encodes: u64,
    pub encode_failures: u64,
    pub encoded_bytes: u64,
    pub frames_published: u64,
    pub frames_broadcast: u64,
    pub send_failures: u64,
    pub quality: u8,
}

impl StatsWindow {
    pub fn average_capture_time(&self) -> Option<Duration> {
        (self.captures > 0).then(|| Duration::from_nanos(self.capture_nanos / self.captures))
    }

    pub fn average_encode_time(&self) -> Option<Duration> {
        (self.encodes > 0).then(|| Duration::from_nanos(self.encode_nanos / self.encodes))
    }

    /// Mean encoded frame size in KiB.
    pub fn average_frame_kib(&self) -> Option<f64> {
        (self.encodes > 0).then(|| self.encoded_bytes as f64 / self.encodes as f64 / 1024.0)
    }
}

/// Formats one reporter line.
pub fn format_report(window: &StatsWindow, params: &SessionParams, viewers: usize) -> String {
    let ms = |d: Option<Duration>| {
        d.map_or_else(|| "n/a".to_string(), |d| format!("{:.2} ms", d.as_secs_f64() * 1000.0))
    };
    let kib = window
        .average_frame_kib()
        .map_or_else(|| "n/a".to_string(), |k| format!("{k:.1} KiB"));
    format!(
        "capture avg {}, encode avg {}, frame avg {}, quality {}, capture FPS {:.1}, \
         sending FPS {}, published {}, broadcast {}, capture failures {}, \
         encode failures {}, send failures {}, viewers {}",
        ms(window.average_capture_time()),
        ms(window.average_encode_time()),
        kib,
        window.quality,
        f64::from(params.target_fps) * params.capture_multiplier,
        params.target_fps,
        window.frames_published,
        window.frames_broadcast,
        window.capture_failures,
        window.encode_failures,
        window.send_failures,
        viewers,
    )
}

/// Starts the reporter thread.  It logs once per `interval` and exits when
/// the session stops.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_reporter(
    control: Arc<SessionControl>,
    stats: Arc<PipelineStats>,
    registry: Arc<ClientRegistry>,
    interval: Duration,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("relay-diagnostics".to_string())
        .spawn(move || {
            // Discard anything counted before the first window opens.
            stats.take_window();
            while control.wait_for(interval) == Tick::Due {
                let window = stats.take_window();
                info!(
                    "{}",
                    format_report(&window, &control.params(), registry.len())
                );
            }
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_window_resets_counters_but_not_quality() {
        // Arrange
        let stats = PipelineStats::new();
        stats.record_capture(Duration::from_millis(4));
        stats.record_capture(Duration::from_millis(6));
        stats.record_encode(Duration::from_millis(2), 2048);
        stats.record_published();
        stats.set_quality(55);

        // Act
        let first = stats.take_window();
        let second = stats.take_window();

        // Assert
        assert_eq!(first.captures, 2);
        assert_eq!(first.average_capture_time(), Some(Duration::from_millis(5)));
        assert_eq!(first.average_frame_kib(), Some(2.0));
        assert_eq!(first.frames_published, 1);
        assert_eq!(second.captures, 0);
        assert_eq!(second.frames_published, 0);
        assert_eq!(second.quality, 55);
    }

    #[test]
    fn test_empty_window_has_no_averages() {
        let window = StatsWindow::default();
        assert_eq!(window.average_capture_time(), None);
        assert_eq!(window.average_encode_time(), None);
        assert_eq!(window.average_frame_kib(), None);
    }

    #[test]
    fn test_initial_quality_gauge() {
        assert_eq!(PipelineStats::new().quality(), INITIAL_QUALITY);
    }

    #[test]
    fn test_format_report_mentions_rates() {
        // Arrange
        let window = StatsWindow {
            captures: 1,
            capture_nanos: 3_000_000,
            encodes: 1,
            encode_nanos: 1_000_000,
            encoded_bytes: 10 * 1024,
            quality: 80,
            ..StatsWindow::default()
        };
        let params = SessionParams {
            target_fps: 30,
            capture_multiplier: 2.0,
            size_budget_bytes: 60 * 1024,
        };

        // Act
        let line = format_report(&window, &params, 3);

        // Assert
        assert!(line.contains("capture avg 3.00 ms"), "{line}");
        assert!(line.contains("frame avg 10.0 KiB"), "{line}");
        assert!(line.contains("capture FPS 60.0"), "{line}");
        assert!(line.contains("sending FPS 30"), "{line}");
        assert!(line.contains("quality 80"), "{line}");
        assert!(line.contains("viewers 3"), "{line}");
    }

    #[test]
    fn test_reporter_exits_on_stop() {
        let control = Arc::new(SessionControl::new(SessionParams::default()).unwrap());
        let handle = spawn_reporter(
            Arc::clone(&control),
            Arc::new(PipelineStats::new()),
            Arc::new(ClientRegistry::new()),
            Duration::from_secs(60),
        )
        .unwrap();

        control.stop();

        handle.join().unwrap();
    }
}
