//! In-memory gateways for tests.
//!
//! The real gateways need an X server and actually move the pointer or press
//! keys on the machine running the tests.  These replacements record or
//! script everything in memory instead:
//!
//! - [`MockInputInjector`] records every injected event, in order.
//! - [`ScriptedCapturer`] returns a fixed frame (optionally with a cursor)
//!   and can be told to start failing after N captures.
//! - [`FixedSizeEncoder`] returns a deterministic payload of a chosen size,
//!   which makes the quality controller's behaviour easy to steer.
//!
//! # Usage in tests
//!
//! ```ignore
//! let injector = Arc::new(MockInputInjector::new());
//! let channel = ControlChannel::new(control, injector.clone());
//!
//! channel.handle_message("2+1+KeyA");
//!
//! assert_eq!(injector.events(), vec![InjectedInput::Key(Keysym(0x61), true)]);
//! ```

use std::sync::Mutex;

use screen_relay_core::{CursorImage, Keysym, PointerButton, RawFrame};

use crate::application::gateways::{
    CaptureError, CapturedScreen, EncodeError, FrameEncoder, InputInjector, ScreenCapturer,
};

// ── MockInputInjector ─────────────────────────────────────────────────────────

/// One call recorded by [`MockInputInjector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedInput {
    Key(Keysym, bool),
    Motion(i32, i32),
    Button(PointerButton, bool),
}

/// Records every injection call without touching the OS.
#[derive(Debug, Default)]
pub struct MockInputInjector {
    events: Mutex<Vec<InjectedInput>>,
}

impl MockInputInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything injected so far, oldest first.
    pub fn events(&self) -> Vec<InjectedInput> {
        self.lock().clone()
    }

    fn record(&self, input: InjectedInput) {
        self.lock().push(input);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<InjectedInput>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl InputInjector for MockInputInjector {
    fn inject_key(&self, keysym: Keysym, pressed: bool) {
        self.record(InjectedInput::Key(keysym, pressed));
    }

    fn inject_motion(&self, x: i32, y: i32) {
        self.record(InjectedInput::Motion(x, y));
    }

    fn inject_button(&self, button: PointerButton, pressed: bool) {
        self.record(InjectedInput::Button(button, pressed));
    }
}

// ── ScriptedCapturer ──────────────────────────────────────────────────────────

/// Returns clones of one frame; fails every capture after `fail_after`
/// successes when that limit is set.
#[derive(Debug, Clone)]
pub struct ScriptedCapturer {
    frame: RawFrame,
    cursor: Option<CursorImage>,
    fail_after: Option<usize>,
    captures: usize,
}

impl ScriptedCapturer {
    /// A capturer whose every frame is `width × height` pixels of `pixel`.
    pub fn solid(width: u32, height: u32, pixel: u32) -> Self {
        Self {
            frame: RawFrame::filled(width, height, pixel),
            cursor: None,
            fail_after: None,
            captures: 0,
        }
    }

    pub fn with_cursor(mut self, cursor: CursorImage) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Succeeds `successes` times, then returns [`CaptureError::NoImage`].
    pub fn fail_after(mut self, successes: usize) -> Self {
        self.fail_after = Some(successes);
        self
    }
}

impl ScreenCapturer for ScriptedCapturer {
    fn capture(&mut self) -> Result<CapturedScreen, CaptureError> {
        if self.fail_after.is_some_and(|limit| self.captures >= limit) {
            return Err(CaptureError::NoImage);
        }
        self.captures += 1;
        Ok(CapturedScreen {
            frame: self.frame.clone(),
            cursor: self.cursor.clone(),
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.frame.width(), self.frame.height())
    }
}

// ── FixedSizeEncoder ──────────────────────────────────────────────────────────

/// Produces `size` bytes per frame, each byte equal to the quality level.
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeEncoder {
    size: usize,
}

impl FixedSizeEncoder {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl FrameEncoder for FixedSizeEncoder {
    fn encode(&self, _frame: &RawFrame, quality: u8) -> Result<Vec<u8>, EncodeError> {
        Ok(vec![quality; self.size])
    }
}
