//! Gateway traits: the seams between the pipeline and the outside world.
//!
//! The capture loop, broadcast loop and control channel never call X11, the
//! JPEG codec or the network directly.  They talk to these three traits, and
//! the infrastructure layer provides the implementations:
//!
//! | Trait              | Production                     | Tests                 |
//! |--------------------|--------------------------------|-----------------------|
//! | [`ScreenCapturer`] | `X11ScreenCapturer`            | `ScriptedCapturer`    |
//! | [`FrameEncoder`]   | `JpegFrameEncoder`             | `FixedSizeEncoder`    |
//! | [`InputInjector`]  | `XTestInputInjector`           | `MockInputInjector`   |
//!
//! # Error contract
//!
//! Capture and encode return `Result` so the capture loop can count and log a
//! failed cycle and move on.  Injection is fire-and-forget: the methods return
//! nothing and an implementation logs its own failures.  Nothing a gateway
//! does at steady state may take down the session.

use screen_relay_core::{CursorImage, InputEvent, Keysym, PointerButton, RawFrame};
use thiserror::Error;

/// Why a capture cycle produced no image.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture primitive returned nothing (window unmapped, resized
    /// off-screen, display grabbed, ...).
    #[error("capture primitive returned no image")]
    NoImage,

    /// The primitive returned an image this gateway cannot convert.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Why an encode call failed.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame has zero width or height")]
    EmptyFrame,

    #[error("encoder failed: {0}")]
    Codec(String),
}

/// One capture: the raw pixels plus the pointer image, if the primitive
/// could provide one.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedScreen {
    pub frame: RawFrame,
    pub cursor: Option<CursorImage>,
}

/// Rasterizes the capture target.
///
/// The capture loop owns its capturer exclusively, hence `&mut self`.
pub trait ScreenCapturer: Send {
    /// Captures one frame.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] when the primitive fails; the cycle is skipped.
    fn capture(&mut self) -> Result<CapturedScreen, CaptureError>;

    /// Width and height of every frame this capturer produces.  Fixed for the
    /// life of the session.
    fn dimensions(&self) -> (u32, u32);
}

/// Compresses raw frames.
///
/// Implementations must be deterministic: the same frame at the same quality
/// yields the same bytes.
#[cfg_attr(test, mockall::automock)]
pub trait FrameEncoder: Send {
    /// Encodes `frame` at `quality` (1 = smallest, 100 = best).
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the codec rejects the frame.
    fn encode(&self, frame: &RawFrame, quality: u8) -> Result<Vec<u8>, EncodeError>;
}

/// Synthesizes input on the capture target.
///
/// Shared by every viewer connection, hence `Send + Sync` and `&self`.
pub trait InputInjector: Send + Sync {
    fn inject_key(&self, keysym: Keysym, pressed: bool);

    /// Relative motion on a full-display capture; an absolute position
    /// inside the window on a single-window capture.
    fn inject_motion(&self, x: i32, y: i32);

    fn inject_button(&self, button: PointerButton, pressed: bool);

    /// Routes an [`InputEvent`] to the matching method.
    fn inject(&self, event: &InputEvent) {
        match *event {
            InputEvent::Key { keysym, pressed } => self.inject_key(keysym, pressed),
            InputEvent::PointerMove { x, y } => self.inject_motion(x, y),
            InputEvent::PointerButton { button, pressed } => self.inject_button(button, pressed),
        }
    }
}
