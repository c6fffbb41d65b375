//! Input injection via the XTest extension.
//!
//! `XTestFakeKeyEvent` takes an X11 *keycode*, not a KeySym, so each key goes
//! through the server's current keyboard mapping first:
//!
//! ```text
//! KeyboardEvent.code → KeySym (screen_relay_core::keymap) → XKeysymToKeycode → XTest
//! ```
//!
//! A KeySym with no keycode on the current layout is dropped with a debug log.
//!
//! # Single-window captures
//!
//! When one window is captured, key events first move the input focus to it
//! and pointer motion is an absolute warp inside it.  On a full-display
//! capture, motion is relative to the current pointer position.
//!
//! Every request is followed by `XFlush` so the event reaches the server
//! before the next control message is read.

use std::sync::Arc;

use screen_relay_core::{Keysym, PointerButton};
use tracing::{debug, trace};
use x11::{xlib, xtest};

use super::X11Display;
use crate::application::gateways::InputInjector;

/// `CurrentTime`: let the server timestamp the synthesized event.
const CURRENT_TIME: xlib::Time = 0;

/// Injects keyboard and pointer input on the capture target.
pub struct XTestInputInjector {
    display: Arc<X11Display>,
    window: xlib::Window,
    is_root: bool,
}

impl XTestInputInjector {
    pub fn new(display: Arc<X11Display>, window: xlib::Window, is_root: bool) -> Self {
        Self {
            display,
            window,
            is_root,
        }
    }
}

impl InputInjector for XTestInputInjector {
    fn inject_key(&self, keysym: Keysym, pressed: bool) {
        let guard = self.display.lock();
        let dpy = guard.raw();

        // SAFETY: the display is locked for the whole sequence below.
        let keycode = unsafe { xlib::XKeysymToKeycode(dpy, xlib::KeySym::from(keysym.raw())) };
        if keycode == 0 {
            debug!("keysym {keysym:?} has no keycode on the current layout");
            return;
        }

        // SAFETY: still under the same lock; all arguments are plain values.
        unsafe {
            if !self.is_root {
                xlib::XSetInputFocus(dpy, self.window, xlib::RevertToParent, CURRENT_TIME);
            }
            xtest::XTestFakeKeyEvent(
                dpy,
                u32::from(keycode),
                i32::from(pressed),
                CURRENT_TIME,
            );
            xlib::XFlush(dpy);
        }
        trace!("key {keysym:?} (keycode {keycode}) pressed={pressed}");
    }

    fn inject_motion(&self, x: i32, y: i32) {
        let guard = self.display.lock();
        let dpy = guard.raw();

        // SAFETY: the display is locked; both calls only take plain values.
        unsafe {
            if self.is_root {
                xtest::XTestFakeRelativeMotionEvent(dpy, x, y, CURRENT_TIME);
            } else {
                xlib::XWarpPointer(dpy, 0, self.window, 0, 0, 0, 0, x, y);
            }
            xlib::XFlush(dpy);
        }
        trace!("pointer motion ({x}, {y})");
    }

    fn inject_button(&self, button: PointerButton, pressed: bool) {
        let guard = self.display.lock();
        let dpy = guard.raw();

        // SAFETY: the display is locked.
        unsafe {
            xtest::XTestFakeButtonEvent(dpy, button.x11_button(), i32::from(pressed), CURRENT_TIME);
            xlib::XFlush(dpy);
        }
        trace!("button {button:?} pressed={pressed}");
    }
}
