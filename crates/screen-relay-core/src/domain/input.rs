//! Input events synthesized on the captured surface.
//!
//! An [`InputEvent`] is built from one parsed control message and handed to
//! the injection gateway straight away; it is never stored.

use crate::keymap::Keysym;

/// Pointer button named by a viewer.
///
/// The wire protocol only names two buttons.  Any other button code is kept
/// as [`PointerButton::Unassigned`] and injected as X11 button 0 rather than
/// being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Unassigned,
}

impl PointerButton {
    /// Maps a wire button code: `1` → primary, `0` → secondary.
    pub fn from_wire(code: i32) -> Self {
        match code {
            1 => PointerButton::Primary,
            0 => PointerButton::Secondary,
            _ => PointerButton::Unassigned,
        }
    }

    /// X11 core protocol button number (1 = left, 3 = right).
    pub fn x11_button(self) -> u32 {
        match self {
            PointerButton::Primary => 1,
            PointerButton::Secondary => 3,
            PointerButton::Unassigned => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key { keysym: Keysym, pressed: bool },
    /// Relative motion on a full-display capture, absolute position inside
    /// the window on a single-window capture.
    PointerMove { x: i32, y: i32 },
    PointerButton { button: PointerButton, pressed: bool },
}
