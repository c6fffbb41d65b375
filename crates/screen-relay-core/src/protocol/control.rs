//! Text grammar of the viewer → server control channel.
//!
//! Every inbound WebSocket text message is one command, classified by a
//! case-sensitive literal prefix:
//!
//! ```text
//! q <kib>                 set size budget to kib × 1024 bytes
//! f <fps>                 set target frame rate
//! 2+<1|0>+<code>          key press (1) / release (0) of a DOM KeyboardEvent.code
//! 1+<x>+<y>               pointer move
//! 3+<1|0>+<button>        pointer button press / release; 1 = primary, 0 = secondary
//! ```
//!
//! Parsing is pure: it never looks the key code up and never touches session
//! state.  The caller decides what to do with a [`ControlParseError`]; the
//! server drops such messages silently.

use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::input::PointerButton;

/// A parsed control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// `q N`: size budget in KiB.
    SetSizeBudget { kib: u32 },
    /// `f N`: broadcast frame rate.
    SetTargetFps { fps: u32 },
    /// `2+P+CODE`: symbolic key event.
    Key { code: String, pressed: bool },
    /// `1+X+Y`: pointer motion.
    PointerMove { x: i32, y: i32 },
    /// `3+P+B`: pointer button event.
    PointerButton { button: PointerButton, pressed: bool },
}

/// Why a control message was not understood.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlParseError {
    #[error("unknown control message prefix in {0:?}")]
    UnknownPrefix(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a valid integer: {source}")]
    InvalidNumber {
        field: &'static str,
        #[source]
        source: ParseIntError,
    },

    #[error("press flag must be `1` or `0`, got {0:?}")]
    InvalidPressFlag(String),

    #[error("field `{0}` must be at least 1")]
    NonPositive(&'static str),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parses one control message.
///
/// # Errors
///
/// Returns [`ControlParseError`] for an unknown prefix, a missing field, a
/// non-numeric field, a press flag other than `1`/`0`, or a zero budget / FPS.
///
/// # Examples
///
/// ```rust
/// use screen_relay_core::{parse_control_message, ControlCommand};
///
/// assert_eq!(
///     parse_control_message("q 80").unwrap(),
///     ControlCommand::SetSizeBudget { kib: 80 }
/// );
/// assert!(parse_control_message("x garbage").is_err());
/// ```
pub fn parse_control_message(msg: &str) -> Result<ControlCommand, ControlParseError> {
    if let Some(rest) = msg.strip_prefix("q ") {
        let kib = parse_positive(rest, "kib")?;
        Ok(ControlCommand::SetSizeBudget { kib })
    } else if let Some(rest) = msg.strip_prefix("f ") {
        let fps = parse_positive(rest, "fps")?;
        Ok(ControlCommand::SetTargetFps { fps })
    } else if let Some(rest) = msg.strip_prefix("2+") {
        let mut fields = rest.split('+');
        let pressed = parse_press_flag(fields.next())?;
        let code = fields
            .next()
            .filter(|c| !c.is_empty())
            .ok_or(ControlParseError::MissingField("code"))?;
        Ok(ControlCommand::Key {
            code: code.to_string(),
            pressed,
        })
    } else if let Some(rest) = msg.strip_prefix("1+") {
        let mut fields = rest.split('+');
        let x = parse_int(fields.next(), "x")?;
        let y = parse_int(fields.next(), "y")?;
        Ok(ControlCommand::PointerMove { x, y })
    } else if let Some(rest) = msg.strip_prefix("3+") {
        let mut fields = rest.split('+');
        let pressed = parse_press_flag(fields.next())?;
        let code = parse_int(fields.next(), "button")?;
        Ok(ControlCommand::PointerButton {
            button: PointerButton::from_wire(code),
            pressed,
        })
    } else {
        Err(ControlParseError::UnknownPrefix(msg.to_string()))
    }
}

impl FromStr for ControlCommand {
    type Err = ControlParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_control_message(s)
    }
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn parse_int(field: Option<&str>, name: &'static str) -> Result<i32, ControlParseError> {
    let raw = field
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or(ControlParseError::MissingField(name))?;
    raw.parse()
        .map_err(|source| ControlParseError::InvalidNumber { field: name, source })
}

fn parse_positive(raw: &str, name: &'static str) -> Result<u32, ControlParseError> {
    let value = parse_int(Some(raw), name)?;
    if value < 1 {
        return Err(ControlParseError::NonPositive(name));
    }
    // value >= 1, so the conversion is lossless.
    Ok(value.unsigned_abs())
}

fn parse_press_flag(field: Option<&str>) -> Result<bool, ControlParseError> {
    match field {
        Some("1") => Ok(true),
        Some("0") => Ok(false),
        Some("") | None => Err(ControlParseError::MissingField("pressed")),
        Some(other) => Err(ControlParseError::InvalidPressFlag(other.to_string())),
    }
}
