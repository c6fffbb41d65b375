//! Symbolic key code translation for viewer key events.
//!
//! Viewers send browser `KeyboardEvent.code` strings (`"KeyA"`,
//! `"ShiftLeft"`, `"ArrowUp"`, …).  These name *physical key positions*, not
//! characters, so the same string arrives regardless of the viewer's keyboard
//! layout.  The injection gateway needs an X11 KeySym instead.
//!
//! The lookup table is a static slice ([`linux_x11::DOM_CODE_KEYSYMS`])
//! turned into a `HashMap` the first time it is used and shared read-only
//! afterwards.  Codes outside the table have no mapping and the key event is
//! dropped by the caller.

pub mod linux_x11;

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// An X11 KeySym value (see `X11/keysymdef.h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keysym(pub u32);

impl Keysym {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Unified key mapper.
pub struct KeyMapper;

impl KeyMapper {
    /// Translates a DOM `KeyboardEvent.code` string to an X11 KeySym.
    ///
    /// Lookup is case-sensitive.  Returns `None` for codes outside the table.
    pub fn dom_code_to_keysym(code: &str) -> Option<Keysym> {
        table().get(code).copied()
    }

    /// Number of symbolic codes with a mapping.
    pub fn mapped_code_count() -> usize {
        table().len()
    }
}

fn table() -> &'static HashMap<&'static str, Keysym> {
    static TABLE: OnceLock<HashMap<&'static str, Keysym>> = OnceLock::new();
    TABLE.get_or_init(|| {
        linux_x11::DOM_CODE_KEYSYMS
            .iter()
            .map(|&(code, keysym)| (code, Keysym(keysym)))
            .collect()
    })
}
