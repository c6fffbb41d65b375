//! DOM `KeyboardEvent.code` to X11 KeySym table.
//!
//! X11 KeySym values are defined in X11/keysymdef.h.
//! Reference: https://gitlab.freedesktop.org/xorg/proto/xorgproto/-/blob/master/include/X11/keysymdef.h
//!
//! # Why lowercase letter KeySyms?
//!
//! Letter keys map to their *lowercase* KeySym (`XK_a` = 0x0061, not
//! `XK_A` = 0x0041).  The injection gateway converts the KeySym to a hardware
//! keycode with `XKeysymToKeycode`, and both cases live on the same physical
//! key; a Shift held by the viewer arrives as its own key event.

/// `(DOM code, X11 KeySym)` pairs.  Every DOM code appears at most once.
pub const DOM_CODE_KEYSYMS: &[(&str, u32)] = &[
    // Letters
    ("KeyA", 0x0061), // XK_a
    ("KeyB", 0x0062), // XK_b
    ("KeyC", 0x0063), // XK_c
    ("KeyD", 0x0064), // XK_d
    ("KeyE", 0x0065), // XK_e
    ("KeyF", 0x0066), // XK_f
    ("KeyG", 0x0067), // XK_g
    ("KeyH", 0x0068), // XK_h
    ("KeyI", 0x0069), // XK_i
    ("KeyJ", 0x006A), // XK_j
    ("KeyK", 0x006B), // XK_k
    ("KeyL", 0x006C), // XK_l
    ("KeyM", 0x006D), // XK_m
    ("KeyN", 0x006E), // XK_n
    ("KeyO", 0x006F), // XK_o
    ("KeyP", 0x0070), // XK_p
    ("KeyQ", 0x0071), // XK_q
    ("KeyR", 0x0072), // XK_r
    ("KeyS", 0x0073), // XK_s
    ("KeyT", 0x0074), // XK_t
    ("KeyU", 0x0075), // XK_u
    ("KeyV", 0x0076), // XK_v
    ("KeyW", 0x0077), // XK_w
    ("KeyX", 0x0078), // XK_x
    ("KeyY", 0x0079), // XK_y
    ("KeyZ", 0x007A), // XK_z
    // Digits
    ("Digit0", 0x0030), // XK_0
    ("Digit1", 0x0031), // XK_1
    ("Digit2", 0x0032), // XK_2
    ("Digit3", 0x0033), // XK_3
    ("Digit4", 0x0034), // XK_4
    ("Digit5", 0x0035), // XK_5
    ("Digit6", 0x0036), // XK_6
    ("Digit7", 0x0037), // XK_7
    ("Digit8", 0x0038), // XK_8
    ("Digit9", 0x0039), // XK_9
    // Function keys
    ("F1", 0xFFBE),  // XK_F1
    ("F2", 0xFFBF),  // XK_F2
    ("F3", 0xFFC0),  // XK_F3
    ("F4", 0xFFC1),  // XK_F4
    ("F5", 0xFFC2),  // XK_F5
    ("F6", 0xFFC3),  // XK_F6
    ("F7", 0xFFC4),  // XK_F7
    ("F8", 0xFFC5),  // XK_F8
    ("F9", 0xFFC6),  // XK_F9
    ("F10", 0xFFC7), // XK_F10
    ("F11", 0xFFC8), // XK_F11
    ("F12", 0xFFC9), // XK_F12
    // Control keys
    ("Enter", 0xFF0D),     // XK_Return
    ("Space", 0x0020),     // XK_space
    ("Backspace", 0xFF08), // XK_BackSpace
    ("Tab", 0xFF09),       // XK_Tab
    ("Escape", 0xFF1B),    // XK_Escape
    ("CapsLock", 0xFFE5),  // XK_Caps_Lock
    ("ContextMenu", 0xFF67), // XK_Menu
    // Modifiers
    ("ShiftLeft", 0xFFE1),    // XK_Shift_L
    ("ShiftRight", 0xFFE2),   // XK_Shift_R
    ("ControlLeft", 0xFFE3),  // XK_Control_L
    ("ControlRight", 0xFFE4), // XK_Control_R
    ("AltLeft", 0xFFE9),      // XK_Alt_L
    ("AltRight", 0xFFEA),     // XK_Alt_R
    ("MetaLeft", 0xFFEB),     // XK_Super_L
    ("MetaRight", 0xFFEC),    // XK_Super_R
    // Arrows
    ("ArrowLeft", 0xFF51),  // XK_Left
    ("ArrowUp", 0xFF52),    // XK_Up
    ("ArrowRight", 0xFF53), // XK_Right
    ("ArrowDown", 0xFF54),  // XK_Down
    // Punctuation
    ("Minus", 0x002D),         // XK_minus
    ("Equal", 0x003D),         // XK_equal
    ("BracketLeft", 0x005B),   // XK_bracketleft
    ("BracketRight", 0x005D),  // XK_bracketright
    ("Backslash", 0x005C),     // XK_backslash
    ("Semicolon", 0x003B),     // XK_semicolon
    ("Quote", 0x0027),         // XK_apostrophe
    ("Backquote", 0x0060),     // XK_grave
    ("Comma", 0x002C),         // XK_comma
    ("Period", 0x002E),        // XK_period
    ("Slash", 0x002F),         // XK_slash
    ("IntlBackslash", 0x003C), // XK_less
    // Navigation and locks
    ("Insert", 0xFF63),      // XK_Insert
    ("Delete", 0xFFFF),      // XK_Delete
    ("Home", 0xFF50),        // XK_Home
    ("End", 0xFF57),         // XK_End
    ("PageUp", 0xFF55),      // XK_Page_Up
    ("PageDown", 0xFF56),    // XK_Page_Down
    ("NumLock", 0xFF7F),     // XK_Num_Lock
    ("ScrollLock", 0xFF14),  // XK_Scroll_Lock
    ("Pause", 0xFF13),       // XK_Pause
    ("PrintScreen", 0xFF61), // XK_Print
    // Numpad
    ("NumpadDivide", 0xFFAF),   // XK_KP_Divide
    ("NumpadMultiply", 0xFFAA), // XK_KP_Multiply
    ("NumpadSubtract", 0xFFAD), // XK_KP_Subtract
    ("NumpadAdd", 0xFFAB),      // XK_KP_Add
    ("NumpadEnter", 0xFF8D),    // XK_KP_Enter
    ("NumpadDecimal", 0xFFAE),  // XK_KP_Decimal
    ("Numpad0", 0xFFB0),        // XK_KP_0
    ("Numpad1", 0xFFB1),        // XK_KP_1
    ("Numpad2", 0xFFB2),        // XK_KP_2
    ("Numpad3", 0xFFB3),        // XK_KP_3
    ("Numpad4", 0xFFB4),        // XK_KP_4
    ("Numpad5", 0xFFB5),        // XK_KP_5
    ("Numpad6", 0xFFB6),        // XK_KP_6
    ("Numpad7", 0xFFB7),        // XK_KP_7
    ("Numpad8", 0xFFB8),        // XK_KP_8
    ("Numpad9", 0xFFB9),        // XK_KP_9
];
