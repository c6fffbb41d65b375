//! Integration tests for the viewer control grammar.
//!
//! These tests drive the parser through the public API together with the
//! key table and the session parameters, the same way the server's control
//! channel combines them.

use screen_relay_core::{
    keymap::KeyMapper, parse_control_message, ControlCommand, ControlParseError, Keysym,
    PointerButton, SessionControl, SessionParams,
};

/// Applies the parameter commands of `messages` to a fresh session and
/// returns the resulting parameters.  Everything else is ignored.
fn apply(messages: &[&str]) -> SessionParams {
    let control = SessionControl::new(SessionParams::default()).expect("defaults are valid");
    for msg in messages {
        match parse_control_message(msg) {
            Ok(ControlCommand::SetSizeBudget { kib }) => {
                control.set_size_budget_kib(kib).expect("parser rejects zero");
            }
            Ok(ControlCommand::SetTargetFps { fps }) => {
                control.set_target_fps(fps).expect("parser rejects zero");
            }
            _ => {}
        }
    }
    control.params()
}

#[test]
fn test_budget_command_sets_bytes() {
    assert_eq!(apply(&["q 80"]).size_budget_bytes, 81_920);
}

#[test]
fn test_fps_command_sets_target() {
    assert_eq!(apply(&["f 30"]).target_fps, 30);
}

#[test]
fn test_garbage_leaves_parameters_untouched() {
    let params = apply(&["x garbage", "q", "f abc", "q 0", "", "2+"]);
    assert_eq!(params, SessionParams::default());
}

#[test]
fn test_last_parameter_command_wins() {
    let params = apply(&["f 10", "q 20", "f 45", "q 100"]);
    assert_eq!(params.target_fps, 45);
    assert_eq!(params.size_budget_bytes, 102_400);
}

#[test]
fn test_key_commands_resolve_through_key_table() {
    let press = parse_control_message("2+1+KeyA").unwrap();
    let release = parse_control_message("2+0+KeyA").unwrap();

    let (ControlCommand::Key { code: c1, pressed: p1 }, ControlCommand::Key { code: c2, pressed: p2 }) =
        (press, release)
    else {
        panic!("expected two key commands");
    };

    assert!(p1);
    assert!(!p2);
    assert_eq!(KeyMapper::dom_code_to_keysym(&c1), Some(Keysym(0x0061)));
    assert_eq!(KeyMapper::dom_code_to_keysym(&c2), Some(Keysym(0x0061)));
}

#[test]
fn test_unmapped_key_parses_but_has_no_keysym() {
    let cmd = parse_control_message("2+1+LaunchApp2").unwrap();
    let ControlCommand::Key { code, .. } = cmd else {
        panic!("expected a key command");
    };
    assert_eq!(KeyMapper::dom_code_to_keysym(&code), None);
}

#[test]
fn test_pointer_commands() {
    assert_eq!(
        parse_control_message("1+100+200").unwrap(),
        ControlCommand::PointerMove { x: 100, y: 200 }
    );
    assert_eq!(
        parse_control_message("3+1+1").unwrap(),
        ControlCommand::PointerButton {
            button: PointerButton::Primary,
            pressed: true,
        }
    );
}

#[test]
fn test_errors_render_readable_messages() {
    let err = parse_control_message("f -1").unwrap_err();
    assert_eq!(err, ControlParseError::NonPositive("fps"));
    assert_eq!(err.to_string(), "field `fps` must be at least 1");
}
