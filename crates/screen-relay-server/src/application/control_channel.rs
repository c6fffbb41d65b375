//! Control channel: turns viewer text messages into side effects.
//!
//! Parameter commands (`q`, `f`) go to [`SessionControl`], which wakes the
//! pacing waits.  Input commands become an [`InputEvent`] and go straight to
//! the [`InputInjector`].
//!
//! The channel is best-effort.  A malformed or unknown message, or a key code
//! with no KeySym, is logged at debug level and dropped; the sender is never
//! told and the session carries on.

use std::sync::Arc;

use screen_relay_core::keymap::KeyMapper;
use screen_relay_core::{parse_control_message, ControlCommand, InputEvent, SessionControl};
use tracing::debug;

use super::gateways::InputInjector;

/// What [`ControlChannel::handle_message`] did with one message.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A session parameter changed.
    ParameterChanged,
    /// The event was handed to the injector.
    Injected(InputEvent),
    /// A well-formed key message whose code has no KeySym.
    UnmappedKey(String),
    /// Malformed, unknown, or rejected; nothing happened.
    Ignored,
}

/// Dispatcher shared by every viewer connection.
pub struct ControlChannel {
    control: Arc<SessionControl>,
    injector: Arc<dyn InputInjector>,
}

impl ControlChannel {
    pub fn new(control: Arc<SessionControl>, injector: Arc<dyn InputInjector>) -> Self {
        Self { control, injector }
    }

    /// Parses and dispatches one inbound text message.
    pub fn handle_message(&self, msg: &str) -> DispatchOutcome {
        let command = match parse_control_message(msg) {
            Ok(command) => command,
            Err(e) => {
                debug!("ignoring control message {msg:?}: {e}");
                return DispatchOutcome::Ignored;
            }
        };

        let event = match command {
            ControlCommand::SetSizeBudget { kib } => {
                return self.parameter_result(self.control.set_size_budget_kib(kib));
            }
            ControlCommand::SetTargetFps { fps } => {
                return self.parameter_result(self.control.set_target_fps(fps));
            }
            ControlCommand::Key { code, pressed } => match KeyMapper::dom_code_to_keysym(&code) {
                Some(keysym) => InputEvent::Key { keysym, pressed },
                None => {
                    debug!("no KeySym for key code {code:?}");
                    return DispatchOutcome::UnmappedKey(code);
                }
            },
            ControlCommand::PointerMove { x, y } => InputEvent::PointerMove { x, y },
            ControlCommand::PointerButton { button, pressed } => {
                InputEvent::PointerButton { button, pressed }
            }
        };

        self.injector.inject(&event);
        DispatchOutcome::Injected(event)
    }

    fn parameter_result(
        &self,
        result: Result<(), screen_relay_core::SessionError>,
    ) -> DispatchOutcome {
        match result {
            Ok(()) => DispatchOutcome::ParameterChanged,
            Err(e) => {
                debug!("rejected parameter change: {e}");
                DispatchOutcome::Ignored
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::{InjectedInput, MockInputInjector};
    use screen_relay_core::{Keysym, PointerButton, SessionParams};

    fn channel() -> (ControlChannel, Arc<SessionControl>, Arc<MockInputInjector>) {
        let control = Arc::new(SessionControl::new(SessionParams::default()).unwrap());
        let injector = Arc::new(MockInputInjector::new());
        let channel = ControlChannel::new(Arc::clone(&control), injector.clone());
        (channel, control, injector)
    }

    #[test]
    fn test_budget_message_updates_session() {
        let (channel, control, injector) = channel();

        assert_eq!(
            channel.handle_message("q 80"),
            DispatchOutcome::ParameterChanged
        );
        assert_eq!(control.params().size_budget_bytes, 81_920);
        assert!(injector.events().is_empty());
    }

    #[test]
    fn test_fps_message_updates_session() {
        let (channel, control, _) = channel();
        channel.handle_message("f 30");
        assert_eq!(control.params().target_fps, 30);
    }

    #[test]
    fn test_key_press_then_release_in_order() {
        // Arrange
        let (channel, _, injector) = channel();

        // Act
        channel.handle_message("2+1+KeyA");
        channel.handle_message("2+0+KeyA");

        // Assert
        assert_eq!(
            injector.events(),
            vec![
                InjectedInput::Key(Keysym(0x0061), true),
                InjectedInput::Key(Keysym(0x0061), false),
            ]
        );
    }

    #[test]
    fn test_unmapped_key_never_reaches_injector() {
        let (channel, _, injector) = channel();

        let outcome = channel.handle_message("2+1+LaunchMail");

        assert_eq!(outcome, DispatchOutcome::UnmappedKey("LaunchMail".into()));
        assert!(injector.events().is_empty());
    }

    #[test]
    fn test_pointer_move_and_button() {
        let (channel, _, injector) = channel();

        channel.handle_message("1+100+200");
        channel.handle_message("3+1+1");

        assert_eq!(
            injector.events(),
            vec![
                InjectedInput::Motion(100, 200),
                InjectedInput::Button(PointerButton::Primary, true),
            ]
        );
    }

    #[test]
    fn test_garbage_has_no_side_effect() {
        // Arrange
        let (channel, control, injector) = channel();
        let before = control.params();

        // Act
        let outcomes: Vec<_> = ["x garbage", "q abc", "f 0", "2+", "1+1", "3+x+1", ""]
            .iter()
            .map(|m| channel.handle_message(m))
            .collect();

        // Assert
        assert!(outcomes.iter().all(|o| *o == DispatchOutcome::Ignored));
        assert_eq!(control.params(), before);
        assert!(injector.events().is_empty());
    }
}
