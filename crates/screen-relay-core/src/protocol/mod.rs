//! Protocol module containing the viewer control grammar.

pub mod control;

pub use control::{parse_control_message, ControlCommand, ControlParseError};
