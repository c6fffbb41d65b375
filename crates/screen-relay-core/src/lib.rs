//! # screen-relay-core
//!
//! Shared library for Screen-Relay containing the frame pipeline's domain
//! types, the adaptive quality controller, the viewer control grammar, and
//! the symbolic key translation table.
//!
//! This crate has zero dependencies on OS APIs, image codecs, or network
//! sockets.  The server crate plugs the X11 capture / injection primitives,
//! the JPEG encoder, and the WebSocket transport in around it.
//!
//! # Architecture overview (for beginners)
//!
//! Screen-Relay continuously captures a display, compresses every frame so
//! that it stays under a size budget, and streams the result to any number of
//! browser viewers.  Viewers send short text commands back to tune the stream
//! or to press keys and move the pointer on the captured display.
//!
//! ```text
//! capture ─► composite cursor ─► encode ─► quality control
//!                                              │
//!                                              ▼
//!                                        FrameMailbox  (latest frame wins)
//!                                              │
//!                                              ▼
//!                     broadcast ─► ClientRegistry snapshot ─► viewers
//! ```
//!
//! - **`domain`** – Frames, cursor compositing, the quality controller,
//!   session parameters with their interruptible pacing wait, the frame
//!   mailbox, the client registry, and input events.
//!
//! - **`protocol`** – The viewer → server control grammar (`q 80`, `f 30`,
//!   `2+1+KeyA`, `1+100+200`, `3+1+1`).
//!
//! - **`keymap`** – The static table from browser `KeyboardEvent.code`
//!   strings to X11 KeySyms.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::frame::{CursorImage, Frame, RawFrame};
pub use domain::input::{InputEvent, PointerButton};
pub use domain::mailbox::FrameMailbox;
pub use domain::quality::{QualityAdjustment, QualityController};
pub use domain::registry::{ClientRegistry, DeliveryError, ViewerId, ViewerSink};
pub use domain::session::{Cadence, SessionControl, SessionError, SessionParams, Tick};
pub use keymap::Keysym;
pub use protocol::control::{parse_control_message, ControlCommand, ControlParseError};
