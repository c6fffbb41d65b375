//! Infrastructure layer: every adapter that touches the OS, a codec or the
//! network.
//!
//! # Responsibilities
//!
//! - Binding the WebSocket listener and running one task per viewer
//! - Capturing the X11 display and its pointer image (Linux only)
//! - Injecting keyboard and pointer input through XTest (Linux only)
//! - JPEG-encoding raw frames
//! - In-memory replacements for all of the above, for tests
//!
//! # What does NOT belong here?
//!
//! - Pacing, quality control and fan-out (that is the application layer)
//! - The control grammar and the key table (that is `screen-relay-core`)
//! - CLI parsing (that is done in `main.rs`)

pub mod jpeg;
pub mod mock;
pub mod ws_server;

#[cfg(target_os = "linux")]
pub mod x11;

pub use jpeg::JpegFrameEncoder;
pub use ws_server::{bind_listener, run_server, serve, WebSocketViewer};
