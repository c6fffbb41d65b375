//! Domain layer for screen-relay-server.
//!
//! Pure configuration types with no dependencies on X11, sockets or the async
//! runtime.  The frame pipeline's own domain types (frames, session
//! parameters, mailbox, registry) live in `screen-relay-core` and are shared
//! with anything else that needs to speak the pipeline's language.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or `WebSocket` types
//! - X11 handles or FFI calls
//! - Command-line parsing (that is done in `main.rs`)

pub mod config;

pub use config::{CaptureTarget, ConfigError, FileConfig, ServerConfig};
