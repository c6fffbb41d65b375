//! screen-relay-server library crate.
//!
//! Streams one X11 display (or one window of it) to any number of browser
//! viewers over WebSocket, and lets those viewers tune the stream and drive
//! the keyboard and pointer.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser viewers (binary JPEG frames ↓, text commands ↑)
//!         ↕
//! [screen-relay-server]
//!   ├── domain/           ServerConfig: defaults, TOML file, validation
//!   ├── application/      Capture loop, broadcast loop, control channel,
//!   │                     diagnostics, StreamingSession
//!   └── infrastructure/
//!         ├── ws_server/  WebSocket accept loop (tokio-tungstenite)
//!         ├── x11/        XGetImage + XFixes capture, XTest injection
//!         ├── jpeg/       JPEG encoder (image crate)
//!         └── mock/       In-memory gateways for tests
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O beyond reading its own config file.
//! - `application` depends on `domain` and `screen-relay-core` only, and
//!   reaches the outside world through the traits in `application::gateways`.
//! - `infrastructure` implements those traits with X11, `image` and `tokio`.

/// Domain layer: server configuration.
pub mod domain;

/// Application layer: the streaming pipeline.
pub mod application;

/// Infrastructure layer: transport, X11, JPEG and test gateways.
pub mod infrastructure;
