//! Application layer: the streaming pipeline.
//!
//! # What lives here?
//!
//! - **`gateways`** – Traits the pipeline drives (`ScreenCapturer`,
//!   `FrameEncoder`, `InputInjector`).  Implementations live in the
//!   infrastructure layer and are injected at construction time.
//!
//! - **`capture_loop`** – The producer thread: capture, cursor composite,
//!   encode, adaptive quality, publish.
//!
//! - **`broadcast_loop`** – The consumer thread: read the newest frame and
//!   fan it out to every registered viewer.
//!
//! - **`control_channel`** – Parses viewer text messages and dispatches them
//!   to the session parameters or the input injector.
//!
//! - **`diagnostics`** – Lock-free pipeline counters and the optional
//!   once-per-interval reporter.
//!
//! - **`session`** – `StreamingSession`, which owns and joins all of the above.

pub mod broadcast_loop;
pub mod capture_loop;
pub mod control_channel;
pub mod diagnostics;
pub mod gateways;
pub mod session;

pub use control_channel::{ControlChannel, DispatchOutcome};
pub use gateways::{
    CaptureError, CapturedScreen, EncodeError, FrameEncoder, InputInjector, ScreenCapturer,
};
pub use session::{DiagnosticsOptions, SessionGateways, SessionStartError, StreamingSession};
