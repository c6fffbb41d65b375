//! Domain layer: the pipeline's data model with no I/O.
//!
//! Every type here is shared between the capture thread, the broadcast
//! thread, and the per-viewer transport tasks, so each shared cell documents
//! its locking discipline next to its definition.

pub mod frame;
pub mod input;
pub mod mailbox;
pub mod quality;
pub mod registry;
pub mod session;
