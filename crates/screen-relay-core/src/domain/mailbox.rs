//! Single-slot, latest-frame-wins hand-off between capture and broadcast.
//!
//! The mailbox never queues: publishing replaces whatever is there, read or
//! not.  Viewers only want the current state of the screen, so a frame that
//! was overwritten before anyone read it is simply gone and a slow broadcast
//! never slows capture down.
//!
//! The lock is held only for the reference swap or clone (O(1), since
//! [`Frame`] clones share their bytes), never across capture, encode, or
//! network work.

use std::sync::{Mutex, PoisonError};

use super::frame::Frame;

/// The most recent encoded frame, or nothing before the first publish.
#[derive(Debug, Default)]
pub struct FrameMailbox {
    slot: Mutex<Option<Frame>>,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current content unconditionally.
    pub fn publish(&self, frame: Frame) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(frame);
    }

    /// The current content, or `None` if nothing was ever published.
    pub fn latest(&self) -> Option<Frame> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
