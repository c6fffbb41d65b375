//! Closed-loop quality controller that keeps encoded frames under a budget.
//!
//! The controller is fed the size of every encoded frame *after* encoding and
//! adjusts the level used for the *next* frame:
//!
//! | Encoded size                          | Next quality            |
//! |---------------------------------------|-------------------------|
//! | `> budget`                            | `level - 5`, floor 1    |
//! | `< budget - 10 KiB`                   | `level + 5`, ceiling 100|
//! | anything in between (the dead zone)   | unchanged               |
//!
//! Without the 10 KiB dead zone a frame that lands right at the budget would
//! make the level hunt up and down every cycle.

/// Quality used for the very first frame of a session.
pub const INITIAL_QUALITY: u8 = 100;
/// Lowest quality the controller will ever select.
pub const MIN_QUALITY: u8 = 1;
/// Highest quality the controller will ever select.
pub const MAX_QUALITY: u8 = 100;
/// Amount the level moves by in one adjustment.
pub const QUALITY_STEP: u8 = 5;
/// Width of the dead zone below the budget.
pub const BUDGET_SLACK_BYTES: usize = 10 * 1024;

/// What [`QualityController::observe`] did to the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityAdjustment {
    Lowered,
    Raised,
    Held,
}

/// Stateful quality level in `[MIN_QUALITY, MAX_QUALITY]`.
///
/// Owned by the capture loop for the life of a session; FPS or budget
/// changes do not reset it.
#[derive(Debug, Clone)]
pub struct QualityController {
    level: u8,
}

impl QualityController {
    /// Starts at [`INITIAL_QUALITY`].
    pub fn new() -> Self {
        Self {
            level: INITIAL_QUALITY,
        }
    }

    /// Current level, to be passed to the encoder for the next frame.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Feeds back the size of the frame that was just encoded.
    pub fn observe(&mut self, encoded_len: usize, budget_bytes: usize) -> QualityAdjustment {
        if encoded_len > budget_bytes {
            let next = self.level.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
            self.level = next;
            QualityAdjustment::Lowered
        } else if encoded_len < budget_bytes.saturating_sub(BUDGET_SLACK_BYTES) {
            let next = self.level.saturating_add(QUALITY_STEP).min(MAX_QUALITY);
            self.level = next;
            QualityAdjustment::Raised
        } else {
            QualityAdjustment::Held
        }
    }
}

impl Default for QualityController {
    fn default() -> Self {
        Self::new()
    }
}
