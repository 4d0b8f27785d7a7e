//! Block processing context

use serde::{Deserialize, Serialize};

/// Height and time of the block whose transactions are being applied.
///
/// Every timestamp the keeper writes comes from here, never from a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    /// Block time, unix nanos
    pub time: i64,
}

impl BlockContext {
    pub fn new(height: u64, time: i64) -> Self {
        Self { height, time }
    }
}
