use serde::{Deserialize, Serialize};
use tangle_hashes::MessageId;

/// Index of a confirmed checkpoint in the DAG. Monotone and non-negative.
pub type MilestoneIndex = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub index: MilestoneIndex,
    pub message_id: MessageId,
    pub timestamp: u64,
}

impl Milestone {
    pub fn new(index: MilestoneIndex, message_id: MessageId, timestamp: u64) -> Self {
        Self { index, message_id, timestamp }
    }
}
