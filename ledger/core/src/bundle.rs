use crate::milestone::MilestoneIndex;
use serde::{Deserialize, Serialize};
use tangle_hashes::MessageId;

/// A group of messages forming one logical transfer. Milestone checkpoints are
/// issued as bundles, which is why the pruning engine must consult bundle
/// membership before it discards an unconfirmed message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    messages: Vec<MessageId>,
    milestone: Option<MilestoneIndex>,
}

impl Bundle {
    pub fn new(messages: Vec<MessageId>, milestone: Option<MilestoneIndex>) -> Self {
        Self { messages, milestone }
    }

    pub fn messages(&self) -> &[MessageId] {
        &self.messages
    }

    pub fn is_milestone(&self) -> bool {
        self.milestone.is_some()
    }

    pub fn milestone_index(&self) -> Option<MilestoneIndex> {
        self.milestone
    }
}
