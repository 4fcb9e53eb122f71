use crate::milestone::MilestoneIndex;
use serde::{Deserialize, Serialize};
use tangle_hashes::MessageId;

/// Process-wide snapshot/pruning state.
///
/// Quiescent invariant: `pruning_index <= entry_point_index <= snapshot_index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Newest fully snapshotted milestone.
    pub snapshot_index: MilestoneIndex,
    /// Last milestone whose cone has been deleted.
    pub pruning_index: MilestoneIndex,
    /// Index up to which solid entry points have been recomputed.
    pub entry_point_index: MilestoneIndex,
}

impl SnapshotInfo {
    pub fn new(snapshot_index: MilestoneIndex, pruning_index: MilestoneIndex, entry_point_index: MilestoneIndex) -> Self {
        Self { snapshot_index, pruning_index, entry_point_index }
    }

    pub fn is_ordered(&self) -> bool {
        self.pruning_index <= self.entry_point_index && self.entry_point_index <= self.snapshot_index
    }
}

/// A node just outside the pruning frontier that must be remembered with its
/// milestone index so surviving nodes can reason about their ancestry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidEntryPoint {
    pub message_id: MessageId,
    pub index: MilestoneIndex,
}

impl SolidEntryPoint {
    pub fn new(message_id: MessageId, index: MilestoneIndex) -> Self {
        Self { message_id, index }
    }
}
