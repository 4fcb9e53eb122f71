use parking_lot::RwLock;
use std::collections::HashMap;
use tangle_hashes::MessageId;
use tangle_ledger_core::milestone::MilestoneIndex;
use tangle_ledger_core::snapshot::SolidEntryPoint;

/// The set of boundary hashes that must be remembered after their cones are
/// pruned. The whole set is rebuilt atomically: `replace_solid_entry_points`
/// resets, refills and persists under the store's write lock in one step.
pub trait SolidEntryPointStore: Send + Sync {
    fn is_solid_entry_point(&self, message_id: MessageId) -> bool;
    fn solid_entry_points_index(&self, message_id: MessageId) -> Option<MilestoneIndex>;
    fn replace_solid_entry_points(&self, entry_points: HashMap<MessageId, MilestoneIndex>);
    fn solid_entry_points(&self) -> Vec<SolidEntryPoint>;
}

#[derive(Default)]
pub struct MemorySolidEntryPointStore {
    map: RwLock<HashMap<MessageId, MilestoneIndex>>,
}

impl MemorySolidEntryPointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SolidEntryPointStore for MemorySolidEntryPointStore {
    fn is_solid_entry_point(&self, message_id: MessageId) -> bool {
        self.map.read().contains_key(&message_id)
    }

    fn solid_entry_points_index(&self, message_id: MessageId) -> Option<MilestoneIndex> {
        self.map.read().get(&message_id).copied()
    }

    fn replace_solid_entry_points(&self, entry_points: HashMap<MessageId, MilestoneIndex>) {
        *self.map.write() = entry_points;
    }

    fn solid_entry_points(&self) -> Vec<SolidEntryPoint> {
        self.map.read().iter().map(|(message_id, index)| SolidEntryPoint::new(*message_id, *index)).collect()
    }
}
