use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tangle_hashes::MessageId;
use tangle_ledger_core::milestone::MilestoneIndex;

/// Index of messages that were still unconfirmed when a milestone came in.
pub trait UnconfirmedMessageStore: Send + Sync {
    fn insert(&self, index: MilestoneIndex, message_id: MessageId);
    fn unconfirmed_message_ids(&self, index: MilestoneIndex) -> Vec<MessageId>;
    fn delete_unconfirmed_messages(&self, index: MilestoneIndex);
}

#[derive(Default)]
pub struct MemoryUnconfirmedMessageStore {
    map: RwLock<HashMap<MilestoneIndex, HashSet<MessageId>>>,
}

impl MemoryUnconfirmedMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnconfirmedMessageStore for MemoryUnconfirmedMessageStore {
    fn insert(&self, index: MilestoneIndex, message_id: MessageId) {
        self.map.write().entry(index).or_default().insert(message_id);
    }

    fn unconfirmed_message_ids(&self, index: MilestoneIndex) -> Vec<MessageId> {
        self.map.read().get(&index).map(|ids| ids.iter().copied().collect()).unwrap_or_default()
    }

    fn delete_unconfirmed_messages(&self, index: MilestoneIndex) {
        self.map.write().remove(&index);
    }
}
