use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tangle_ledger_core::errors::store::{StoreError, StoreResult};
use tangle_ledger_core::milestone::{Milestone, MilestoneIndex};

/// Reader API for the milestone store.
pub trait MilestoneStoreReader: Send + Sync {
    fn get_cached_milestone_or_nil(&self, index: MilestoneIndex) -> Option<Arc<Milestone>>;
}

pub trait MilestoneStore: MilestoneStoreReader {
    fn insert(&self, milestone: Milestone) -> StoreResult<()>;
    fn delete_milestone(&self, index: MilestoneIndex);
}

#[derive(Default)]
pub struct MemoryMilestoneStore {
    map: RwLock<HashMap<MilestoneIndex, Arc<Milestone>>>,
}

impl MemoryMilestoneStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MilestoneStoreReader for MemoryMilestoneStore {
    fn get_cached_milestone_or_nil(&self, index: MilestoneIndex) -> Option<Arc<Milestone>> {
        self.map.read().get(&index).cloned()
    }
}

impl MilestoneStore for MemoryMilestoneStore {
    fn insert(&self, milestone: Milestone) -> StoreResult<()> {
        let mut map = self.map.write();
        if map.contains_key(&milestone.index) {
            return Err(StoreError::KeyAlreadyExists(milestone.index.to_string()));
        }
        map.insert(milestone.index, Arc::new(milestone));
        Ok(())
    }

    fn delete_milestone(&self, index: MilestoneIndex) {
        self.map.write().remove(&index);
    }
}
