use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tangle_ledger_core::milestone::MilestoneIndex;

/// Per-milestone ledger state diff, opaque to the pruning engine.
pub trait LedgerDiffStore: Send + Sync {
    fn store_diff(&self, index: MilestoneIndex, diff: Vec<u8>);
    fn diff(&self, index: MilestoneIndex) -> Option<Arc<Vec<u8>>>;
    fn delete_ledger_diff_for_milestone(&self, index: MilestoneIndex);
}

#[derive(Default)]
pub struct MemoryLedgerDiffStore {
    map: RwLock<HashMap<MilestoneIndex, Arc<Vec<u8>>>>,
}

impl MemoryLedgerDiffStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerDiffStore for MemoryLedgerDiffStore {
    fn store_diff(&self, index: MilestoneIndex, diff: Vec<u8>) {
        self.map.write().insert(index, Arc::new(diff));
    }

    fn diff(&self, index: MilestoneIndex) -> Option<Arc<Vec<u8>>> {
        self.map.read().get(&index).cloned()
    }

    fn delete_ledger_diff_for_milestone(&self, index: MilestoneIndex) {
        self.map.write().remove(&index);
    }
}
