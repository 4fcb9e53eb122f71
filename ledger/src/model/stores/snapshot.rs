use parking_lot::RwLock;
use tangle_ledger_core::snapshot::SnapshotInfo;

/// Singleton snapshot/pruning record, guarded by the store's own lock.
pub trait SnapshotStore: Send + Sync {
    fn get_snapshot_info(&self) -> Option<SnapshotInfo>;
    fn set_snapshot_info(&self, info: SnapshotInfo);
}

#[derive(Default)]
pub struct MemorySnapshotStore {
    info: RwLock<Option<SnapshotInfo>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_info(info: SnapshotInfo) -> Self {
        Self { info: RwLock::new(Some(info)) }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get_snapshot_info(&self) -> Option<SnapshotInfo> {
        *self.info.read()
    }

    fn set_snapshot_info(&self, info: SnapshotInfo) {
        *self.info.write() = Some(info);
    }
}
