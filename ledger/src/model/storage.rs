use crate::model::stores::bundles::{BundleStore, MemoryBundleStore};
use crate::model::stores::children::{ChildrenStore, MemoryChildrenStore};
use crate::model::stores::ledger_diffs::{LedgerDiffStore, MemoryLedgerDiffStore};
use crate::model::stores::messages::{MemoryMessageStore, MessageStore};
use crate::model::stores::metadata::{MemoryMetadataStore, MetadataStore};
use crate::model::stores::milestones::{MemoryMilestoneStore, MilestoneStore};
use crate::model::stores::snapshot::{MemorySnapshotStore, SnapshotStore};
use crate::model::stores::solid_entry_points::{MemorySolidEntryPointStore, SolidEntryPointStore};
use crate::model::stores::unconfirmed::{MemoryUnconfirmedMessageStore, UnconfirmedMessageStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Hook through which the pruning engine requests a reclamation cycle from the
/// underlying storage backend.
pub trait GarbageCollector: Send + Sync {
    fn run_garbage_collection(&self);
}

/// Garbage collection stub for the in-memory backend: there is nothing to
/// compact, but invocations are counted so callers can observe the request.
#[derive(Default)]
pub struct MemoryGarbageCollector {
    runs: AtomicUsize,
}

impl MemoryGarbageCollector {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }
}

impl GarbageCollector for MemoryGarbageCollector {
    fn run_garbage_collection(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }
}

/// Aggregation of all tangle store handles.
///
/// Store getters return `Arc` cache handles; every acquisition is released by
/// dropping the handle, on every exit path.
pub struct TangleStorage {
    messages: Arc<dyn MessageStore>,
    metadata: Arc<dyn MetadataStore>,
    milestones: Arc<dyn MilestoneStore>,
    ledger_diffs: Arc<dyn LedgerDiffStore>,
    children: Arc<dyn ChildrenStore>,
    unconfirmed: Arc<dyn UnconfirmedMessageStore>,
    bundles: Arc<dyn BundleStore>,
    solid_entry_points: Arc<dyn SolidEntryPointStore>,
    snapshot: Arc<dyn SnapshotStore>,
    garbage_collector: Arc<dyn GarbageCollector>,
}

impl TangleStorage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        messages: Arc<dyn MessageStore>,
        metadata: Arc<dyn MetadataStore>,
        milestones: Arc<dyn MilestoneStore>,
        ledger_diffs: Arc<dyn LedgerDiffStore>,
        children: Arc<dyn ChildrenStore>,
        unconfirmed: Arc<dyn UnconfirmedMessageStore>,
        bundles: Arc<dyn BundleStore>,
        solid_entry_points: Arc<dyn SolidEntryPointStore>,
        snapshot: Arc<dyn SnapshotStore>,
        garbage_collector: Arc<dyn GarbageCollector>,
    ) -> Arc<Self> {
        Arc::new(Self {
            messages,
            metadata,
            milestones,
            ledger_diffs,
            children,
            unconfirmed,
            bundles,
            solid_entry_points,
            snapshot,
            garbage_collector,
        })
    }

    /// Creates a storage aggregate backed entirely by in-memory stores.
    pub fn memory() -> Arc<Self> {
        Self::new(
            Arc::new(MemoryMessageStore::new()),
            Arc::new(MemoryMetadataStore::new()),
            Arc::new(MemoryMilestoneStore::new()),
            Arc::new(MemoryLedgerDiffStore::new()),
            Arc::new(MemoryChildrenStore::new()),
            Arc::new(MemoryUnconfirmedMessageStore::new()),
            Arc::new(MemoryBundleStore::new()),
            Arc::new(MemorySolidEntryPointStore::new()),
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(MemoryGarbageCollector::default()),
        )
    }

    pub fn messages(&self) -> &dyn MessageStore {
        &*self.messages
    }

    pub fn metadata(&self) -> &dyn MetadataStore {
        &*self.metadata
    }

    pub fn milestones(&self) -> &dyn MilestoneStore {
        &*self.milestones
    }

    pub fn ledger_diffs(&self) -> &dyn LedgerDiffStore {
        &*self.ledger_diffs
    }

    pub fn children(&self) -> &dyn ChildrenStore {
        &*self.children
    }

    pub fn unconfirmed(&self) -> &dyn UnconfirmedMessageStore {
        &*self.unconfirmed
    }

    pub fn bundles(&self) -> &dyn BundleStore {
        &*self.bundles
    }

    pub fn solid_entry_points(&self) -> &dyn SolidEntryPointStore {
        &*self.solid_entry_points
    }

    pub fn snapshot(&self) -> &dyn SnapshotStore {
        &*self.snapshot
    }

    pub fn garbage_collector(&self) -> &dyn GarbageCollector {
        &*self.garbage_collector
    }
}
