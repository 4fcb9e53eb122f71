use crate::model::storage::TangleStorage;
use crate::processes::traversal_manager::DagTraversalManager;
use std::collections::HashMap;
use std::sync::Arc;
use tangle_hashes::MessageId;
use tangle_ledger_core::config::PruningParams;
use tangle_ledger_core::errors::pruning::{PruningError, PruningResult};
use tangle_ledger_core::errors::store::StoreError;
use tangle_ledger_core::errors::traversal::TraversalError;
use tangle_ledger_core::milestone::MilestoneIndex;
use triggered::Listener;

/// Recomputes the solid entry points for a pruning target.
pub struct EntryPointCalculator {
    storage: Arc<TangleStorage>,
    traversal: DagTraversalManager,
    params: PruningParams,
}

impl EntryPointCalculator {
    pub fn new(storage: Arc<TangleStorage>, params: PruningParams) -> Self {
        let traversal = DagTraversalManager::new(storage.clone());
        Self { storage, traversal, params }
    }

    /// Walks the cones of the milestones in the trailing check window and
    /// collects every message that is still referenced from a cone confirmed
    /// after `target_index`, keyed by its own confirmation index.
    ///
    /// Window milestones at or below `pruning_index` have no cone left to walk
    /// and are skipped; a missing milestone above it is corrupt state.
    pub fn solid_entry_points(
        &self,
        target_index: MilestoneIndex,
        pruning_index: MilestoneIndex,
        abort_signal: &Listener,
    ) -> PruningResult<HashMap<MessageId, MilestoneIndex>> {
        let mut entry_points = HashMap::new();
        let window_start = target_index.saturating_sub(self.params.solid_entry_point_check_threshold_past).max(1);

        for milestone_index in window_start..=target_index {
            if abort_signal.is_triggered() {
                return Err(PruningError::PruningAborted);
            }

            let Some(milestone) = self.storage.milestones().get_cached_milestone_or_nil(milestone_index) else {
                if milestone_index <= pruning_index {
                    continue;
                }
                return Err(PruningError::Store(StoreError::KeyNotFound(format!("milestone {milestone_index}"))));
            };

            self.traversal
                .traverse_parents(
                    milestone.message_id,
                    // only messages confirmed by this milestone or a newer one
                    |metadata| Ok(metadata.confirmed_index().is_some_and(|at| at >= milestone_index)),
                    |metadata| {
                        let message_id = metadata.message_id();
                        if self.is_solid_entry_point(message_id, target_index) {
                            if let Some(at) = metadata.confirmed_index() {
                                entry_points.insert(message_id, at);
                            }
                        }
                        Ok(())
                    },
                    // parents behind the previous pruning frontier are gone already
                    |_parent| Ok(()),
                    None,
                    true,
                    Some(abort_signal),
                )
                .map_err(|err| match err {
                    TraversalError::Aborted => PruningError::PruningAborted,
                    other => PruningError::Traversal(other),
                })?;
        }

        Ok(entry_points)
    }

    /// A message is a solid entry point for `target_index` if any child is
    /// confirmed by a milestone newer than the target.
    fn is_solid_entry_point(&self, message_id: MessageId, target_index: MilestoneIndex) -> bool {
        self.storage.children().children(message_id).into_iter().any(|child| {
            self.storage
                .metadata()
                .get_cached_metadata_or_nil(child)
                .and_then(|metadata| metadata.confirmed_index())
                .is_some_and(|at| at > target_index)
        })
    }
}
