use crate::model::storage::TangleStorage;
use indexmap::IndexSet;
use std::collections::VecDeque;
use std::sync::Arc;
use tangle_hashes::MessageId;
use tangle_ledger_core::errors::traversal::{TraversalError, TraversalResult};
use tangle_ledger_core::metadata::MessageMetadata;
use triggered::Listener;

/// Walks parent and child edges of the DAG with pluggable hooks.
#[derive(Clone)]
pub struct DagTraversalManager {
    storage: Arc<TangleStorage>,
}

impl DagTraversalManager {
    pub fn new(storage: Arc<TangleStorage>) -> Self {
        Self { storage }
    }

    pub(crate) fn storage(&self) -> &TangleStorage {
        &self.storage
    }

    /// Walks the past cone of `start`.
    ///
    /// Every reachable node is offered to `condition`; a `false` result cuts
    /// off the node and its ancestors. Nodes passing the condition are handed
    /// to `consumer` exactly once. Parents that are solid entry points are
    /// reported through `on_entry_point` instead of being descended into,
    /// except the start node itself when `traverse_entry_points_at_start` is
    /// set. Unknown parents are reported through `on_missing_parent`; an error
    /// returned there aborts the walk.
    ///
    /// Caution: the frontier is processed in batches, so `condition` is not
    /// invoked in DFS order.
    pub fn traverse_parents<C, N, M>(
        &self,
        start: MessageId,
        mut condition: C,
        mut consumer: N,
        mut on_missing_parent: M,
        mut on_entry_point: Option<&mut dyn FnMut(MessageId)>,
        traverse_entry_points_at_start: bool,
        abort_signal: Option<&Listener>,
    ) -> TraversalResult<()>
    where
        C: FnMut(&Arc<MessageMetadata>) -> TraversalResult<bool>,
        N: FnMut(&Arc<MessageMetadata>) -> TraversalResult<()>,
        M: FnMut(MessageId) -> TraversalResult<()>,
    {
        let mut frontier = VecDeque::from([start]);
        let mut visited: IndexSet<MessageId> = IndexSet::new();
        let mut at_start = true;

        while let Some(current) = frontier.pop_front() {
            if let Some(listener) = abort_signal {
                if listener.is_triggered() {
                    return Err(TraversalError::Aborted);
                }
            }
            let is_start = std::mem::take(&mut at_start);
            if !visited.insert(current) {
                continue;
            }
            // null parents terminate the walk at the genesis boundary
            if current.is_null() {
                continue;
            }
            if self.storage.solid_entry_points().is_solid_entry_point(current) && !(is_start && traverse_entry_points_at_start) {
                if let Some(hook) = on_entry_point.as_deref_mut() {
                    hook(current);
                }
                continue;
            }
            let Some(metadata) = self.storage.metadata().get_cached_metadata_or_nil(current) else {
                on_missing_parent(current)?;
                continue;
            };
            if !condition(&metadata)? {
                continue;
            }
            consumer(&metadata)?;
            for parent in metadata.parents() {
                if !visited.contains(&parent) {
                    frontier.push_back(parent);
                }
            }
        }
        Ok(())
    }

    /// Walks the future cone of `start` along the children index. Nodes are
    /// visited at most once; unknown nodes end their branch silently.
    pub fn traverse_children<C, N>(
        &self,
        start: MessageId,
        mut condition: C,
        mut consumer: N,
        abort_signal: Option<&Listener>,
    ) -> TraversalResult<()>
    where
        C: FnMut(&Arc<MessageMetadata>) -> TraversalResult<bool>,
        N: FnMut(&Arc<MessageMetadata>) -> TraversalResult<()>,
    {
        let mut frontier = VecDeque::from([start]);
        let mut visited: IndexSet<MessageId> = IndexSet::new();

        while let Some(current) = frontier.pop_front() {
            if let Some(listener) = abort_signal {
                if listener.is_triggered() {
                    return Err(TraversalError::Aborted);
                }
            }
            if !visited.insert(current) {
                continue;
            }
            let Some(metadata) = self.storage.metadata().get_cached_metadata_or_nil(current) else {
                continue;
            };
            if !condition(&metadata)? {
                continue;
            }
            consumer(&metadata)?;
            for child in self.storage.children().children(current) {
                if !visited.contains(&child) {
                    frontier.push_back(child);
                }
            }
        }
        Ok(())
    }
}
