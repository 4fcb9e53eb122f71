use crate::model::storage::TangleStorage;
use crate::processes::entry_points::EntryPointCalculator;
use crate::processes::traversal_manager::DagTraversalManager;
use crossbeam_channel::Receiver as CrossbeamReceiver;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tangle_core::events::Event;
use tangle_ledger_core::config::{PruningParams, ADDITIONAL_PRUNING_THRESHOLD};
use tangle_ledger_core::errors::pruning::{PruningError, PruningResult};
use tangle_ledger_core::message::Message;
use tangle_ledger_core::milestone::MilestoneIndex;
use tangle_ledger_core::snapshot::SnapshotInfo;
use tangle_ledger_core::MessageIdSet;
use triggered::Listener;

pub enum PruningProcessingMessage {
    Exit,
    Process { target_index: MilestoneIndex },
}

pub struct PruningEvents {
    /// Fired after each milestone whose cone has been fully deleted.
    pub pruning_milestone_index_changed: Event<MilestoneIndex>,
}

/// A processor dedicated to deleting the cones of old milestones and keeping
/// the solid-entry-point set ahead of the deletion frontier.
pub struct PruningProcessor {
    // Channels
    receiver: CrossbeamReceiver<PruningProcessingMessage>,

    // Storage
    storage: Arc<TangleStorage>,

    // Managers and services
    traversal: DagTraversalManager,
    entry_points: EntryPointCalculator,

    params: PruningParams,
    events: PruningEvents,
    is_pruning: Mutex<bool>,
    abort_signal: Listener,
}

impl PruningProcessor {
    pub fn new(
        receiver: CrossbeamReceiver<PruningProcessingMessage>,
        storage: Arc<TangleStorage>,
        params: PruningParams,
        abort_signal: Listener,
    ) -> Self {
        Self {
            receiver,
            storage: storage.clone(),
            traversal: DagTraversalManager::new(storage.clone()),
            entry_points: EntryPointCalculator::new(storage, params),
            params,
            events: PruningEvents { pruning_milestone_index_changed: Event::new() },
            is_pruning: Mutex::new(false),
            abort_signal,
        }
    }

    pub fn events(&self) -> &PruningEvents {
        &self.events
    }

    /// Whether a pruning run is currently in progress.
    pub fn is_pruning(&self) -> bool {
        *self.is_pruning.lock()
    }

    fn set_is_pruning(&self, value: bool) {
        *self.is_pruning.lock() = value;
    }

    pub fn worker(self: &Arc<Self>) {
        while let Ok(msg) = self.receiver.recv() {
            match msg {
                PruningProcessingMessage::Exit => break,
                PruningProcessingMessage::Process { target_index } => match self.prune_database(target_index) {
                    Ok(()) => {}
                    Err(err @ (PruningError::NoPruningNeeded { .. } | PruningError::NotEnoughHistory { .. })) => {
                        debug!("Pruning skipped: {}", err)
                    }
                    Err(PruningError::PruningAborted) => info!("Pruning aborted"),
                    Err(err) => warn!("Pruning failed: {}", err),
                },
            }
        }
        debug!("Pruning processor exiting");
    }

    /// Deletes the cones of all milestones up to `target_index` (clamped) and
    /// advances the pruning index. Progress persisted before an abort or crash
    /// is kept; a follow-up call resumes from the recorded pruning index.
    ///
    /// Callers must not run two invocations concurrently; `is_pruning` is
    /// exposed so they can tell.
    pub fn prune_database(&self, mut target_index: MilestoneIndex) -> PruningResult<()> {
        let info = self.storage.snapshot().get_snapshot_info().ok_or(PruningError::MissingSnapshotInfo)?;

        let threshold_past = self.params.solid_entry_point_check_threshold_past;
        let minimum_snapshot_index = threshold_past + ADDITIONAL_PRUNING_THRESHOLD + 1;
        if info.snapshot_index < minimum_snapshot_index {
            return Err(PruningError::NotEnoughHistory { limit: minimum_snapshot_index, target: target_index });
        }

        // entry points may reach this far back at most
        let target_index_max = info.snapshot_index - threshold_past - ADDITIONAL_PRUNING_THRESHOLD - 1;
        if target_index > target_index_max {
            target_index = target_index_max;
        }

        if info.pruning_index >= target_index {
            return Err(PruningError::NoPruningNeeded { pruning: info.pruning_index, target: target_index });
        }

        // entry points are refreshed in steps of at most ADDITIONAL_PRUNING_THRESHOLD
        // milestones; a target further out than one step has too little recomputed
        // history in front of it
        let step_limit = info.entry_point_index + ADDITIONAL_PRUNING_THRESHOLD + 1;
        if info.entry_point_index < target_index && target_index > step_limit {
            return Err(PruningError::NotEnoughHistory { limit: step_limit, target: target_index });
        }

        self.set_is_pruning(true);
        let result = self.prune_database_inner(info, target_index);
        self.set_is_pruning(false);
        result
    }

    fn prune_database_inner(&self, mut info: SnapshotInfo, target_index: MilestoneIndex) -> PruningResult<()> {
        // Phase 1: recompute and persist the solid entry points before deleting
        // anything. If the process dies during phase 3, a restart finds valid
        // entry points for the partially deleted cone and resumes from the
        // recorded pruning index. An aborted run that already persisted entry
        // points for this target skips straight to deletion.
        if info.entry_point_index < target_index {
            let new_entry_points = self.entry_points.solid_entry_points(target_index, info.pruning_index, &self.abort_signal)?;
            self.storage.solid_entry_points().replace_solid_entry_points(new_entry_points);

            info.entry_point_index = target_index;
            self.storage.snapshot().set_snapshot_info(info);
        }

        // Phase 2: the old pruning index may still hold orphaned unconfirmed
        // messages if the node previously had it as its latest solid milestone
        self.prune_unconfirmed_messages(info.pruning_index);

        // Phase 3: iterate through all milestones that have to be pruned
        for milestone_index in (info.pruning_index + 1)..=target_index {
            if self.abort_signal.is_triggered() {
                return Err(PruningError::PruningAborted);
            }

            info!("Pruning milestone ({})...", milestone_index);
            let ts = Instant::now();

            let (mut messages_deleted, mut messages_checked) = self.prune_unconfirmed_messages(milestone_index);

            let Some(milestone) = self.storage.milestones().get_cached_milestone_or_nil(milestone_index) else {
                warn!("Pruning milestone ({}) failed! Milestone not found!", milestone_index);
                continue;
            };
            let milestone_message_id = milestone.message_id;
            drop(milestone);

            let mut cone = MessageIdSet::new();
            let traversed = self.traversal.traverse_parents(
                milestone_message_id,
                // everything referenced by this milestone can be pruned, even
                // messages of older milestones
                |_| Ok(true),
                |metadata| {
                    cone.insert(metadata.message_id());
                    Ok(())
                },
                // parents behind the frontier are gone already
                |_parent| Ok(()),
                // entry points themselves are kept; the milestone message is one
                // by now, so the start is walked anyway
                None,
                true,
                None,
            );
            if let Err(err) = traversed {
                warn!("Pruning milestone ({}) failed! Error: {}", milestone_index, err);
                continue;
            }

            messages_checked += cone.len();
            messages_deleted += self.prune_messages(cone);

            self.prune_milestone(milestone_index);

            info.pruning_index = milestone_index;
            self.storage.snapshot().set_snapshot_info(info);

            info!(
                "Pruning milestone ({}) took {:?}. Pruned {}/{} messages.",
                milestone_index,
                ts.elapsed(),
                messages_deleted,
                messages_checked
            );

            self.events.pruning_milestone_index_changed.trigger(&milestone_index);
        }

        // Phase 4: hand reclamation over to the storage backend
        self.storage.garbage_collector().run_garbage_collection();

        Ok(())
    }

    /// Deletes all messages the store still lists as unconfirmed for
    /// `target_index`, except those that became confirmed in the meantime or
    /// belong to a milestone bundle. Returns (deleted, checked).
    fn prune_unconfirmed_messages(&self, target_index: MilestoneIndex) -> (usize, usize) {
        let mut to_delete = MessageIdSet::new();

        'next_message: for message_id in self.storage.unconfirmed().unconfirmed_message_ids(target_index) {
            if to_delete.contains(&message_id) {
                continue;
            }

            // already deleted or marked for deletion
            let Some(metadata) = self.storage.metadata().get_cached_metadata_or_nil(message_id) else {
                continue;
            };

            if metadata.is_confirmed() {
                continue;
            }

            if metadata.maybe_milestone() {
                if let Some(bundles) = self.storage.bundles().bundles_of_message(message_id) {
                    for bundle in &bundles {
                        if bundle.is_milestone() {
                            // milestone bundles survive even when indexed as unconfirmed
                            continue 'next_message;
                        }
                    }
                }
            }

            to_delete.insert(message_id);
        }

        let checked = to_delete.len();
        let deleted = self.prune_messages(to_delete);
        self.storage.unconfirmed().delete_unconfirmed_messages(target_index);

        (deleted, checked)
    }

    /// Deletes the given messages together with their children index entries
    /// and their back-references in both parents. Idempotent per message.
    fn prune_messages(&self, message_ids: MessageIdSet) -> usize {
        let mut deleted = 0;
        for message_id in message_ids {
            let consumed = self.storage.messages().consume_message(
                message_id,
                Box::new(|message: &Message| {
                    // delete the reference in the parents
                    self.storage.children().delete_child(message.parent1(), message.id());
                    self.storage.children().delete_child(message.parent2(), message.id());

                    self.storage.children().delete_children(message.id());
                    self.storage.metadata().delete_metadata(message.id());
                }),
            );
            if consumed {
                deleted += 1;
            }
        }
        deleted
    }

    /// Deletes the milestone record and the ledger diff for the given index.
    fn prune_milestone(&self, milestone_index: MilestoneIndex) {
        self.storage.ledger_diffs().delete_ledger_diff_for_milestone(milestone_index);
        self.storage.milestones().delete_milestone(milestone_index);
    }
}
