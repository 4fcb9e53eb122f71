//! End-to-end pruning scenarios over in-memory storage.

use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use std::sync::Arc;
use tangle_core::trigger::SingleTrigger;
use tangle_hashes::MessageId;
use tangle_ledger::model::storage::{MemoryGarbageCollector, TangleStorage};
use tangle_ledger::model::stores::bundles::MemoryBundleStore;
use tangle_ledger::model::stores::children::MemoryChildrenStore;
use tangle_ledger::model::stores::ledger_diffs::MemoryLedgerDiffStore;
use tangle_ledger::model::stores::messages::MemoryMessageStore;
use tangle_ledger::model::stores::metadata::MemoryMetadataStore;
use tangle_ledger::model::stores::milestones::MemoryMilestoneStore;
use tangle_ledger::model::stores::snapshot::MemorySnapshotStore;
use tangle_ledger::model::stores::solid_entry_points::MemorySolidEntryPointStore;
use tangle_ledger::model::stores::unconfirmed::MemoryUnconfirmedMessageStore;
use tangle_ledger::pipeline::pruning_processor::PruningProcessor;
use tangle_ledger::testutils::{attach_message, attach_milestone, confirm_message};
use tangle_ledger_core::bundle::Bundle;
use tangle_ledger_core::config::PruningParams;
use tangle_ledger_core::errors::pruning::PruningError;
use tangle_ledger_core::milestone::MilestoneIndex;
use tangle_ledger_core::snapshot::{SnapshotInfo, SolidEntryPoint};

fn milestone_message(index: MilestoneIndex) -> MessageId {
    MessageId::from(10_000 + u64::from(index))
}

fn side_message(index: MilestoneIndex) -> MessageId {
    MessageId::from(20_000 + u64::from(index))
}

/// Builds milestones `first..=last` as a chain. Each milestone message
/// references the previous milestone message and a side message confirmed at
/// the same index, so every milestone carries a two-message cone.
fn build_milestone_chain(storage: &TangleStorage, first: MilestoneIndex, last: MilestoneIndex) {
    for index in first..=last {
        let previous = milestone_message(index - 1);
        let side = side_message(index);
        attach_message(storage, side, previous, previous, false);
        attach_message(storage, milestone_message(index), previous, side, true);
        attach_milestone(storage, index, milestone_message(index));
        confirm_message(storage, side, index);
    }
}

fn new_processor(storage: &Arc<TangleStorage>, params: PruningParams) -> (Arc<PruningProcessor>, SingleTrigger) {
    let (_sender, receiver) = unbounded();
    let abort = SingleTrigger::new();
    let processor = Arc::new(PruningProcessor::new(receiver, storage.clone(), params, abort.listener.clone()));
    (processor, abort)
}

#[test]
fn test_pruning_refuses_insufficient_history() {
    let storage = TangleStorage::memory();
    storage.snapshot().set_snapshot_info(SnapshotInfo::new(100, 50, 50));
    let (processor, _abort) = new_processor(&storage, PruningParams::default());

    assert!(matches!(processor.prune_database(200), Err(PruningError::NotEnoughHistory { limit: 101, .. })));
    // guards leave the store untouched
    assert_eq!(storage.snapshot().get_snapshot_info().unwrap(), SnapshotInfo::new(100, 50, 50));
}

#[test]
fn test_clamped_target_can_leave_nothing_to_prune() {
    let storage = TangleStorage::memory();
    // target_index_max = 200 - 50 - 50 - 1 = 99, which the pruning index
    // already reached
    storage.snapshot().set_snapshot_info(SnapshotInfo::new(200, 99, 99));
    let (processor, _abort) = new_processor(&storage, PruningParams::default());

    assert!(matches!(processor.prune_database(150), Err(PruningError::NoPruningNeeded { pruning: 99, target: 99 })));
}

#[test]
fn test_successful_prune_of_one_milestone() {
    let storage = TangleStorage::memory();
    storage.snapshot().set_snapshot_info(SnapshotInfo::new(1000, 800, 800));
    // milestones at or below the pruning index are gone already
    build_milestone_chain(&storage, 801, 802);

    // orphaned unconfirmed leftovers at the old pruning index
    let orphan = MessageId::from(777u64);
    attach_message(&storage, orphan, MessageId::NULL, MessageId::NULL, false);
    storage.unconfirmed().insert(800, orphan);

    let (processor, _abort) = new_processor(&storage, PruningParams::default());
    let events = Arc::new(Mutex::new(Vec::new()));
    let seen = events.clone();
    processor.events().pruning_milestone_index_changed.attach(move |index| seen.lock().push(*index));

    processor.prune_database(801).unwrap();

    let info = storage.snapshot().get_snapshot_info().unwrap();
    assert_eq!(info, SnapshotInfo::new(1000, 801, 801));
    assert!(info.is_ordered());
    assert_eq!(*events.lock(), vec![801]);

    // milestone 801 and its cone are gone, 802 is untouched
    assert!(storage.milestones().get_cached_milestone_or_nil(801).is_none());
    assert!(storage.ledger_diffs().diff(801).is_none());
    assert!(!storage.messages().has_message(milestone_message(801)));
    assert!(!storage.messages().has_message(side_message(801)));
    assert!(storage.milestones().get_cached_milestone_or_nil(802).is_some());
    assert!(storage.messages().has_message(milestone_message(802)));

    // phase 2 swept the old pruning index
    assert!(!storage.messages().has_message(orphan));
    assert!(storage.unconfirmed().unconfirmed_message_ids(800).is_empty());

    // the rebuilt set holds exactly the new frontier, under its own index
    assert_eq!(storage.solid_entry_points().solid_entry_points_index(milestone_message(801)), Some(801));
    assert_eq!(
        storage.solid_entry_points().solid_entry_points(),
        vec![SolidEntryPoint::new(milestone_message(801), 801)]
    );
}

#[test]
fn test_abort_mid_prune_and_resume() {
    tangle_core::log::try_init_logger("info");
    let storage = TangleStorage::memory();
    storage.snapshot().set_snapshot_info(SnapshotInfo::new(1000, 800, 800));
    build_milestone_chain(&storage, 801, 812);

    let (processor, abort) = new_processor(&storage, PruningParams::default());
    let trigger = abort.trigger.clone();
    processor.events().pruning_milestone_index_changed.attach(move |index| {
        if *index == 803 {
            trigger.trigger();
        }
    });

    assert!(matches!(processor.prune_database(810), Err(PruningError::PruningAborted)));
    let info = storage.snapshot().get_snapshot_info().unwrap();
    assert_eq!(info, SnapshotInfo::new(1000, 803, 810));
    assert!(info.is_ordered());
    assert!(storage.milestones().get_cached_milestone_or_nil(803).is_none());
    assert!(storage.milestones().get_cached_milestone_or_nil(804).is_some());

    // a fresh run with the same target picks up from the recorded pruning
    // index; entry points are not recomputed
    let (resumed, _abort) = new_processor(&storage, PruningParams::default());
    let events = Arc::new(Mutex::new(Vec::new()));
    let seen = events.clone();
    resumed.events().pruning_milestone_index_changed.attach(move |index| seen.lock().push(*index));

    resumed.prune_database(810).unwrap();
    let info = storage.snapshot().get_snapshot_info().unwrap();
    assert_eq!(info, SnapshotInfo::new(1000, 810, 810));
    assert!(info.is_ordered());
    assert_eq!(*events.lock(), (804..=810).collect::<Vec<_>>());

    for index in 801..=810 {
        assert!(storage.milestones().get_cached_milestone_or_nil(index).is_none());
        assert!(storage.ledger_diffs().diff(index).is_none());
        assert!(!storage.messages().has_message(milestone_message(index)));
        assert!(!storage.messages().has_message(side_message(index)));
    }
    assert!(storage.milestones().get_cached_milestone_or_nil(811).is_some());

    // the entry-point set rebuilt before the abort survived the resume intact
    assert_eq!(
        storage.solid_entry_points().solid_entry_points(),
        vec![SolidEntryPoint::new(milestone_message(810), 810)]
    );

    // a further call has nothing to do
    assert!(matches!(resumed.prune_database(810), Err(PruningError::NoPruningNeeded { pruning: 810, .. })));
}

#[test]
fn test_milestone_bundles_survive_unconfirmed_sweep() {
    let storage = TangleStorage::memory();
    storage.snapshot().set_snapshot_info(SnapshotInfo::new(1000, 800, 800));
    build_milestone_chain(&storage, 801, 802);

    // an unconfirmed milestone-candidate message that belongs to a milestone
    // bundle, indexed as unconfirmed at 801
    let candidate = MessageId::from(555u64);
    attach_message(&storage, candidate, MessageId::NULL, MessageId::NULL, true);
    storage.bundles().insert(Bundle::new(vec![candidate], Some(9999)));
    storage.unconfirmed().insert(801, candidate);

    // a plain unconfirmed message at the same index
    let plain = MessageId::from(556u64);
    attach_message(&storage, plain, MessageId::NULL, MessageId::NULL, false);
    storage.unconfirmed().insert(801, plain);

    let (processor, _abort) = new_processor(&storage, PruningParams::default());
    processor.prune_database(801).unwrap();

    assert!(storage.messages().has_message(candidate));
    assert!(!storage.messages().has_message(plain));
    // the unconfirmed index entries are dropped either way
    assert!(storage.unconfirmed().unconfirmed_message_ids(801).is_empty());
}

#[test]
fn test_missing_milestone_is_skipped_without_advancing_that_iteration() {
    let storage = TangleStorage::memory();
    storage.snapshot().set_snapshot_info(SnapshotInfo::new(1000, 800, 800));
    build_milestone_chain(&storage, 801, 816);
    // a hole below the entry-point check window
    storage.milestones().delete_milestone(802);

    let params = PruningParams { solid_entry_point_check_threshold_past: 10 };
    let (processor, _abort) = new_processor(&storage, params);
    processor.prune_database(815).unwrap();

    let info = storage.snapshot().get_snapshot_info().unwrap();
    assert_eq!(info.pruning_index, 815);
    assert_eq!(info.entry_point_index, 815);

    // the hole was skipped: its ledger diff was never cleaned up, while the
    // neighbours' were
    assert!(storage.ledger_diffs().diff(802).is_some());
    assert!(storage.ledger_diffs().diff(801).is_none());
    assert!(storage.ledger_diffs().diff(803).is_none());
}

#[test]
fn test_garbage_collection_requested_after_successful_run() {
    let garbage_collector = Arc::new(MemoryGarbageCollector::default());
    let storage = TangleStorage::new(
        Arc::new(MemoryMessageStore::new()),
        Arc::new(MemoryMetadataStore::new()),
        Arc::new(MemoryMilestoneStore::new()),
        Arc::new(MemoryLedgerDiffStore::new()),
        Arc::new(MemoryChildrenStore::new()),
        Arc::new(MemoryUnconfirmedMessageStore::new()),
        Arc::new(MemoryBundleStore::new()),
        Arc::new(MemorySolidEntryPointStore::new()),
        Arc::new(MemorySnapshotStore::new()),
        garbage_collector.clone(),
    );
    storage.snapshot().set_snapshot_info(SnapshotInfo::new(1000, 800, 800));
    build_milestone_chain(&storage, 801, 802);

    let (processor, _abort) = new_processor(&storage, PruningParams::default());
    processor.prune_database(801).unwrap();
    assert_eq!(garbage_collector.runs(), 1);

    // guard failures do not request a cycle
    assert!(processor.prune_database(801).is_err());
    assert_eq!(garbage_collector.runs(), 1);
}
