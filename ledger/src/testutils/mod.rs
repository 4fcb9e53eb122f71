//! Helpers for building small tangles in tests.

use crate::model::storage::TangleStorage;
use tangle_hashes::MessageId;
use tangle_ledger_core::bundle::Bundle;
use tangle_ledger_core::message::Message;
use tangle_ledger_core::metadata::MessageMetadata;
use tangle_ledger_core::milestone::{Milestone, MilestoneIndex};

/// Inserts a message with its metadata and children back-references.
pub fn attach_message(storage: &TangleStorage, id: MessageId, parent1: MessageId, parent2: MessageId, maybe_milestone: bool) {
    storage.messages().insert(Message::new(id, parent1, parent2, Vec::new())).unwrap();
    storage.metadata().insert(MessageMetadata::new(id, parent1, parent2, maybe_milestone)).unwrap();
    if !parent1.is_null() {
        storage.children().insert_child(parent1, id);
    }
    if !parent2.is_null() && parent2 != parent1 {
        storage.children().insert_child(parent2, id);
    }
}

/// Marks a message confirmed at the given milestone index.
pub fn confirm_message(storage: &TangleStorage, id: MessageId, index: MilestoneIndex) {
    storage
        .metadata()
        .get_cached_metadata_or_nil(id)
        .expect("message must be attached before confirmation")
        .confirm(index);
}

/// Registers a milestone record, its ledger diff and its milestone bundle for
/// an already attached message.
pub fn attach_milestone(storage: &TangleStorage, index: MilestoneIndex, message_id: MessageId) {
    storage.milestones().insert(Milestone::new(index, message_id, u64::from(index))).unwrap();
    storage.ledger_diffs().store_diff(index, Vec::new());
    storage.bundles().insert(Bundle::new(vec![message_id], Some(index)));
    confirm_message(storage, message_id, index);
}
