use crate::milestone::MilestoneIndex;
use parking_lot::RwLock;
use tangle_hashes::MessageId;

/// Mutable per-message bookkeeping. Handles are shared as `Arc`s; dropping the
/// last handle releases the cache entry.
#[derive(Debug)]
pub struct MessageMetadata {
    message_id: MessageId,
    parent1: MessageId,
    parent2: MessageId,
    maybe_milestone: bool,
    confirmed: RwLock<Option<MilestoneIndex>>,
}

impl MessageMetadata {
    pub fn new(message_id: MessageId, parent1: MessageId, parent2: MessageId, maybe_milestone: bool) -> Self {
        Self { message_id, parent1, parent2, maybe_milestone, confirmed: RwLock::new(None) }
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn parent1(&self) -> MessageId {
        self.parent1
    }

    pub fn parent2(&self) -> MessageId {
        self.parent2
    }

    pub fn parents(&self) -> [MessageId; 2] {
        [self.parent1, self.parent2]
    }

    /// Whether the structure of this message allows it to be part of a
    /// milestone bundle. Set once by the solidification pipeline.
    pub fn maybe_milestone(&self) -> bool {
        self.maybe_milestone
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed.read().is_some()
    }

    pub fn confirmed_index(&self) -> Option<MilestoneIndex> {
        *self.confirmed.read()
    }

    /// Marks the message confirmed at `index`. Confirmation is monotonic: the
    /// first confirmation wins and later calls are ignored.
    pub fn confirm(&self, index: MilestoneIndex) {
        let mut confirmed = self.confirmed.write();
        if confirmed.is_none() {
            *confirmed = Some(index);
        }
    }
}
