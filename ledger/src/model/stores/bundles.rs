use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tangle_hashes::MessageId;
use tangle_ledger_core::bundle::Bundle;

/// Reader API for bundle membership lookups.
pub trait BundleStoreReader: Send + Sync {
    /// Returns cache handles for all bundles the message is part of, or `None`
    /// if it belongs to no bundle.
    fn bundles_of_message(&self, message_id: MessageId) -> Option<Vec<Arc<Bundle>>>;
}

pub trait BundleStore: BundleStoreReader {
    fn insert(&self, bundle: Bundle);
}

#[derive(Default)]
pub struct MemoryBundleStore {
    by_message: RwLock<HashMap<MessageId, Vec<Arc<Bundle>>>>,
}

impl MemoryBundleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BundleStoreReader for MemoryBundleStore {
    fn bundles_of_message(&self, message_id: MessageId) -> Option<Vec<Arc<Bundle>>> {
        self.by_message.read().get(&message_id).cloned()
    }
}

impl BundleStore for MemoryBundleStore {
    fn insert(&self, bundle: Bundle) {
        let bundle = Arc::new(bundle);
        let mut by_message = self.by_message.write();
        for message_id in bundle.messages() {
            by_message.entry(*message_id).or_default().push(bundle.clone());
        }
    }
}
