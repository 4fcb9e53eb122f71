use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tangle_hashes::MessageId;
use tangle_ledger_core::errors::store::{StoreError, StoreResult};
use tangle_ledger_core::metadata::MessageMetadata;

/// Reader API for the message metadata store.
pub trait MetadataStoreReader: Send + Sync {
    fn get_cached_metadata_or_nil(&self, message_id: MessageId) -> Option<Arc<MessageMetadata>>;
}

pub trait MetadataStore: MetadataStoreReader {
    fn insert(&self, metadata: MessageMetadata) -> StoreResult<()>;
    fn delete_metadata(&self, message_id: MessageId);
}

#[derive(Default)]
pub struct MemoryMetadataStore {
    map: RwLock<HashMap<MessageId, Arc<MessageMetadata>>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStoreReader for MemoryMetadataStore {
    fn get_cached_metadata_or_nil(&self, message_id: MessageId) -> Option<Arc<MessageMetadata>> {
        self.map.read().get(&message_id).cloned()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn insert(&self, metadata: MessageMetadata) -> StoreResult<()> {
        let mut map = self.map.write();
        if map.contains_key(&metadata.message_id()) {
            return Err(StoreError::KeyAlreadyExists(metadata.message_id().to_string()));
        }
        map.insert(metadata.message_id(), Arc::new(metadata));
        Ok(())
    }

    fn delete_metadata(&self, message_id: MessageId) {
        self.map.write().remove(&message_id);
    }
}
