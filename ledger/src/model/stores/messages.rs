use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tangle_hashes::MessageId;
use tangle_ledger_core::errors::store::{StoreError, StoreResult};
use tangle_ledger_core::message::Message;

/// Reader API for the message store.
pub trait MessageStoreReader: Send + Sync {
    /// Returns a cache handle for the message, or `None` if it is absent or
    /// already marked for deletion. Dropping the handle releases it.
    fn get_cached_message_or_nil(&self, message_id: MessageId) -> Option<Arc<Message>>;

    fn has_message(&self, message_id: MessageId) -> bool;
}

pub trait MessageStore: MessageStoreReader {
    fn insert(&self, message: Message) -> StoreResult<()>;

    fn delete_message(&self, message_id: MessageId);

    /// Takes the message out of the store and hands it to `consumer` exactly
    /// once. Returns whether the message was present. Deletion and release
    /// happen together, on every exit path.
    fn consume_message<'a>(&self, message_id: MessageId, consumer: Box<dyn FnOnce(&Message) + 'a>) -> bool;
}

/// An in-memory implementation of `MessageStore` with concurrent readers support.
#[derive(Default)]
pub struct MemoryMessageStore {
    map: RwLock<HashMap<MessageId, Arc<Message>>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageStoreReader for MemoryMessageStore {
    fn get_cached_message_or_nil(&self, message_id: MessageId) -> Option<Arc<Message>> {
        self.map.read().get(&message_id).cloned()
    }

    fn has_message(&self, message_id: MessageId) -> bool {
        self.map.read().contains_key(&message_id)
    }
}

impl MessageStore for MemoryMessageStore {
    fn insert(&self, message: Message) -> StoreResult<()> {
        let mut map = self.map.write();
        if map.contains_key(&message.id()) {
            return Err(StoreError::KeyAlreadyExists(message.id().to_string()));
        }
        map.insert(message.id(), Arc::new(message));
        Ok(())
    }

    fn delete_message(&self, message_id: MessageId) {
        self.map.write().remove(&message_id);
    }

    fn consume_message<'a>(&self, message_id: MessageId, consumer: Box<dyn FnOnce(&Message) + 'a>) -> bool {
        let removed = self.map.write().remove(&message_id);
        match removed {
            Some(message) => {
                consumer(&message);
                true
            }
            None => false,
        }
    }
}
