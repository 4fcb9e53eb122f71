use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tangle_hashes::MessageId;

/// Reader API for the parent → children back-reference index.
pub trait ChildrenStoreReader: Send + Sync {
    fn children(&self, parent: MessageId) -> Vec<MessageId>;
}

pub trait ChildrenStore: ChildrenStoreReader {
    fn insert_child(&self, parent: MessageId, child: MessageId);
    fn delete_child(&self, parent: MessageId, child: MessageId);
    fn delete_children(&self, parent: MessageId);
}

/// An in-memory implementation of `ChildrenStore` with concurrent readers support.
#[derive(Default)]
pub struct MemoryChildrenStore {
    map: RwLock<HashMap<MessageId, HashSet<MessageId>>>,
}

impl MemoryChildrenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChildrenStoreReader for MemoryChildrenStore {
    fn children(&self, parent: MessageId) -> Vec<MessageId> {
        self.map.read().get(&parent).map(|children| children.iter().copied().collect()).unwrap_or_default()
    }
}

impl ChildrenStore for MemoryChildrenStore {
    fn insert_child(&self, parent: MessageId, child: MessageId) {
        self.map.write().entry(parent).or_default().insert(child);
    }

    fn delete_child(&self, parent: MessageId, child: MessageId) {
        let mut map = self.map.write();
        if let Some(children) = map.get_mut(&parent) {
            children.remove(&child);
            if children.is_empty() {
                map.remove(&parent);
            }
        }
    }

    fn delete_children(&self, parent: MessageId) {
        self.map.write().remove(&parent);
    }
}
