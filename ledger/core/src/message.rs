use serde::{Deserialize, Serialize};
use tangle_hashes::MessageId;

/// A DAG node: two parent references and an opaque payload.
///
/// The payload codec is owned by an external collaborator; the ledger only
/// moves the bytes around.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    parent1: MessageId,
    parent2: MessageId,
    payload: Vec<u8>,
}

impl Message {
    pub fn new(id: MessageId, parent1: MessageId, parent2: MessageId, payload: Vec<u8>) -> Self {
        Self { id, parent1, parent2, payload }
    }

    pub fn id(&self) -> MessageId {
        self.id
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

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
