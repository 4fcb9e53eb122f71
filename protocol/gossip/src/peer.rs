use crate::transport::Connection;
use parking_lot::RwLock;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tangle_core::events::Event;
use uuid::Uuid;

/// Opaque identity of a network peer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PeerId(Uuid);

impl PeerId {
    pub fn new_unique() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for PeerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// To be used for test purposes only
impl From<u64> for PeerId {
    fn from(word: u64) -> Self {
        Self(Uuid::from_u128(u128::from(word)))
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The manager's classification of a peer. Gossip is only allowed with peers
/// whose relation is not `Unknown`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PeerRelation {
    Unknown,
    Known,
    Autopeered,
}

impl PeerRelation {
    pub fn gossip_enabled(&self) -> bool {
        !matches!(self, PeerRelation::Unknown)
    }
}

impl Display for PeerRelation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerRelation::Unknown => write!(f, "unknown"),
            PeerRelation::Known => write!(f, "known"),
            PeerRelation::Autopeered => write!(f, "autopeered"),
        }
    }
}

/// A peer record as maintained by the peer manager.
#[derive(Debug)]
pub struct Peer {
    id: PeerId,
    relation: RwLock<PeerRelation>,
}

impl Peer {
    pub fn new(id: PeerId, relation: PeerRelation) -> Self {
        Self { id, relation: RwLock::new(relation) }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn relation(&self) -> PeerRelation {
        *self.relation.read()
    }

    pub fn set_relation(&self, relation: PeerRelation) {
        *self.relation.write() = relation;
    }
}

/// Events raised by the peer manager. The gossip service subscribes to all of
/// them; handlers must return quickly and must not block.
pub struct ManagerEvents {
    /// A new underlying connection was established (either direction).
    pub connected: Event<(Arc<Peer>, Arc<dyn Connection>)>,
    /// The connection to the peer was lost.
    pub disconnected: Event<Arc<Peer>>,
    /// The peer was reclassified; the payload carries the old relation.
    pub relation_updated: Event<(Arc<Peer>, PeerRelation)>,
}

impl ManagerEvents {
    pub fn new() -> Self {
        Self { connected: Event::new(), disconnected: Event::new(), relation_updated: Event::new() }
    }
}

impl Default for ManagerEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Contract of the peer manager collaborator.
pub trait PeerManager: Send + Sync {
    fn events(&self) -> &ManagerEvents;

    /// Synchronously hands the peer record to `f` if the peer is known.
    fn call(&self, peer_id: PeerId, f: &mut dyn FnMut(&Peer));
}
