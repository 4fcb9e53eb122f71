pub mod common;
pub mod events;
pub mod peer;
pub mod service;
pub mod session;
pub mod transport;

pub use common::{GossipConfig, ProtocolError};
pub use events::{ServiceEvents, StreamCancelReason};
pub use peer::{Peer, PeerId, PeerManager, PeerRelation};
pub use service::{Service, GOSSIP_PROTOCOL_ID};
pub use session::ProtocolSession;
