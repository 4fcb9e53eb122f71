use crate::common::ProtocolError;
use crate::session::ProtocolSession;
use crate::transport::RawStream;
use log::{error, info};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tangle_core::events::Event;

/// Why an inbound stream was rejected before a session was created.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StreamCancelReason {
    /// Accepting the stream would lead to a duplicated ongoing stream.
    Duplicated,
    /// The relation to the other peer does not allow gossip.
    InsufficientPeerRelation,
}

impl Display for StreamCancelReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamCancelReason::Duplicated => write!(f, "duplicated stream"),
            StreamCancelReason::InsufficientPeerRelation => write!(f, "insufficient peer relation"),
        }
    }
}

/// Events happening around a gossip `Service`.
///
/// Handlers run synchronously on the service's event loop; they must not call
/// back into the service's request API.
pub struct ServiceEvents {
    /// Fired when a protocol session has been started.
    pub protocol_started: Event<Arc<ProtocolSession>>,
    /// Fired when a protocol session has ended.
    pub protocol_terminated: Event<Arc<ProtocolSession>>,
    /// Fired when an inbound stream gets cancelled.
    pub inbound_stream_cancelled: Event<(Arc<dyn RawStream>, StreamCancelReason)>,
    /// Fired when an internal error happens.
    pub error: Event<ProtocolError>,
}

impl ServiceEvents {
    pub(crate) fn new() -> Self {
        Self {
            protocol_started: Event::new(),
            protocol_terminated: Event::new(),
            inbound_stream_cancelled: Event::new(),
            error: Event::new(),
        }
    }

    /// Attaches the default log handlers.
    pub(crate) fn register_logger(&self) {
        self.protocol_started.attach(|session: &Arc<ProtocolSession>| {
            info!("started protocol with {}", session.peer_id());
        });
        self.protocol_terminated.attach(|session: &Arc<ProtocolSession>| {
            info!("terminated protocol with {}", session.peer_id());
        });
        self.inbound_stream_cancelled.attach(|(stream, reason): &(Arc<dyn RawStream>, StreamCancelReason)| {
            info!("cancelled inbound protocol stream from {}: {}", stream.connection().remote_peer(), reason);
        });
        self.error.attach(|err: &ProtocolError| {
            error!("{}", err);
        });
    }
}
