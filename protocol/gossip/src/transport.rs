//! Contracts of the stream transport collaborator.

use crate::common::ProtocolError;
use crate::peer::PeerId;
use async_trait::async_trait;
use std::sync::Arc;

/// Identifier of a wire protocol spoken over a stream.
pub type ProtocolId = &'static str;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// An underlying peer connection which can multiplex several streams.
pub trait Connection: Send + Sync {
    fn remote_peer(&self) -> PeerId;
    fn direction(&self) -> Direction;
    fn close(&self) -> Result<(), ProtocolError>;
}

/// One bidirectional byte stream on top of a connection.
#[async_trait]
pub trait RawStream: Send + Sync {
    fn protocol(&self) -> ProtocolId;
    fn connection(&self) -> Arc<dyn Connection>;
    async fn read(&self, buf: &mut [u8]) -> Result<usize, ProtocolError>;
    async fn write(&self, buf: &[u8]) -> Result<usize, ProtocolError>;
    /// Abruptly terminates both directions of the stream.
    fn reset(&self) -> Result<(), ProtocolError>;
}

pub type StreamHandler = Box<dyn Fn(Arc<dyn RawStream>) + Send + Sync>;

/// Observer of transport-level stream lifecycle. Only stream closure is
/// reported; the service filters for its own protocol id.
pub trait StreamNotifiee: Send + Sync {
    fn closed_stream(&self, stream: Arc<dyn RawStream>);
}

#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Registers the handler invoked for every inbound stream carrying
    /// `protocol`.
    fn set_stream_handler(&self, protocol: ProtocolId, handler: StreamHandler);

    fn remove_stream_handler(&self, protocol: ProtocolId);

    async fn new_stream(&self, peer_id: PeerId, protocol: ProtocolId) -> Result<Arc<dyn RawStream>, ProtocolError>;

    fn notify(&self, notifiee: Arc<dyn StreamNotifiee>);

    fn stop_notify(&self, notifiee: &Arc<dyn StreamNotifiee>);
}
