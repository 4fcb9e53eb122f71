use crate::peer::PeerId;
use std::time::Duration;
use thiserror::Error;

/// Default capacity of a session's outbound frame queue.
pub const DEFAULT_SEND_QUEUE_SIZE: usize = 1000;

/// Default timeout for opening a gossip protocol stream.
pub const DEFAULT_STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    #[error("timeout expired after {0:?}")]
    Timeout(Duration),

    #[error("peer stream is closed")]
    ConnectionClosed,

    #[error("send queue capacity has been reached (peer: {0})")]
    SendQueueFull(PeerId),

    #[error("unable to create gossip stream to {0}: {1}")]
    StreamOpen(PeerId, String),

    #[error("unable to cleanly reset stream to {0}: {1}")]
    StreamReset(PeerId, String),

    #[error("{0}")]
    Other(&'static str),
}

/// Options for a gossip `Service`.
#[derive(Clone, Copy, Debug)]
pub struct GossipConfig {
    /// Capacity of the outbound frame queue of each session.
    pub send_queue_size: usize,
    /// Timeout for opening a protocol stream.
    pub stream_connect_timeout: Duration,
    /// Whether the service attaches default log handlers to its events.
    pub log_events: bool,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            send_queue_size: DEFAULT_SEND_QUEUE_SIZE,
            stream_connect_timeout: DEFAULT_STREAM_CONNECT_TIMEOUT,
            log_events: true,
        }
    }
}
