use crate::common::ProtocolError;
use crate::peer::PeerId;
use crate::transport::RawStream;
use log::debug;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tangle_core::trigger::SingleTrigger;
use tangle_ledger_core::milestone::MilestoneIndex;
use tokio::select;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{channel as mpsc_channel, Receiver as MpscReceiver, Sender as MpscSender};
use tokio::sync::oneshot::{channel as oneshot_channel, Sender as OneshotSender};

/// The incoming route is deliberately smaller than the send queue; a peer that
/// outpaces the local consumer ends its own session.
const INCOMING_ROUTE_CAPACITY: usize = 256;

/// Read buffer size of the session read loop.
const READ_BUFFER_SIZE: usize = 4096;

/// The peer's view of the ledger as taken from its latest heartbeat frame.
/// Decoding heartbeats is up to the codec that consumes the incoming route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Heartbeat {
    pub solid_milestone_index: MilestoneIndex,
    pub pruned_milestone_index: MilestoneIndex,
}

struct SessionMutableState {
    /// Used on session start to signal the read loop to start listening
    start_signal: Option<OneshotSender<()>>,

    /// Set on the first close call
    closed: bool,

    /// Handed out once to whoever consumes the inbound frames
    incoming_route: Option<MpscReceiver<Vec<u8>>>,
}

/// One live gossip stream bound to a single peer, with a bounded send queue
/// and a read loop. Lifecycle: created, running (after `start`), terminated
/// (after `close`).
pub struct ProtocolSession {
    peer_id: PeerId,
    stream: Arc<dyn RawStream>,
    send_queue: MpscSender<Vec<u8>>,
    shutdown: SingleTrigger,
    heartbeat: RwLock<Option<Heartbeat>>,
    mutable_state: Mutex<SessionMutableState>,
}

impl ProtocolSession {
    pub(crate) fn new(peer_id: PeerId, stream: Arc<dyn RawStream>, send_queue_size: usize) -> Arc<Self> {
        let (send_queue, mut send_receiver) = mpsc_channel::<Vec<u8>>(send_queue_size);
        let (incoming_sender, incoming_receiver) = mpsc_channel(INCOMING_ROUTE_CAPACITY);
        let (start_sender, start_receiver) = oneshot_channel();
        let shutdown = SingleTrigger::new();
        let read_shutdown = shutdown.listener.clone();
        let write_shutdown = shutdown.listener.clone();

        let session = Arc::new(Self {
            peer_id,
            stream,
            send_queue,
            shutdown,
            heartbeat: RwLock::new(None),
            mutable_state: Mutex::new(SessionMutableState {
                start_signal: Some(start_sender),
                closed: false,
                incoming_route: Some(incoming_receiver),
            }),
        });

        // read loop: forward raw frames to the incoming route until the remote
        // ends the stream or the session is closed
        let reader = session.clone();
        tokio::spawn(async move {
            // wait for a start signal before reading any frames
            let _ = start_receiver.await;
            let mut buf = vec![0u8; READ_BUFFER_SIZE];
            loop {
                select! {
                    biased;

                    _ = read_shutdown.clone() => break,

                    res = reader.stream.read(&mut buf) => match res {
                        Ok(0) => {
                            debug!("gossip stream with {} ended", reader.peer_id);
                            break;
                        }
                        Ok(n) => {
                            if incoming_sender.try_send(buf[..n].to_vec()).is_err() {
                                debug!("incoming route capacity for peer {} reached, ending read loop", reader.peer_id);
                                break;
                            }
                        }
                        Err(err) => {
                            debug!("gossip stream read error with {}: {}", reader.peer_id, err);
                            break;
                        }
                    }
                }
            }
        });

        // send loop: drain the queue onto the stream
        let writer = session.clone();
        tokio::spawn(async move {
            loop {
                select! {
                    biased;

                    _ = write_shutdown.clone() => break,

                    frame = send_receiver.recv() => match frame {
                        Some(frame) => {
                            if let Err(err) = writer.stream.write(&frame).await {
                                debug!("gossip stream write error with {}: {}", writer.peer_id, err);
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        });

        session
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub(crate) fn stream(&self) -> &Arc<dyn RawStream> {
        &self.stream
    }

    /// Enqueues an outbound frame without blocking.
    pub fn enqueue(&self, frame: Vec<u8>) -> Result<(), ProtocolError> {
        match self.send_queue.try_send(frame) {
            Ok(_) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(ProtocolError::ConnectionClosed),
            Err(TrySendError::Full(_)) => Err(ProtocolError::SendQueueFull(self.peer_id)),
        }
    }

    /// Hands out the inbound frame receiver. The codec driving this session
    /// takes it exactly once.
    pub fn take_incoming_route(&self) -> Option<MpscReceiver<Vec<u8>>> {
        self.mutable_state.lock().incoming_route.take()
    }

    /// Signals the read loop to start listening.
    pub fn start(&self) {
        let signal = self.mutable_state.lock().start_signal.take();
        if let Some(signal) = signal {
            let _ = signal.send(());
        } else {
            debug!("gossip session start was called more than once, peer: {}", self.peer_id);
        }
    }

    /// Ends both loops. Returns true if this is the first call.
    pub fn close(&self) -> bool {
        {
            let mut state = self.mutable_state.lock();

            // make sure the start signal was fired, in case start was never called
            if let Some(signal) = state.start_signal.take() {
                let _ = signal.send(());
            }

            if state.closed {
                debug!("gossip session close was called more than once, peer: {}", self.peer_id);
                return false;
            }
            state.closed = true;
        }
        self.shutdown.trigger.trigger();
        true
    }

    pub fn latest_heartbeat(&self) -> Option<Heartbeat> {
        *self.heartbeat.read()
    }

    pub fn set_heartbeat(&self, heartbeat: Heartbeat) {
        *self.heartbeat.write() = Some(heartbeat);
    }

    /// Whether the peer appears synchronized given its latest heartbeat.
    pub fn is_synchronized(&self, latest_milestone_index: MilestoneIndex) -> bool {
        self.latest_heartbeat().is_some_and(|heartbeat| heartbeat.solid_milestone_index >= latest_milestone_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Connection, Direction, ProtocolId};
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::time::Duration;

    struct TestConnection(PeerId);

    impl Connection for TestConnection {
        fn remote_peer(&self) -> PeerId {
            self.0
        }
        fn direction(&self) -> Direction {
            Direction::Inbound
        }
        fn close(&self) -> Result<(), ProtocolError> {
            Ok(())
        }
    }

    /// Serves a fixed set of frames, then blocks; writes park forever.
    struct TestStream {
        peer_id: PeerId,
        frames: SyncMutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl RawStream for TestStream {
        fn protocol(&self) -> ProtocolId {
            "/test/1.0.0"
        }
        fn connection(&self) -> Arc<dyn Connection> {
            Arc::new(TestConnection(self.peer_id))
        }
        async fn read(&self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
            if buf.is_empty() {
                return Ok(0);
            }
            let frame = self.frames.lock().pop();
            match frame {
                Some(frame) => {
                    buf[..frame.len()].copy_from_slice(&frame);
                    Ok(frame.len())
                }
                None => std::future::pending().await,
            }
        }
        async fn write(&self, _buf: &[u8]) -> Result<usize, ProtocolError> {
            std::future::pending().await
        }
        fn reset(&self) -> Result<(), ProtocolError> {
            Ok(())
        }
    }

    fn test_stream(peer_id: PeerId, frames: Vec<Vec<u8>>) -> Arc<dyn RawStream> {
        Arc::new(TestStream { peer_id, frames: SyncMutex::new(frames) })
    }

    #[tokio::test]
    async fn test_frames_flow_to_the_incoming_route() {
        let peer_id = PeerId::from(1u64);
        let session = ProtocolSession::new(peer_id, test_stream(peer_id, vec![b"hello".to_vec()]), 4);
        let mut route = session.take_incoming_route().unwrap();
        assert!(session.take_incoming_route().is_none());

        session.start();
        let frame = tokio::time::timeout(Duration::from_secs(1), route.recv()).await.unwrap().unwrap();
        assert_eq!(frame, b"hello");
        session.close();
    }

    #[tokio::test]
    async fn test_enqueue_reports_a_full_queue() {
        let peer_id = PeerId::from(2u64);
        // writes never complete, so at most one frame is in flight
        let session = ProtocolSession::new(peer_id, test_stream(peer_id, vec![]), 1);
        session.start();

        // fill the queue until it reports backpressure
        let mut full = false;
        for _ in 0..3 {
            match session.enqueue(b"frame".to_vec()) {
                Ok(()) => {}
                Err(ProtocolError::SendQueueFull(peer)) => {
                    assert_eq!(peer, peer_id);
                    full = true;
                    break;
                }
                Err(err) => panic!("unexpected error: {err}"),
            }
            tokio::task::yield_now().await;
        }
        assert!(full);
        session.close();
    }

    #[tokio::test]
    async fn test_enqueue_after_close_reports_closed() {
        let peer_id = PeerId::from(3u64);
        let session = ProtocolSession::new(peer_id, test_stream(peer_id, vec![]), 4);
        session.start();

        assert!(session.close());
        assert!(!session.close());

        // give the send loop a moment to observe the shutdown
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(session.enqueue(b"late".to_vec()), Err(ProtocolError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_heartbeat_drives_synchronized_check() {
        let peer_id = PeerId::from(4u64);
        let session = ProtocolSession::new(peer_id, test_stream(peer_id, vec![]), 4);

        assert_eq!(session.latest_heartbeat(), None);
        assert!(!session.is_synchronized(10));

        let heartbeat = Heartbeat { solid_milestone_index: 12, pruned_milestone_index: 2 };
        session.set_heartbeat(heartbeat);
        assert_eq!(session.latest_heartbeat(), Some(heartbeat));
        assert!(session.is_synchronized(10));
        assert!(!session.is_synchronized(13));
        session.close();
    }
}
