use crate::common::{GossipConfig, ProtocolError};
use crate::events::{ServiceEvents, StreamCancelReason};
use crate::peer::{Peer, PeerId, PeerManager, PeerRelation};
use crate::session::ProtocolSession;
use crate::transport::{Connection, Direction, ProtocolId, RawStream, StreamNotifiee, StreamTransport};
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tangle_core::task::{AsyncService, AsyncServiceFuture};
use tangle_core::trigger::SingleTrigger;
use tangle_ledger_core::milestone::MilestoneIndex;
use tokio::select;
use tokio::sync::mpsc::{channel as mpsc_channel, Receiver as MpscReceiver, Sender as MpscSender};
use tokio::sync::oneshot::{channel as oneshot_channel, Sender as OneshotSender};

pub const GOSSIP_PROTOCOL_ID: ProtocolId = "/tangle/gossip/1.0.0";

const GOSSIP_SERVICE: &str = "gossip-service";

/// Capacity of the channels feeding the event loop. Posting callbacks never
/// block: when the loop is gone or congested the event is dropped instead.
const EVENT_CHANNEL_CAPACITY: usize = 256;

struct ConnectedMsg {
    peer: Arc<Peer>,
    connection: Arc<dyn Connection>,
}

struct DisconnectedMsg {
    peer: Arc<Peer>,
}

struct StreamClosedMsg {
    peer_id: PeerId,
}

struct RelationUpdatedMsg {
    peer: Arc<Peer>,
    old_relation: PeerRelation,
}

struct StreamRequestMsg {
    peer_id: PeerId,
    reply: OneshotSender<Option<Arc<ProtocolSession>>>,
}

/// Used in `Service::for_each`. Returning false stops the iteration.
/// The callback must not call any request methods on the service.
pub type SessionForEachFn = Box<dyn FnMut(&Arc<ProtocolSession>) -> bool + Send>;

struct ForEachMsg {
    f: SessionForEachFn,
    done: OneshotSender<()>,
}

struct ServiceSenders {
    inbound_stream: MpscSender<Arc<dyn RawStream>>,
    connected: MpscSender<ConnectedMsg>,
    disconnected: MpscSender<DisconnectedMsg>,
    stream_closed: MpscSender<StreamClosedMsg>,
    relation_updated: MpscSender<RelationUpdatedMsg>,
    stream_request: MpscSender<StreamRequestMsg>,
    for_each: MpscSender<ForEachMsg>,
}

struct ServiceReceivers {
    inbound_stream: MpscReceiver<Arc<dyn RawStream>>,
    connected: MpscReceiver<ConnectedMsg>,
    disconnected: MpscReceiver<DisconnectedMsg>,
    stream_closed: MpscReceiver<StreamClosedMsg>,
    relation_updated: MpscReceiver<RelationUpdatedMsg>,
    stream_request: MpscReceiver<StreamRequestMsg>,
    for_each: MpscReceiver<ForEachMsg>,
}

/// Forwards transport stream closures into the event loop, filtered by
/// protocol id.
struct ServiceNotifiee {
    protocol: ProtocolId,
    stream_closed: MpscSender<StreamClosedMsg>,
}

impl StreamNotifiee for ServiceNotifiee {
    fn closed_stream(&self, stream: Arc<dyn RawStream>) {
        if stream.protocol() != self.protocol {
            return;
        }
        // the loop may already be gone during shutdown; the stream was reset
        // either way, so dropping the notification is safe
        let msg = StreamClosedMsg { peer_id: stream.connection().remote_peer() };
        if self.stream_closed.try_send(msg).is_err() {
            debug!("gossip event loop unavailable, dropping closed-stream notification");
        }
    }
}

/// Handles ongoing gossip streams, one per peer.
///
/// All reads and mutations of the session map happen inside a single event
/// loop; external callers post request messages and await the reply. After
/// shutdown the loop drops its request channels, so pending and later requests
/// resolve to nothing instead of blocking.
pub struct Service {
    events: ServiceEvents,
    host: Arc<dyn StreamTransport>,
    manager: Arc<dyn PeerManager>,
    protocol: ProtocolId,
    config: GossipConfig,
    senders: ServiceSenders,
    receivers: Mutex<Option<ServiceReceivers>>,
    shutdown: SingleTrigger,
}

impl Service {
    pub fn new(host: Arc<dyn StreamTransport>, manager: Arc<dyn PeerManager>, config: GossipConfig) -> Arc<Self> {
        let (inbound_stream_tx, inbound_stream_rx) = mpsc_channel(EVENT_CHANNEL_CAPACITY);
        let (connected_tx, connected_rx) = mpsc_channel(EVENT_CHANNEL_CAPACITY);
        let (disconnected_tx, disconnected_rx) = mpsc_channel(EVENT_CHANNEL_CAPACITY);
        let (stream_closed_tx, stream_closed_rx) = mpsc_channel(EVENT_CHANNEL_CAPACITY);
        let (relation_updated_tx, relation_updated_rx) = mpsc_channel(EVENT_CHANNEL_CAPACITY);
        let (stream_request_tx, stream_request_rx) = mpsc_channel(EVENT_CHANNEL_CAPACITY);
        let (for_each_tx, for_each_rx) = mpsc_channel(EVENT_CHANNEL_CAPACITY);

        let events = ServiceEvents::new();
        if config.log_events {
            events.register_logger();
        }

        Arc::new(Self {
            events,
            host,
            manager,
            protocol: GOSSIP_PROTOCOL_ID,
            config,
            senders: ServiceSenders {
                inbound_stream: inbound_stream_tx,
                connected: connected_tx,
                disconnected: disconnected_tx,
                stream_closed: stream_closed_tx,
                relation_updated: relation_updated_tx,
                stream_request: stream_request_tx,
                for_each: for_each_tx,
            },
            receivers: Mutex::new(Some(ServiceReceivers {
                inbound_stream: inbound_stream_rx,
                connected: connected_rx,
                disconnected: disconnected_rx,
                stream_closed: stream_closed_rx,
                relation_updated: relation_updated_rx,
                stream_request: stream_request_rx,
                for_each: for_each_rx,
            })),
            shutdown: SingleTrigger::new(),
        })
    }

    pub fn events(&self) -> &ServiceEvents {
        &self.events
    }

    /// Returns the session for the given peer, or `None` if there is none or
    /// the event loop is gone.
    pub async fn protocol(&self, peer_id: PeerId) -> Option<Arc<ProtocolSession>> {
        let (reply, response) = oneshot_channel();
        if self.senders.stream_request.send(StreamRequestMsg { peer_id, reply }).await.is_err() {
            return None;
        }
        response.await.unwrap_or(None)
    }

    /// Calls `f` on each session. The iteration runs on the event loop between
    /// event handlers, so it observes a consistent snapshot.
    pub async fn for_each<F>(&self, f: F)
    where
        F: FnMut(&Arc<ProtocolSession>) -> bool + Send + 'static,
    {
        let (done, finished) = oneshot_channel();
        if self.senders.for_each.send(ForEachMsg { f: Box::new(f), done }).await.is_err() {
            return;
        }
        let _ = finished.await;
    }

    /// Counts the sessions whose peers appear synchronized given their latest
    /// heartbeat.
    pub async fn synchronized_count(&self, latest_milestone_index: MilestoneIndex) -> usize {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        self.for_each(move |session| {
            if session.is_synchronized(latest_milestone_index) {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            true
        })
        .await;
        count.load(Ordering::Relaxed)
    }

    /// Wires the transport and manager callbacks onto the loop's channels and
    /// runs the event loop until shutdown. All callbacks only post and return;
    /// no external handler ever runs on the loop's thread except through the
    /// loop's own dispatch.
    pub async fn run(self: Arc<Self>) {
        let inbound = self.senders.inbound_stream.clone();
        self.host.set_stream_handler(
            self.protocol,
            Box::new(move |stream| {
                if inbound.try_send(stream).is_err() {
                    debug!("gossip event loop unavailable, dropping inbound stream");
                }
            }),
        );

        let connected = self.senders.connected.clone();
        self.manager.events().connected.attach(move |(peer, connection): &(Arc<Peer>, Arc<dyn Connection>)| {
            let msg = ConnectedMsg { peer: peer.clone(), connection: connection.clone() };
            if connected.try_send(msg).is_err() {
                debug!("gossip event loop unavailable, dropping connected event");
            }
        });

        let disconnected = self.senders.disconnected.clone();
        self.manager.events().disconnected.attach(move |peer: &Arc<Peer>| {
            if disconnected.try_send(DisconnectedMsg { peer: peer.clone() }).is_err() {
                debug!("gossip event loop unavailable, dropping disconnected event");
            }
        });

        let relation_updated = self.senders.relation_updated.clone();
        self.manager.events().relation_updated.attach(move |(peer, old_relation): &(Arc<Peer>, PeerRelation)| {
            let msg = RelationUpdatedMsg { peer: peer.clone(), old_relation: *old_relation };
            if relation_updated.try_send(msg).is_err() {
                debug!("gossip event loop unavailable, dropping relation-updated event");
            }
        });

        let notifiee: Arc<dyn StreamNotifiee> =
            Arc::new(ServiceNotifiee { protocol: self.protocol, stream_closed: self.senders.stream_closed.clone() });
        self.host.notify(notifiee.clone());

        let receivers = self.receivers.lock().take().expect("gossip service can only be run once");
        self.event_loop(receivers).await;

        self.host.remove_stream_handler(self.protocol);
        self.host.stop_notify(&notifiee);
    }

    /// The single writer of the session map.
    async fn event_loop(&self, mut rx: ServiceReceivers) {
        let mut streams: HashMap<PeerId, Arc<ProtocolSession>> = HashMap::new();
        let shutdown = self.shutdown.listener.clone();
        loop {
            select! {
                biased;

                _ = shutdown.clone() => break,

                Some(stream) = rx.inbound_stream.recv() => {
                    if let Some(session) = self.handle_inbound_stream(&mut streams, stream) {
                        self.events.protocol_started.trigger(&session);
                        session.start();
                    }
                }

                Some(msg) = rx.connected.recv() => {
                    match self.handle_connected(&mut streams, msg.peer, msg.connection).await {
                        Ok(Some(session)) => {
                            self.events.protocol_started.trigger(&session);
                            session.start();
                        }
                        Ok(None) => {}
                        Err(err) => self.events.error.trigger(&err),
                    }
                }

                Some(msg) = rx.disconnected.recv() => {
                    self.close_stream(&mut streams, msg.peer.id());
                }

                Some(msg) = rx.stream_closed.recv() => {
                    self.close_stream(&mut streams, msg.peer_id);
                }

                Some(msg) = rx.relation_updated.recv() => {
                    match self.handle_relation_updated(&mut streams, msg.peer, msg.old_relation).await {
                        Ok(Some(session)) => {
                            self.events.protocol_started.trigger(&session);
                            session.start();
                        }
                        Ok(None) => {}
                        Err(err) => self.events.error.trigger(&err),
                    }
                }

                Some(msg) = rx.stream_request.recv() => {
                    let _ = msg.reply.send(streams.get(&msg.peer_id).cloned());
                }

                Some(mut msg) = rx.for_each.recv() => {
                    for session in streams.values() {
                        if !(msg.f)(session) {
                            break;
                        }
                    }
                    let _ = msg.done.send(());
                }

                else => break,
            }
        }
        debug!("gossip service event loop exited");
    }

    /// Handles an incoming stream; rejects it when a session already exists or
    /// the peer's relation does not allow gossip.
    fn handle_inbound_stream(
        &self,
        streams: &mut HashMap<PeerId, Arc<ProtocolSession>>,
        stream: Arc<dyn RawStream>,
    ) -> Option<Arc<ProtocolSession>> {
        let remote_peer_id = stream.connection().remote_peer();

        if streams.contains_key(&remote_peer_id) {
            self.events.inbound_stream_cancelled.trigger(&(stream.clone(), StreamCancelReason::Duplicated));
            self.close_unwanted_stream(&stream);
            return None;
        }

        let mut gossip_enabled = false;
        self.manager.call(remote_peer_id, &mut |peer| {
            gossip_enabled = peer.relation().gossip_enabled();
        });
        if !gossip_enabled {
            self.events.inbound_stream_cancelled.trigger(&(stream.clone(), StreamCancelReason::InsufficientPeerRelation));
            self.close_unwanted_stream(&stream);
            return None;
        }

        Some(self.register_session(streams, remote_peer_id, stream))
    }

    /// Closing the connection and resetting the stream is the only combination
    /// that makes the remote's closed-stream notifiee fire, so the remote
    /// deregisters the stream as well.
    fn close_unwanted_stream(&self, stream: &Arc<dyn RawStream>) {
        let _ = stream.connection().close();
        let _ = stream.reset();
    }

    /// Opens a protocol stream when we connected outbound and no session is
    /// ongoing. For inbound connections the remote initiates and
    /// `handle_inbound_stream` takes over.
    async fn handle_connected(
        &self,
        streams: &mut HashMap<PeerId, Arc<ProtocolSession>>,
        peer: Arc<Peer>,
        connection: Arc<dyn Connection>,
    ) -> Result<Option<Arc<ProtocolSession>>, ProtocolError> {
        if streams.contains_key(&peer.id()) {
            return Ok(None);
        }

        if connection.direction() != Direction::Outbound {
            return Ok(None);
        }

        let stream = self.open_stream(peer.id()).await?;
        Ok(Some(self.register_session(streams, peer.id(), stream)))
    }

    /// Closes the ongoing stream when the peer is downgraded to unknown, and
    /// starts one when the new relation allows gossip. The stream may be opened
    /// even on an inbound connection: duplicate suppression on the inbound path
    /// keeps the one-session invariant.
    async fn handle_relation_updated(
        &self,
        streams: &mut HashMap<PeerId, Arc<ProtocolSession>>,
        peer: Arc<Peer>,
        _old_relation: PeerRelation,
    ) -> Result<Option<Arc<ProtocolSession>>, ProtocolError> {
        if !peer.relation().gossip_enabled() {
            self.close_stream(streams, peer.id());
            return Ok(None);
        }

        if streams.contains_key(&peer.id()) {
            return Ok(None);
        }

        let stream = self.open_stream(peer.id()).await?;
        Ok(Some(self.register_session(streams, peer.id(), stream)))
    }

    async fn open_stream(&self, peer_id: PeerId) -> Result<Arc<dyn RawStream>, ProtocolError> {
        let stream = tokio::time::timeout(self.config.stream_connect_timeout, self.host.new_stream(peer_id, self.protocol))
            .await
            .map_err(|_| ProtocolError::Timeout(self.config.stream_connect_timeout))?
            .map_err(|err| ProtocolError::StreamOpen(peer_id, err.to_string()))?;
        // a zero-length read forces the remote to run its stream handler before
        // the first payload frame arrives; the result is irrelevant
        let _ = stream.read(&mut []).await;
        Ok(stream)
    }

    fn register_session(
        &self,
        streams: &mut HashMap<PeerId, Arc<ProtocolSession>>,
        peer_id: PeerId,
        stream: Arc<dyn RawStream>,
    ) -> Arc<ProtocolSession> {
        let session = ProtocolSession::new(peer_id, stream, self.config.send_queue_size);
        streams.insert(peer_id, session.clone());
        session
    }

    /// Removes and terminates the session of the given peer, if any. Reset
    /// errors are surfaced but never prevent the removal, so every started
    /// session terminates exactly once.
    fn close_stream(&self, streams: &mut HashMap<PeerId, Arc<ProtocolSession>>, peer_id: PeerId) {
        let Some(session) = streams.remove(&peer_id) else {
            return;
        };
        session.close();
        if let Err(err) = session.stream().reset() {
            self.events.error.trigger(&ProtocolError::StreamReset(peer_id, err.to_string()));
        }
        self.events.protocol_terminated.trigger(&session);
    }
}

impl AsyncService for Service {
    fn ident(self: Arc<Self>) -> &'static str {
        GOSSIP_SERVICE
    }

    fn start(self: Arc<Self>) -> AsyncServiceFuture {
        Box::pin(async move {
            self.run().await;
            Ok(())
        })
    }

    fn signal_exit(self: Arc<Self>) {
        self.shutdown.trigger.trigger();
    }

    fn stop(self: Arc<Self>) -> AsyncServiceFuture {
        Box::pin(async move { Ok(()) })
    }
}
