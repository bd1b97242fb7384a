//! ConnectionManager: owns the TCP transport for both peer roles.
//!
//! A node is always a passive listener once [`ConnectionManager::start_listener`]
//! has run, and becomes an active client when a target is set. Every accepted
//! connection and the outbound connection get their own receive loop; decoded
//! payloads are not interpreted here, they are handed to the application layer
//! as [`ConnectionEvent::Frame`] events.
//!
//! ```text
//! listener ──accept──▶ inbound link ──receive loop──┐
//!                                                   ├──▶ mpsc<ConnectionEvent>
//! set_target ──connect (retry)──▶ outbound link ────┘
//! ```
//!
//! A generation counter guards the outbound slot: every `set_target` and
//! `disconnect` bumps it, so a connect attempt or receive loop that belongs to
//! an older target can never overwrite the state of a newer one.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use edgeshare_core::protocol::{encode_packet, CodecError, Packet, DEFAULT_PORT};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::transport::{read_frame, FrameWriter, TransportError};
use crate::application::forward_input::PacketSink;

/// Error type for connection management operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("no outbound connection")]
    NotConnected,
    #[error("inbound connection {0} not found")]
    UnknownLink(Uuid),
    #[error("send failed: {0}")]
    Send(#[source] TransportError),
    #[error("packet could not be encoded: {0}")]
    Encode(#[from] CodecError),
    #[error("connection manager has shut down")]
    Stopped,
}

/// Configuration for the network service.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    pub connect_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            connect_attempts: 5,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// State of the outbound (active) role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundState {
    NotConnected,
    Connecting,
    Connected,
}

/// Which connection a frame arrived on, and where a reply should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkId {
    Outbound,
    Inbound(Uuid),
}

/// Why the outbound connection went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Every connect attempt failed.
    RetriesExhausted,
    SendFailed,
    PeerClosed,
    /// The peer sent an invalid frame.
    ProtocolError,
}

/// Events emitted by the connection manager to the application layer.
#[derive(Debug)]
pub enum ConnectionEvent {
    InboundAccepted {
        link: Uuid,
        peer: SocketAddr,
    },
    InboundClosed {
        link: Uuid,
        peer: SocketAddr,
    },
    OutboundConnected {
        peer: SocketAddr,
    },
    OutboundDisconnected {
        peer: SocketAddr,
        reason: DisconnectReason,
    },
    /// One complete frame payload.
    Frame {
        link: LinkId,
        payload: Vec<u8>,
    },
}

type SharedWriter = Arc<FrameWriter<OwnedWriteHalf>>;

/// Registered inbound connection.
struct InboundLink {
    peer: SocketAddr,
    writer: SharedWriter,
}

#[derive(Default)]
struct OutboundSlot {
    generation: u64,
    state: Option<OutboundState>,
    peer: Option<SocketAddr>,
    writer: Option<SharedWriter>,
    connect_task: Option<JoinHandle<()>>,
    reader_task: Option<JoinHandle<()>>,
}

impl OutboundSlot {
    /// Invalidates the current generation and aborts its tasks, handing back
    /// the writer for the caller to close outside the lock.
    fn reset(&mut self) -> Option<SharedWriter> {
        self.generation += 1;
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(peer) = self.peer.take() {
            info!(%peer, "outbound connection closed");
        }
        self.state = None;
        self.writer.take()
    }
}

/// How a receive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    PeerClosed,
    Protocol,
    Shutdown,
    ReceiverGone,
}

/// The connection manager.
pub struct ConnectionManager {
    config: NetworkConfig,
    event_tx: mpsc::Sender<ConnectionEvent>,
    outbound: Mutex<OutboundSlot>,
    inbound: RwLock<HashMap<Uuid, InboundLink>>,
    shutdown_tx: watch::Sender<bool>,
}

impl ConnectionManager {
    /// Creates a new connection manager and returns it together with the event receiver.
    pub fn new(config: NetworkConfig) -> (Arc<Self>, mpsc::Receiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::channel(256);
        let (shutdown_tx, _) = watch::channel(false);
        let mgr = Arc::new(Self {
            config,
            event_tx: tx,
            outbound: Mutex::new(OutboundSlot::default()),
            inbound: RwLock::new(HashMap::new()),
            shutdown_tx,
        });
        (mgr, rx)
    }

    /// Binds the listening socket and spawns the accept loop.
    ///
    /// Returns the bound address (useful when the configured port is 0).
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] if the socket cannot be bound.
    pub async fn start_listener(self: &Arc<Self>) -> Result<SocketAddr, NetworkError> {
        let addr = SocketAddr::new(self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| NetworkError::BindFailed { addr, source })?;
        let local = listener
            .local_addr()
            .map_err(|source| NetworkError::BindFailed { addr, source })?;
        info!(%local, "listening for peers");

        let this = Arc::clone(self);
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => this.register_inbound(stream, peer).await,
                        Err(e) => warn!("accept failed: {e}"),
                    },
                    _ = shutdown.changed() => break,
                }
            }
            debug!(%local, "accept loop stopped");
        });

        Ok(local)
    }

    /// Aims the active role at `addr`.
    ///
    /// Any existing outbound connection is torn down first. Connecting happens
    /// in the background; the outcome arrives as
    /// [`ConnectionEvent::OutboundConnected`] or
    /// [`ConnectionEvent::OutboundDisconnected`] with
    /// [`DisconnectReason::RetriesExhausted`].
    ///
    /// # Errors
    ///
    /// [`NetworkError::Stopped`] after [`ConnectionManager::shutdown`].
    pub async fn set_target(self: &Arc<Self>, addr: SocketAddr) -> Result<(), NetworkError> {
        let mut slot = self.outbound.lock().await;
        if *self.shutdown_tx.borrow() {
            return Err(NetworkError::Stopped);
        }
        // Teardown and respawn share one lock so overlapping calls cannot
        // both claim the same generation.
        let old_writer = slot.reset();
        let generation = slot.generation;
        slot.state = Some(OutboundState::Connecting);
        slot.peer = Some(addr);

        let this = Arc::clone(self);
        slot.connect_task = Some(tokio::spawn(async move {
            this.connect_with_retry(addr, generation).await;
        }));
        drop(slot);

        if let Some(writer) = old_writer {
            writer.close().await;
        }
        Ok(())
    }

    /// Closes the outbound connection, if any. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let writer = self.outbound.lock().await.reset();
        if let Some(writer) = writer {
            writer.close().await;
        }
    }

    /// Stops the listener, every receive loop and the outbound connection.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        self.disconnect().await;
        let links: Vec<InboundLink> = self.inbound.write().await.drain().map(|(_, l)| l).collect();
        for link in links {
            link.writer.close().await;
        }
        info!("connection manager stopped");
    }

    pub async fn outbound_state(&self) -> OutboundState {
        self.outbound
            .lock()
            .await
            .state
            .unwrap_or(OutboundState::NotConnected)
    }

    /// Address of the current outbound target.
    pub async fn target(&self) -> Option<SocketAddr> {
        self.outbound.lock().await.peer
    }

    pub async fn inbound_count(&self) -> usize {
        self.inbound.read().await.len()
    }

    /// Sends one frame on the outbound connection.
    ///
    /// A write failure tears the outbound connection down and raises
    /// [`ConnectionEvent::OutboundDisconnected`].
    ///
    /// # Errors
    ///
    /// [`NetworkError::NotConnected`] without a connected target;
    /// [`NetworkError::Send`] if the write fails.
    pub async fn send_frame(&self, payload: &[u8]) -> Result<(), NetworkError> {
        let (writer, generation) = {
            let slot = self.outbound.lock().await;
            match &slot.writer {
                Some(w) => (Arc::clone(w), slot.generation),
                None => return Err(NetworkError::NotConnected),
            }
        };

        if let Err(e) = writer.send(payload).await {
            warn!("outbound send failed: {e}");
            self.drop_outbound(generation, DisconnectReason::SendFailed, true)
                .await;
            return Err(NetworkError::Send(e));
        }
        Ok(())
    }

    /// Encodes and sends a packet on the outbound connection.
    pub async fn send_packet(&self, packet: &Packet) -> Result<(), NetworkError> {
        let payload = encode_packet(packet)?;
        trace!(tag = ?packet.packet_type(), "sending packet");
        self.send_frame(&payload).await
    }

    /// Sends a packet back on the connection identified by `link`.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownLink`] if the inbound connection is gone.
    pub async fn reply(&self, link: LinkId, packet: &Packet) -> Result<(), NetworkError> {
        let id = match link {
            LinkId::Outbound => return self.send_packet(packet).await,
            LinkId::Inbound(id) => id,
        };
        let writer = self
            .inbound
            .read()
            .await
            .get(&id)
            .map(|l| Arc::clone(&l.writer))
            .ok_or(NetworkError::UnknownLink(id))?;
        let payload = encode_packet(packet)?;
        // The inbound receive loop notices a dead socket on its own.
        writer.send(&payload).await.map_err(NetworkError::Send)
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    async fn register_inbound(self: &Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%peer, "could not disable Nagle on inbound socket: {e}");
        }
        let (reader, writer) = stream.into_split();
        let link = Uuid::new_v4();
        self.inbound.write().await.insert(
            link,
            InboundLink {
                peer,
                writer: Arc::new(FrameWriter::new(writer)),
            },
        );
        info!(%peer, %link, "peer connected");
        let _ = self
            .event_tx
            .send(ConnectionEvent::InboundAccepted { link, peer })
            .await;

        let this = Arc::clone(self);
        let shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let exit =
                receive_loop(reader, LinkId::Inbound(link), &this.event_tx, shutdown).await;
            this.inbound.write().await.remove(&link);
            info!(%peer, %link, ?exit, "peer connection closed");
            let _ = this
                .event_tx
                .send(ConnectionEvent::InboundClosed { link, peer })
                .await;
        });
    }

    async fn connect_with_retry(self: Arc<Self>, addr: SocketAddr, generation: u64) {
        let attempts = self.config.connect_attempts.max(1);
        for attempt in 1..=attempts {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    self.install_outbound(stream, addr, generation).await;
                    return;
                }
                Err(e) => {
                    warn!(%addr, attempt, attempts, "connect failed: {e}");
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        {
            let mut slot = self.outbound.lock().await;
            if slot.generation != generation {
                return;
            }
            slot.state = None;
            slot.peer = None;
            slot.connect_task = None;
        }
        warn!(%addr, attempts, "giving up on outbound connection");
        let _ = self
            .event_tx
            .send(ConnectionEvent::OutboundDisconnected {
                peer: addr,
                reason: DisconnectReason::RetriesExhausted,
            })
            .await;
    }

    async fn install_outbound(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr, generation: u64) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(%addr, "could not disable Nagle on outbound socket: {e}");
        }
        let (reader, writer) = stream.into_split();

        let mut slot = self.outbound.lock().await;
        if slot.generation != generation {
            debug!(%addr, "discarding connection for a replaced target");
            return;
        }
        slot.state = Some(OutboundState::Connected);
        slot.writer = Some(Arc::new(FrameWriter::new(writer)));
        slot.connect_task = None;

        let this = Arc::clone(self);
        let shutdown = self.shutdown_tx.subscribe();
        slot.reader_task = Some(tokio::spawn(async move {
            let exit = receive_loop(reader, LinkId::Outbound, &this.event_tx, shutdown).await;
            let reason = match exit {
                LoopExit::Protocol => DisconnectReason::ProtocolError,
                LoopExit::PeerClosed => DisconnectReason::PeerClosed,
                LoopExit::Shutdown | LoopExit::ReceiverGone => return,
            };
            this.drop_outbound(generation, reason, false).await;
        }));
        drop(slot);

        info!(%addr, "outbound connection established");
        let _ = self
            .event_tx
            .send(ConnectionEvent::OutboundConnected { peer: addr })
            .await;
    }

    /// Tears down the outbound link of `generation` and reports it.
    async fn drop_outbound(&self, generation: u64, reason: DisconnectReason, abort_reader: bool) {
        let (peer, writer) = {
            let mut slot = self.outbound.lock().await;
            if slot.generation != generation || slot.writer.is_none() {
                return;
            }
            slot.generation += 1;
            let reader = slot.reader_task.take();
            if abort_reader {
                if let Some(task) = reader {
                    task.abort();
                }
            }
            slot.state = None;
            (slot.peer.take(), slot.writer.take())
        };
        if let Some(writer) = writer {
            writer.close().await;
        }
        if let Some(peer) = peer {
            warn!(%peer, ?reason, "outbound connection lost");
            // Reached from `reply` inside the event consumer itself, so the
            // event must not wait for channel capacity here.
            let events = self.event_tx.clone();
            tokio::spawn(async move {
                let _ = events
                    .send(ConnectionEvent::OutboundDisconnected { peer, reason })
                    .await;
            });
        }
    }
}

#[async_trait]
impl PacketSink for ConnectionManager {
    async fn send_packet(&self, packet: &Packet) -> Result<(), NetworkError> {
        ConnectionManager::send_packet(self, packet).await
    }
}

/// Reads frames until the stream ends, a frame is invalid, or shutdown fires.
async fn receive_loop<R>(
    mut reader: R,
    link: LinkId,
    events: &mpsc::Sender<ConnectionEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> LoopExit
where
    R: AsyncRead + Unpin,
{
    if *shutdown.borrow() {
        return LoopExit::Shutdown;
    }
    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok(payload) => {
                    if events.send(ConnectionEvent::Frame { link, payload }).await.is_err() {
                        return LoopExit::ReceiverGone;
                    }
                }
                Err(TransportError::Closed) => return LoopExit::PeerClosed,
                Err(TransportError::Frame(e)) => {
                    warn!(?link, "dropping connection: {e}");
                    return LoopExit::Protocol;
                }
                Err(TransportError::Io(e)) => {
                    warn!(?link, "read error: {e}");
                    return LoopExit::PeerClosed;
                }
            },
            _ = shutdown.changed() => return LoopExit::Shutdown,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn frames_of(events: &mut mpsc::Receiver<ConnectionEvent>) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ConnectionEvent::Frame { payload, .. } = event {
                frames.push(payload);
            }
        }
        frames
    }

    #[test]
    fn test_network_config_default_uses_port_8888_and_five_attempts() {
        let cfg = NetworkConfig::default();
        assert_eq!(cfg.port, 8888);
        assert_eq!(cfg.connect_attempts, 5);
        assert_eq!(cfg.retry_delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_receive_loop_forwards_frames_until_peer_closes() {
        // Arrange
        let stream = Builder::new()
            .read(&[0, 0, 0, 1, 0x0A])
            .read(&[0, 0, 0, 2])
            .read(&[0x08, b'x'])
            .build();
        let (tx, mut rx) = mpsc::channel(8);
        let (_stop, shutdown) = watch::channel(false);

        // Act
        let exit = receive_loop(stream, LinkId::Outbound, &tx, shutdown).await;

        // Assert
        assert_eq!(exit, LoopExit::PeerClosed);
        assert_eq!(frames_of(&mut rx), vec![vec![0x0A], vec![0x08, b'x']]);
    }

    #[tokio::test]
    async fn test_receive_loop_stops_on_invalid_length_without_delivering() {
        for prefix in [[0u8, 0, 0, 0], [0xFF, 0xFF, 0xFF, 0xFF], [0x00, 0x40, 0x00, 0x01]] {
            let stream = Builder::new().read(&prefix).build();
            let (tx, mut rx) = mpsc::channel(8);
            let (_stop, shutdown) = watch::channel(false);

            let exit = receive_loop(stream, LinkId::Inbound(Uuid::nil()), &tx, shutdown).await;

            assert_eq!(exit, LoopExit::Protocol, "prefix {prefix:?}");
            assert!(frames_of(&mut rx).is_empty());
        }
    }

    #[tokio::test]
    async fn test_receive_loop_exits_on_shutdown() {
        let (_client, server) = tokio::io::duplex(64);
        let (tx, _rx) = mpsc::channel(8);
        let (stop, shutdown) = watch::channel(false);

        let handle = tokio::spawn(async move {
            receive_loop(server, LinkId::Outbound, &tx, shutdown).await
        });
        stop.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), LoopExit::Shutdown);
    }

    #[tokio::test]
    async fn test_send_without_target_is_not_connected() {
        // Arrange
        let (mgr, _rx) = ConnectionManager::new(NetworkConfig::default());

        // Act
        let err = mgr.send_frame(&[0x0A]).await.unwrap_err();

        // Assert
        assert!(matches!(err, NetworkError::NotConnected));
        assert_eq!(mgr.outbound_state().await, OutboundState::NotConnected);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (mgr, _rx) = ConnectionManager::new(NetworkConfig::default());

        mgr.disconnect().await;
        mgr.disconnect().await;

        assert_eq!(mgr.outbound_state().await, OutboundState::NotConnected);
        assert_eq!(mgr.target().await, None);
    }

    #[tokio::test]
    async fn test_set_target_after_shutdown_is_refused() {
        // Arrange
        let (mgr, _rx) = ConnectionManager::new(NetworkConfig::default());
        mgr.shutdown().await;

        // Act
        let result = mgr.set_target("127.0.0.1:9".parse().unwrap()).await;

        // Assert
        assert!(matches!(result, Err(NetworkError::Stopped)));
        assert_eq!(mgr.target().await, None);
        assert!(mgr.outbound.lock().await.connect_task.is_none());
    }

    #[tokio::test]
    async fn test_lost_outbound_does_not_wait_on_a_full_event_channel() {
        // Arrange: a live outbound link and an event channel nobody drains
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let (mgr, mut rx) = ConnectionManager::new(NetworkConfig::default());
        mgr.set_target(addr).await.unwrap();
        let _socket = server.accept().await.unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(ConnectionEvent::OutboundConnected { .. })
        ));
        while mgr
            .event_tx
            .try_send(ConnectionEvent::OutboundConnected { peer: addr })
            .is_ok()
        {}
        let generation = mgr.outbound.lock().await.generation;

        // Act
        let dropped = tokio::time::timeout(
            Duration::from_secs(1),
            mgr.drop_outbound(generation, DisconnectReason::SendFailed, true),
        )
        .await;

        // Assert
        assert!(dropped.is_ok(), "teardown must not block on the event channel");
        assert_eq!(mgr.outbound_state().await, OutboundState::NotConnected);
        let mut reported = false;
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
            if let ConnectionEvent::OutboundDisconnected { peer, reason } = event {
                assert_eq!(peer, addr);
                assert_eq!(reason, DisconnectReason::SendFailed);
                reported = true;
                break;
            }
        }
        assert!(reported, "the loss is still reported once the channel drains");
    }

    #[tokio::test]
    async fn test_reply_to_unknown_inbound_link_fails() {
        let (mgr, _rx) = ConnectionManager::new(NetworkConfig::default());
        let id = Uuid::new_v4();

        // Act
        let err = mgr.reply(LinkId::Inbound(id), &Packet::HandshakeAck).await.unwrap_err();

        // Assert
        assert!(matches!(err, NetworkError::UnknownLink(found) if found == id));
    }
}
