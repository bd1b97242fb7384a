//! Integration tests for the connection manager over loopback TCP.
//!
//! These tests drive `ConnectionManager` through its public API the way the
//! orchestrator does, with raw sockets standing in for a peer where the test
//! needs byte-level control of the stream. They verify:
//!
//! - Frames arrive as `ConnectionEvent::Frame` in the order they were sent.
//! - A declared length of 0, a "negative" length or one above 4 MiB closes
//!   the connection without delivering a payload.
//! - The outbound role retries, gives up after the configured attempts, and
//!   reports a peer that hangs up.
//! - Concurrent senders on the outbound connection never interleave frames.
//! - Overlapping target changes leave exactly one live outbound connection.
//! - Two managers can complete a handshake and reply on the inbound link.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use edgeshare_core::protocol::{decode_packet, encode_packet, frame_payload, Packet};
use edgeshare_node::infrastructure::network::connection_manager::{
    ConnectionEvent, ConnectionManager, DisconnectReason, LinkId, NetworkConfig, NetworkError,
    OutboundState,
};
use edgeshare_node::infrastructure::network::transport::read_frame;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

fn loopback_config() -> NetworkConfig {
    NetworkConfig {
        bind_address: "127.0.0.1".parse().unwrap(),
        port: 0,
        connect_attempts: 2,
        retry_delay: Duration::from_millis(10),
    }
}

async fn next_event(rx: &mut mpsc::Receiver<ConnectionEvent>) -> ConnectionEvent {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("event within timeout")
        .expect("event channel open")
}

async fn listening_manager() -> (
    Arc<ConnectionManager>,
    mpsc::Receiver<ConnectionEvent>,
    SocketAddr,
) {
    let (mgr, rx) = ConnectionManager::new(loopback_config());
    let addr = mgr.start_listener().await.expect("listener binds");
    (mgr, rx, addr)
}

// ── Inbound role ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_inbound_frames_arrive_in_order() {
    let (mgr, mut rx, addr) = listening_manager().await;

    let mut peer = TcpStream::connect(addr).await.unwrap();
    for i in 1..=5u8 {
        peer.write_all(&frame_payload(&[i; 3]).unwrap()).await.unwrap();
    }

    let link = match next_event(&mut rx).await {
        ConnectionEvent::InboundAccepted { link, .. } => link,
        other => panic!("expected InboundAccepted, got {other:?}"),
    };
    for i in 1..=5u8 {
        match next_event(&mut rx).await {
            ConnectionEvent::Frame { link: l, payload } => {
                assert_eq!(l, LinkId::Inbound(link));
                assert_eq!(payload, vec![i; 3]);
            }
            other => panic!("expected Frame, got {other:?}"),
        }
    }
    assert_eq!(mgr.inbound_count().await, 1);

    drop(peer);
    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::InboundClosed { link: l, .. } if l == link
    ));
    mgr.shutdown().await;
}

async fn assert_prefix_closes_without_frame(prefix: [u8; 4]) {
    let (mgr, mut rx, addr) = listening_manager().await;

    let mut peer = TcpStream::connect(addr).await.unwrap();
    peer.write_all(&prefix).await.unwrap();
    // Bytes that would be a payload if the prefix were accepted.
    peer.write_all(&[0x01, 0x00, 0x10, 0x00, 0x20]).await.unwrap();

    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::InboundAccepted { .. }
    ));
    match next_event(&mut rx).await {
        ConnectionEvent::InboundClosed { .. } => {}
        other => panic!("prefix {prefix:02x?}: expected InboundClosed, got {other:?}"),
    }
    mgr.shutdown().await;
}

#[tokio::test]
async fn test_zero_length_frame_closes_connection() {
    assert_prefix_closes_without_frame(0u32.to_be_bytes()).await;
}

#[tokio::test]
async fn test_negative_length_frame_closes_connection() {
    assert_prefix_closes_without_frame((-1i32).to_be_bytes()).await;
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    assert_prefix_closes_without_frame((4 * 1024 * 1024 + 1u32).to_be_bytes()).await;
}

#[tokio::test]
async fn test_bad_connection_does_not_affect_others() {
    let (mgr, mut rx, addr) = listening_manager().await;

    let mut good = TcpStream::connect(addr).await.unwrap();
    let good_link = match next_event(&mut rx).await {
        ConnectionEvent::InboundAccepted { link, .. } => link,
        other => panic!("expected InboundAccepted, got {other:?}"),
    };

    let mut bad = TcpStream::connect(addr).await.unwrap();
    bad.write_all(&0u32.to_be_bytes()).await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::InboundAccepted { .. }
    ));
    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::InboundClosed { link, .. } if link != good_link
    ));

    good.write_all(&frame_payload(b"\x0A").unwrap()).await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::Frame { link: LinkId::Inbound(l), .. } if l == good_link
    ));
    mgr.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_listener() {
    let (mgr, _rx, addr) = listening_manager().await;
    mgr.shutdown().await;

    // The accept loop drops the socket once it observes the shutdown.
    let mut refused = false;
    for _ in 0..100 {
        match TcpStream::connect(addr).await {
            Err(_) => {
                refused = true;
                break;
            }
            Ok(_) => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    assert!(refused, "listener must stop accepting after shutdown");
}

// ── Outbound role ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_outbound_gives_up_after_configured_attempts() {
    // Grab a free port, then release it so nothing is listening there.
    let addr = {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        probe.local_addr().unwrap()
    };
    let (mgr, mut rx) = ConnectionManager::new(loopback_config());

    mgr.set_target(addr).await.unwrap();
    assert_eq!(mgr.target().await, Some(addr));

    match next_event(&mut rx).await {
        ConnectionEvent::OutboundDisconnected { peer, reason } => {
            assert_eq!(peer, addr);
            assert_eq!(reason, DisconnectReason::RetriesExhausted);
        }
        other => panic!("expected OutboundDisconnected, got {other:?}"),
    }
    assert_eq!(mgr.outbound_state().await, OutboundState::NotConnected);
    assert_eq!(mgr.target().await, None);
    assert!(matches!(
        mgr.send_packet(&Packet::Ping).await,
        Err(NetworkError::NotConnected)
    ));
}

#[tokio::test]
async fn test_outbound_reports_peer_hang_up() {
    let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let (mgr, mut rx) = ConnectionManager::new(loopback_config());

    mgr.set_target(addr).await.unwrap();
    let (socket, _) = server.accept().await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::OutboundConnected { peer } if peer == addr
    ));
    assert_eq!(mgr.outbound_state().await, OutboundState::Connected);

    drop(socket);
    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::OutboundDisconnected { reason: DisconnectReason::PeerClosed, .. }
    ));
    assert_eq!(mgr.outbound_state().await, OutboundState::NotConnected);
}

#[tokio::test]
async fn test_manual_disconnect_is_silent_and_idempotent() {
    let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let (mgr, mut rx) = ConnectionManager::new(loopback_config());

    mgr.set_target(addr).await.unwrap();
    let _socket = server.accept().await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::OutboundConnected { .. }
    ));

    mgr.disconnect().await;
    mgr.disconnect().await;

    assert_eq!(mgr.outbound_state().await, OutboundState::NotConnected);
    let quiet = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(quiet.is_err(), "manual disconnect must not raise an event");
}

#[tokio::test]
async fn test_concurrent_sends_arrive_as_whole_frames() {
    const SENDERS: u16 = 8;
    const PER_SENDER: u16 = 100;

    let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let (mgr, mut rx) = ConnectionManager::new(loopback_config());

    mgr.set_target(addr).await.unwrap();
    let (mut socket, _) = server.accept().await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::OutboundConnected { .. }
    ));

    let mut tasks = Vec::new();
    for sender in 0..SENDERS {
        let mgr = Arc::clone(&mgr);
        tasks.push(tokio::spawn(async move {
            for seq in 0..PER_SENDER {
                mgr.send_packet(&Packet::MouseMove { x: sender, y: seq })
                    .await
                    .expect("send");
            }
        }));
    }

    // Re-parse the raw byte stream into discrete frames.
    let mut next_seq = vec![0u16; SENDERS as usize];
    for _ in 0..(SENDERS * PER_SENDER) {
        let payload = tokio::time::timeout(EVENT_TIMEOUT, read_frame(&mut socket))
            .await
            .expect("frame within timeout")
            .expect("well-formed frame");
        match decode_packet(&payload).expect("decodable payload") {
            Packet::MouseMove { x, y } => {
                let slot = &mut next_seq[x as usize];
                assert_eq!(y, *slot, "sender {x} frames out of order");
                *slot += 1;
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert!(next_seq.iter().all(|&n| n == PER_SENDER));
}

#[tokio::test]
async fn test_overlapping_targets_leave_one_live_connection() {
    // Arrange
    let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let second = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (first_addr, second_addr) = (first.local_addr().unwrap(), second.local_addr().unwrap());
    let (mgr, mut rx) = ConnectionManager::new(loopback_config());

    // Act
    let (a, b) = tokio::join!(mgr.set_target(first_addr), mgr.set_target(second_addr));
    a.unwrap();
    b.unwrap();

    // Assert: only the surviving target connects
    let current = mgr.target().await.expect("one target remains");
    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::OutboundConnected { peer } if peer == current
    ));
    let (winner, loser) = if current == first_addr {
        (first, second)
    } else {
        (second, first)
    };
    let (mut live, _) = winner.accept().await.unwrap();

    let mut buf = [0u8; 1];
    if let Ok(Ok((mut stale, _))) =
        tokio::time::timeout(Duration::from_millis(200), loser.accept()).await
    {
        let read = tokio::time::timeout(EVENT_TIMEOUT, stale.read(&mut buf))
            .await
            .expect("replaced connection is closed");
        assert_eq!(read.unwrap_or(0), 0, "replaced connection must not stay open");
    }
    assert!(
        tokio::time::timeout(Duration::from_millis(100), live.read(&mut buf))
            .await
            .is_err(),
        "current connection stays open"
    );
    assert!(
        tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .is_err(),
        "no second connection is reported"
    );
    mgr.shutdown().await;
}

// ── Both roles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_handshake_reply_travels_back_on_the_inbound_link() {
    let (passive, mut passive_rx, addr) = listening_manager().await;
    let (active, mut active_rx) = ConnectionManager::new(loopback_config());

    active.set_target(addr).await.unwrap();
    assert!(matches!(
        next_event(&mut active_rx).await,
        ConnectionEvent::OutboundConnected { .. }
    ));
    active
        .send_packet(&Packet::Handshake {
            machine_name: "desk".into(),
        })
        .await
        .unwrap();

    assert!(matches!(
        next_event(&mut passive_rx).await,
        ConnectionEvent::InboundAccepted { .. }
    ));
    let (link, payload) = match next_event(&mut passive_rx).await {
        ConnectionEvent::Frame { link, payload } => (link, payload),
        other => panic!("expected Frame, got {other:?}"),
    };
    assert_eq!(
        decode_packet(&payload).unwrap(),
        Packet::Handshake {
            machine_name: "desk".into()
        }
    );

    passive.reply(link, &Packet::HandshakeAck).await.unwrap();
    match next_event(&mut active_rx).await {
        ConnectionEvent::Frame { link, payload } => {
            assert_eq!(link, LinkId::Outbound);
            assert_eq!(payload, encode_packet(&Packet::HandshakeAck).unwrap());
        }
        other => panic!("expected Frame, got {other:?}"),
    }

    active.shutdown().await;
    passive.shutdown().await;
}
