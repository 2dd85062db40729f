use async_trait::async_trait;
use bytes::Bytes;
use gatehouse::acceptor::{Acceptor, Hooks};
use gatehouse::connection::Connection;
use gatehouse::supervisor::Supervisor;
use gatehouse::{Ingress, dispatch};
use gatehouse_packets::registry::register_default_packets;
use gatehouse_packets::writer::Writer;
use gatehouse_packets::{DecodedPacket, Error, ProtocolState, frame};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use uuid::Uuid;

// the minimal handshake of the protocol example:
// length=16, id=0, protocol=767, address="localhost", port=25565, next=2 (login)
const MINIMAL_HANDSHAKE: &[u8] = &[
    0x10, 0x00, 0xFF, 0x05, 0x09, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', 0x63,
    0xDD, 0x02,
];

/// Records every lifecycle event and optionally forwards frames into the real ingress pipeline.
#[derive(Default)]
struct RecordingHooks {
    ingress: Option<Ingress>,
    connected: Mutex<Vec<Arc<Connection>>>,
    closed: Mutex<Vec<(Uuid, Option<String>)>>,
    frames: Mutex<Vec<Bytes>>,
    started: AtomicUsize,
    stopped: AtomicUsize,
}

impl RecordingHooks {
    fn with_ingress(ingress: Ingress) -> Self {
        Self {
            ingress: Some(ingress),
            ..Self::default()
        }
    }

    fn connected_count(&self) -> usize {
        self.connected.lock().expect("lock poisoned").len()
    }

    fn closed_count(&self) -> usize {
        self.closed.lock().expect("lock poisoned").len()
    }

    fn first_connection(&self) -> Option<Arc<Connection>> {
        self.connected.lock().expect("lock poisoned").first().cloned()
    }
}

#[async_trait]
impl Hooks for RecordingHooks {
    async fn started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    async fn stopped(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }

    async fn client_connected(&self, connection: Arc<Connection>) {
        self.connected.lock().expect("lock poisoned").push(connection);
    }

    async fn client_closed(&self, connection: Arc<Connection>, reason: Option<&Error>) {
        self.closed
            .lock()
            .expect("lock poisoned")
            .push((connection.id(), reason.map(ToString::to_string)));
    }

    async fn frame_received(&self, connection: Arc<Connection>, frame: Bytes) {
        self.frames.lock().expect("lock poisoned").push(frame.clone());
        if let Some(ingress) = &self.ingress {
            ingress.frame_received(connection, frame).await;
        }
    }
}

fn any_local_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
}

async fn start_acceptor(hooks: Arc<RecordingHooks>) -> (Acceptor, SocketAddr) {
    let acceptor = Acceptor::new(any_local_address(), Duration::from_secs(300), 64, hooks);
    acceptor.start().await.expect("acceptor failed to start");
    let addr = acceptor.local_addr().expect("no bound address");
    (acceptor, addr)
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting until {what}"));
}

#[tokio::test]
async fn a_minimal_handshake_reaches_the_supervisor() {
    let supervisor = Arc::new(Supervisor::spawn(64));
    let hooks = Arc::new(RecordingHooks::with_ingress(Ingress::new(
        Arc::clone(&supervisor),
        register_default_packets(),
    )));
    let (acceptor, addr) = start_acceptor(Arc::clone(&hooks)).await;

    let mut client = TcpStream::connect(addr).await.expect("connect failed");
    client
        .write_all(MINIMAL_HANDSHAKE)
        .await
        .expect("send handshake failed");

    wait_until("the client is registered", || hooks.connected_count() == 1).await;
    let connection = hooks.first_connection().expect("no connection recorded");

    // the supervisor consumed the handshake and advanced the connection state
    wait_until("the handshake is processed", || {
        connection.state() == ProtocolState::Login
    })
    .await;
    assert_eq!(hooks.frames.lock().expect("lock poisoned").len(), 1);
    assert_eq!(hooks.closed_count(), 0, "the connection must stay open");

    drop(client);
    wait_until("the close is observed", || hooks.closed_count() == 1).await;

    acceptor.stop().await;
    supervisor.stop().await;
}

#[tokio::test]
async fn an_unknown_packet_leaves_the_connection_open() {
    let supervisor = Arc::new(Supervisor::spawn(64));
    let hooks = Arc::new(RecordingHooks::with_ingress(Ingress::new(
        Arc::clone(&supervisor),
        register_default_packets(),
    )));
    let (acceptor, addr) = start_acceptor(Arc::clone(&hooks)).await;

    let mut client = TcpStream::connect(addr).await.expect("connect failed");

    // id 127 with an empty body is not registered in the handshaking state
    client
        .write_all(&[0x02, 0x7F, 0x00])
        .await
        .expect("send unknown packet failed");
    wait_until("the unknown frame arrives", || {
        !hooks.frames.lock().expect("lock poisoned").is_empty()
    })
    .await;

    wait_until("the client is registered", || hooks.connected_count() == 1).await;
    let connection = hooks.first_connection().expect("no connection recorded");
    assert_eq!(connection.state(), ProtocolState::Handshaking);
    assert_eq!(hooks.closed_count(), 0);

    // the same connection still decodes later frames under the unchanged state
    client
        .write_all(MINIMAL_HANDSHAKE)
        .await
        .expect("send handshake failed");
    wait_until("the handshake is processed", || {
        connection.state() == ProtocolState::Login
    })
    .await;

    acceptor.stop().await;
    supervisor.stop().await;
}

#[tokio::test]
async fn a_truncated_frame_waits_for_the_missing_bytes() {
    let hooks = Arc::new(RecordingHooks::default());
    let (acceptor, addr) = start_acceptor(Arc::clone(&hooks)).await;

    let mut client = TcpStream::connect(addr).await.expect("connect failed");
    // declares 16 frame bytes but delivers only 6 of them
    client
        .write_all(&MINIMAL_HANDSHAKE[..7])
        .await
        .expect("send partial frame failed");

    wait_until("the client is registered", || hooks.connected_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        hooks.frames.lock().expect("lock poisoned").is_empty(),
        "no frame may be emitted before it is complete"
    );
    assert_eq!(hooks.closed_count(), 0);

    // the peer gives up mid-frame
    drop(client);
    wait_until("the close is observed", || hooks.closed_count() == 1).await;
    let closed = hooks.closed.lock().expect("lock poisoned");
    let (_, reason) = &closed[0];
    assert!(
        reason.as_deref().is_some_and(|r| r.contains("reading or writing")),
        "expected an io-wrapped eof, got {reason:?}"
    );
    drop(closed);

    acceptor.stop().await;
}

#[tokio::test]
async fn frames_of_one_connection_arrive_in_wire_order() {
    let hooks = Arc::new(RecordingHooks::default());
    let (acceptor, addr) = start_acceptor(Arc::clone(&hooks)).await;

    // 16 handshakes, telling them apart by their protocol version
    let mut wire = Vec::new();
    let mut expected = Vec::new();
    for version in 0..16 {
        let mut body = Writer::new();
        body.write_varint(0x00)
            .write_varint(version)
            .write_string("localhost")
            .write_ushort(25565)
            .write_varint(2);
        let framed = frame::enclose(&body.finish().expect("writer failed"));
        wire.extend_from_slice(&framed);
        expected.push(framed);
    }

    let mut client = TcpStream::connect(addr).await.expect("connect failed");
    client.write_all(&wire).await.expect("send frames failed");

    wait_until("all frames arrive", || {
        hooks.frames.lock().expect("lock poisoned").len() == expected.len()
    })
    .await;
    let frames = hooks.frames.lock().expect("lock poisoned").clone();
    assert_eq!(frames, expected, "frames must keep their wire order");

    // every frame decodes to the version it was sent with
    let registry = register_default_packets();
    for (version, framed) in frames.into_iter().enumerate() {
        let packet = dispatch::decode(registry, ProtocolState::Handshaking, framed)
            .expect("frame failed to decode");
        match packet {
            DecodedPacket::Handshake(handshake) => {
                assert_eq!(handshake.protocol_version, version as i32);
            }
            other => panic!("expected a handshake, got {other:?}"),
        }
    }

    drop(client);
    acceptor.stop().await;
}

#[tokio::test]
async fn graceful_shutdown_closes_every_client() {
    let hooks = Arc::new(RecordingHooks::default());
    let (acceptor, addr) = start_acceptor(Arc::clone(&hooks)).await;
    assert_eq!(hooks.started.load(Ordering::SeqCst), 1);

    let mut clients = Vec::new();
    for _ in 0..100 {
        clients.push(TcpStream::connect(addr).await.expect("connect failed"));
    }
    wait_until("all clients are registered", || {
        hooks.connected_count() == 100
    })
    .await;

    // every accepted socket got its own identity
    let ids: HashSet<Uuid> = hooks
        .connected
        .lock()
        .expect("lock poisoned")
        .iter()
        .map(|connection| connection.id())
        .collect();
    assert_eq!(ids.len(), 100);
    assert_eq!(hooks.closed_count(), 0, "no close before the shutdown");

    tokio::time::timeout(Duration::from_secs(10), acceptor.stop())
        .await
        .expect("stop did not join in time");

    assert_eq!(hooks.closed_count(), 100);
    assert_eq!(hooks.stopped.load(Ordering::SeqCst), 1);
    for (_, reason) in hooks.closed.lock().expect("lock poisoned").iter() {
        assert!(reason.is_none(), "shutdown closes are clean, got {reason:?}");
    }

    // the listener is gone, nobody is accepted anymore
    assert!(TcpStream::connect(addr).await.is_err());

    // and nothing fires after the stop returned
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hooks.connected_count(), 100);
    assert_eq!(hooks.closed_count(), 100);
    assert_eq!(hooks.stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stop_completes_without_any_connection() {
    let hooks = Arc::new(RecordingHooks::default());
    let (acceptor, _addr) = start_acceptor(Arc::clone(&hooks)).await;
    tokio::time::timeout(Duration::from_secs(5), acceptor.stop())
        .await
        .expect("stop did not join in time");
    assert_eq!(hooks.stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn binding_an_occupied_address_fails_the_start() {
    let hooks = Arc::new(RecordingHooks::default());
    let (acceptor, addr) = start_acceptor(Arc::clone(&hooks)).await;

    let second = Acceptor::new(addr, Duration::from_secs(300), 64, Arc::new(RecordingHooks::default()));
    assert!(second.start().await.is_err());

    acceptor.stop().await;
}
