//! The TCP acceptor: listening socket, connection registry and lifecycle observer.
//!
//! The acceptor owns the listener and a registry of the live connections. Every accepted socket
//! gets registered, announced through the observer and served by its own pair of read/write
//! tasks on a shared [`TaskTracker`]. Shutdown cancels the accept loop, closes every connection
//! and waits for all tasks to join before the stop callback fires.

use crate::connection::{self, Connection};
use bytes::Bytes;
use gatehouse_packets::Error;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

type ConnectionMap = Arc<Mutex<HashMap<Uuid, Arc<Connection>>>>;

/// Observer of the acceptor's lifecycle events.
///
/// All methods default to no-ops; implementations override what they care about. Every callback
/// fires from the task owning the respective event: `client_connected` from the accept loop,
/// `frame_received` and `client_closed` from the connection's own read task.
#[async_trait::async_trait]
pub trait Hooks: Send + Sync {
    /// The listener was bound and the accept loop is about to start.
    async fn started(&self) {}

    /// The accept loop and every connection task have terminated.
    async fn stopped(&self) {}

    /// A new client connection was accepted and registered.
    async fn client_connected(&self, _connection: Arc<Connection>) {}

    /// A connection was closed and deregistered; fires exactly once per connection with the
    /// terminating error, or `None` for a clean close or shutdown.
    async fn client_closed(&self, _connection: Arc<Connection>, _reason: Option<&Error>) {}

    /// A complete frame (length prefix included) arrived on a connection.
    async fn frame_received(&self, _connection: Arc<Connection>, _frame: Bytes) {}
}

pub struct Acceptor {
    address: SocketAddr,
    read_timeout: Duration,
    outbound_capacity: usize,
    hooks: Arc<dyn Hooks>,
    connections: ConnectionMap,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    local_addr: OnceCell<SocketAddr>,
}

impl Acceptor {
    pub fn new(
        address: SocketAddr,
        read_timeout: Duration,
        outbound_capacity: usize,
        hooks: Arc<dyn Hooks>,
    ) -> Self {
        Self {
            address,
            read_timeout,
            outbound_capacity,
            hooks,
            connections: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            local_addr: OnceCell::new(),
        }
    }

    /// Binds the IPv4 listener and spawns the accept loop as a background task.
    ///
    /// # Errors
    ///
    /// Will return the underlying error if the socket cannot be bound to the configured
    /// address. A bind failure is fatal to the process.
    pub async fn start(&self) -> Result<(), Error> {
        let socket = TcpSocket::new_v4()?;
        socket.bind(self.address)?;
        let listener = socket.listen(1024)?;
        let local_addr = listener.local_addr()?;
        let _ = self.local_addr.set(local_addr);

        info!(addr = %local_addr, "accepting connections");
        self.hooks.started().await;

        self.tracker.spawn(accept_loop(
            listener,
            Arc::clone(&self.connections),
            self.tracker.clone(),
            Arc::clone(&self.hooks),
            self.shutdown.clone(),
            self.read_timeout,
            self.outbound_capacity,
        ));
        Ok(())
    }

    /// The address the listener actually bound, once [`start`](Self::start) succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Signals shutdown, closes every connection and waits for all tasks to join.
    ///
    /// Completes even if [`start`](Self::start) failed or was never called.
    pub async fn stop(&self) {
        info!("stopping acceptor");
        self.shutdown.cancel();

        let remaining: Vec<Arc<Connection>> =
            self.connections.lock().await.values().cloned().collect();
        for connection in remaining {
            connection.close();
        }

        self.tracker.close();
        self.tracker.wait().await;
        self.hooks.stopped().await;
        info!("acceptor stopped");
    }
}

#[allow(clippy::too_many_arguments)]
async fn accept_loop(
    listener: TcpListener,
    connections: ConnectionMap,
    tracker: TaskTracker,
    hooks: Arc<dyn Hooks>,
    shutdown: CancellationToken,
    read_timeout: Duration,
    outbound_capacity: usize,
) {
    loop {
        let (stream, addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    if shutdown.is_cancelled() {
                        return;
                    }
                    warn!(cause = %err, "failed to accept a connection");
                    continue;
                }
            },
            _ = shutdown.cancelled() => return,
        };

        serve_client(
            stream,
            addr,
            &connections,
            &tracker,
            &hooks,
            &shutdown,
            read_timeout,
            outbound_capacity,
        )
        .await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn serve_client(
    stream: TcpStream,
    addr: SocketAddr,
    connections: &ConnectionMap,
    tracker: &TaskTracker,
    hooks: &Arc<dyn Hooks>,
    shutdown: &CancellationToken,
    read_timeout: Duration,
    outbound_capacity: usize,
) {
    let (connection, outbound_rx) = Connection::new(addr, shutdown, outbound_capacity);
    connections
        .lock()
        .await
        .insert(connection.id(), Arc::clone(&connection));
    debug!(addr = %addr, id = %connection.id(), "client connected");
    hooks.client_connected(Arc::clone(&connection)).await;

    let (mut read_half, mut write_half) = stream.into_split();

    tracker.spawn({
        let connection = Arc::clone(&connection);
        async move {
            let closed = connection.closed().clone();
            if let Err(err) = connection::write_outbound(&mut write_half, outbound_rx, closed).await
            {
                debug!(id = %connection.id(), cause = %err, "outbound write failed");
                connection.close();
            }
        }
    });

    tracker.spawn({
        let connection = Arc::clone(&connection);
        let connections = Arc::clone(connections);
        let hooks = Arc::clone(hooks);
        async move {
            let result =
                connection::read_frames(&mut read_half, &connection, &hooks, read_timeout).await;

            // teardown happens here exactly once, whichever way the loop ended
            connection.close();
            connections.lock().await.remove(&connection.id());

            let reason = result.err();
            match &reason {
                None => debug!(addr = %connection.addr(), id = %connection.id(), "client disconnected"),
                Some(err) if err.is_connection_closed() => {
                    debug!(addr = %connection.addr(), id = %connection.id(), cause = %err, "client connection closed by peer");
                }
                Some(err) => {
                    warn!(addr = %connection.addr(), id = %connection.id(), cause = %err, "client connection failed");
                }
            }
            hooks.client_closed(connection, reason.as_ref()).await;
        }
    });
}
