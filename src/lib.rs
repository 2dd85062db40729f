#![deny(clippy::all)]
#![forbid(unsafe_code)]

pub mod acceptor;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod supervisor;

use crate::acceptor::{Acceptor, Hooks};
use crate::config::Config;
use crate::connection::Connection;
use crate::supervisor::{IncomingEntry, Supervisor};
use bytes::Bytes;
use gatehouse_packets::registry::{Registry, register_default_packets};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

/// The ingress pipeline: frames are decoded under the connection's current state and the typed
/// packets forwarded into the supervisor's mailbox.
///
/// Decode failures are confined to the offending frame; the connection stays open and later
/// frames keep being decoded under the unchanged state.
pub struct Ingress {
    supervisor: Arc<Supervisor>,
    registry: &'static Registry,
}

impl Ingress {
    pub fn new(supervisor: Arc<Supervisor>, registry: &'static Registry) -> Self {
        Self {
            supervisor,
            registry,
        }
    }
}

#[async_trait::async_trait]
impl Hooks for Ingress {
    async fn frame_received(&self, connection: Arc<Connection>, frame: Bytes) {
        let state = connection.state();
        let packet = match dispatch::decode(self.registry, state, frame) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(id = %connection.id(), state = ?state, cause = %err, "dropping undecodable frame");
                return;
            }
        };

        debug!(id = %connection.id(), packet = ?packet, "read packet");
        if let Err(err) = self
            .supervisor
            .handle(IncomingEntry { connection, packet })
            .await
        {
            debug!(cause = %err, "supervisor mailbox rejected an entry");
        }
    }
}

/// Initializes the server, serves until a shutdown signal arrives and tears everything down.
///
/// This installs the packet registry, spawns the supervisor, binds the acceptor and then parks
/// on SIGINT/SIGTERM/SIGHUP. On any of those, the acceptor and the supervisor are stopped in
/// order and the call returns.
///
/// # Errors
///
/// Will return an appropriate error if the configured address cannot be parsed or the socket
/// cannot be bound.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let registry = register_default_packets();
    let supervisor = Arc::new(Supervisor::spawn(config.mailbox_capacity));

    let address: SocketAddr = config.address.parse()?;
    let acceptor = Acceptor::new(
        address,
        Duration::from_secs(config.read_timeout),
        config.outbound_capacity,
        Arc::new(Ingress::new(Arc::clone(&supervisor), registry)),
    );
    acceptor.start().await?;

    wait_for_shutdown_signal().await?;

    acceptor.stop().await;
    supervisor.stop().await;
    info!("server shut down");
    Ok(())
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {},
        _ = hangup.recv() => {},
    }
    info!("shutdown signal received");
    Ok(())
}
