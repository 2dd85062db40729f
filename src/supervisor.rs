//! The single consumer of all decoded ingress packets.
//!
//! Connections feed `(connection, packet)` entries into a bounded mailbox; one consumer task
//! receives them in FIFO order and dispatches on the packet variant. Because the mailbox
//! preserves per-sender order, the wire order of a single connection is preserved end-to-end.

use crate::connection::Connection;
use gatehouse_packets::{DecodedPacket, Error};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One decoded packet together with the connection it arrived on.
#[derive(Debug)]
pub struct IncomingEntry {
    pub connection: Arc<Connection>,
    pub packet: DecodedPacket,
}

pub struct Supervisor {
    mailbox: mpsc::Sender<IncomingEntry>,
    stop: CancellationToken,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Creates the supervisor and spawns its consumer task.
    pub fn spawn(mailbox_capacity: usize) -> Self {
        let (mailbox, incoming) = mpsc::channel(mailbox_capacity);
        let stop = CancellationToken::new();
        let consumer = tokio::spawn(consume(incoming, stop.clone()));
        Self {
            mailbox,
            stop,
            consumer: Mutex::new(Some(consumer)),
        }
    }

    /// Enqueues one entry into the mailbox.
    ///
    /// Suspends while the mailbox is full. After [`stop`](Self::stop) the entry is rejected
    /// with [`Error::Shutdown`] instead of being processed.
    pub async fn handle(&self, entry: IncomingEntry) -> Result<(), Error> {
        if self.stop.is_cancelled() {
            return Err(Error::Shutdown);
        }
        self.mailbox.send(entry).await.map_err(|_| Error::Shutdown)
    }

    /// Closes the mailbox and waits for the consumer to drain the remaining entries and exit.
    pub async fn stop(&self) {
        info!("stopping supervisor");
        self.stop.cancel();
        if let Some(consumer) = self.consumer.lock().await.take()
            && let Err(err) = consumer.await
        {
            warn!(cause = %err, "supervisor consumer failed to join");
        }
        info!("supervisor stopped");
    }
}

async fn consume(mut incoming: mpsc::Receiver<IncomingEntry>, stop: CancellationToken) {
    loop {
        let entry = tokio::select! {
            entry = incoming.recv() => entry,
            _ = stop.cancelled() => break,
        };
        match entry {
            Some(entry) => process(entry),
            None => return,
        }
    }

    // the mailbox is closed now, hand the stragglers to the handlers before exiting
    while let Ok(entry) = incoming.try_recv() {
        process(entry);
    }
}

fn process(entry: IncomingEntry) {
    match &entry.packet {
        DecodedPacket::Handshake(handshake) => {
            info!(
                id = %entry.connection.id(),
                uid = entry.packet.uid(),
                version = handshake.protocol_version,
                address = %handshake.server_address,
                port = handshake.server_port,
                next = ?handshake.next_state,
                "handshake received"
            );
            entry.connection.set_state(handshake.next_state);
        }
        other => {
            warn!(id = other.id(), uid = other.uid(), "unhandled packet variant");
        }
    }
    debug!(id = %entry.connection.id(), state = ?entry.connection.state(), "entry processed");
}
