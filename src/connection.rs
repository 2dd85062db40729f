//! The per-client connection: identity, protocol state and the cooperating read/write tasks.
//!
//! Every accepted socket is wrapped into one [`Connection`] with two tasks: the read loop
//! reassembles length-prefixed frames from the byte stream and hands them to the acceptor's
//! observer, the write loop drains the outbound channel onto the socket in enqueue order. The
//! connection's protocol state only advances as a side effect of handling a handshake.

use crate::acceptor::Hooks;
use bytes::{Bytes, BytesMut};
use gatehouse_packets::{Error, ProtocolState, frame};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// The size of the scratch buffer each read loop draws on task start.
pub const READ_BUFFER_SIZE: usize = 4096;

/// The idle window after which a connection that sent no bytes is closed.
pub const IDLE_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// An atomically readable protocol state slot.
///
/// Written by the connection's own read path (through the supervisor's handshake handling) and
/// read by the dispatcher for the same connection, so there is never a racing writer.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: ProtocolState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ProtocolState {
        match self.0.load(Ordering::Acquire) {
            1 => ProtocolState::Status,
            2 => ProtocolState::Login,
            3 => ProtocolState::Transfer,
            _ => ProtocolState::Handshaking,
        }
    }

    pub fn store(&self, state: ProtocolState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// One accepted client connection.
#[derive(Debug)]
pub struct Connection {
    id: Uuid,
    addr: SocketAddr,
    state: StateCell,
    outbound: mpsc::Sender<Bytes>,
    closed: CancellationToken,
}

impl Connection {
    /// Wraps an accepted socket's metadata into a connection handle plus the receiving end of
    /// its outbound channel. The caller spawns the read and write loops.
    pub(crate) fn new(
        addr: SocketAddr,
        shutdown: &CancellationToken,
        outbound_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        let (outbound, outbound_rx) = mpsc::channel(outbound_capacity);
        let connection = Arc::new(Self {
            id: Uuid::new_v4(),
            addr,
            state: StateCell::new(ProtocolState::Handshaking),
            outbound,
            closed: shutdown.child_token(),
        });
        (connection, outbound_rx)
    }

    /// The stable unique identity of this connection.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The peer address of this connection.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The current protocol state of this connection.
    pub fn state(&self) -> ProtocolState {
        self.state.load()
    }

    /// Advances the protocol state of this connection.
    pub fn set_state(&self, state: ProtocolState) {
        self.state.store(state);
    }

    /// Enqueues raw bytes onto the outbound channel.
    ///
    /// The write loop transmits all enqueued messages in order. Fails with [`Error::Shutdown`]
    /// once the connection is closed.
    pub async fn send(&self, bytes: Bytes) -> Result<(), Error> {
        if self.closed.is_cancelled() {
            return Err(Error::Shutdown);
        }
        self.outbound.send(bytes).await.map_err(|_| Error::Shutdown)
    }

    /// Closes this connection, stopping both of its loops. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub(crate) fn closed(&self) -> &CancellationToken {
        &self.closed
    }
}

/// Runs the frame read loop of one connection until EOF, an error or shutdown.
///
/// Bytes are accumulated in a scratch buffer; each complete frame is emitted through
/// [`Hooks::frame_received`] before more bytes are awaited, so partial frames and multiple
/// frames per read are both handled. Returns `Ok(())` for a clean close (EOF with nothing
/// buffered, or shutdown) and the terminating error otherwise.
pub(crate) async fn read_frames<S>(
    stream: &mut S,
    connection: &Arc<Connection>,
    hooks: &Arc<dyn Hooks>,
    read_timeout: Duration,
) -> Result<(), Error>
where
    S: AsyncRead + Unpin,
{
    let mut scratch = BytesMut::with_capacity(READ_BUFFER_SIZE);
    loop {
        while let Some(frame) = frame::extract(&mut scratch)? {
            hooks.frame_received(Arc::clone(connection), frame).await;
        }

        let read = tokio::select! {
            _ = connection.closed.cancelled() => return Ok(()),
            read = timeout(read_timeout, stream.read_buf(&mut scratch)) => read,
        };
        match read {
            Err(_) => return Err(Error::ReadTimeout),
            Ok(Ok(0)) => {
                if scratch.is_empty() {
                    return Ok(());
                }
                // the peer vanished in the middle of a declared frame
                return Err(Error::Io(std::io::Error::from(ErrorKind::UnexpectedEof)));
            }
            Ok(Ok(_)) => {}
            Ok(Err(err)) => return Err(Error::Io(err)),
        }
    }
}

/// Drains the outbound channel of one connection onto its socket until close or shutdown.
pub(crate) async fn write_outbound<S>(
    stream: &mut S,
    mut outbound: mpsc::Receiver<Bytes>,
    closed: CancellationToken,
) -> Result<(), Error>
where
    S: AsyncWrite + Unpin,
{
    loop {
        let message = tokio::select! {
            _ = closed.cancelled() => break,
            message = outbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };
        stream.write_all(&message).await?;
    }
    Ok(())
}
