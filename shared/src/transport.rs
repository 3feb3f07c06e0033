//! UDP endpoint with a dedicated blocking receive thread

use crate::codec::{self, WireMessage};
use crate::queue::InboundQueue;
use log::{debug, error, warn};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Largest datagram the receive loop reads
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Receive-call timeout; each expiry is a chance to observe shutdown
pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind udp socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to spawn receive thread: {0}")]
    ThreadSpawn(#[source] io::Error),
}

/// A decoded datagram together with its sender
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub message: WireMessage,
    pub from: SocketAddr,
}

/// A message waiting to be unicast
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub message: WireMessage,
    pub addr: SocketAddr,
}

/// Owns exactly one UDP socket
///
/// Sends happen on the caller's thread and never retry. Receiving happens on a
/// background thread started with [`Endpoint::start_receiving`], which runs
/// until [`Endpoint::shutdown`] is called or the endpoint is dropped.
pub struct Endpoint {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    recv_timeout: Duration,
}

impl Endpoint {
    /// Binds to a well-known address (server side)
    pub fn bind(addr: &str) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr).map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = socket.local_addr()?;
        debug!("UDP endpoint bound on {}", local_addr);

        Ok(Self {
            socket: Arc::new(socket),
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
            recv_timeout: RECV_TIMEOUT,
        })
    }

    /// Binds to an ephemeral local port (client side)
    pub fn unbound() -> Result<Self, TransportError> {
        Self::bind("0.0.0.0:0")
    }

    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Fire-and-forget datagram write
    pub fn send(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), TransportError> {
        self.socket.send_to(bytes, dest)?;
        Ok(())
    }

    /// Encodes and sends a message, logging instead of failing
    pub fn send_message(&self, message: &WireMessage, dest: SocketAddr) {
        match self.send(&codec::encode(message), dest) {
            Ok(()) => debug!("Sent {} to {}", message.tag(), dest),
            Err(e) => error!("Failed to send {} to {}: {}", message.tag(), dest, e),
        }
    }

    /// Sends every queued outbound message
    pub fn flush(&self, outbox: impl IntoIterator<Item = Outbound>) {
        for outbound in outbox {
            self.send_message(&outbound.message, outbound.addr);
        }
    }

    /// Spawns the blocking receive loop
    ///
    /// `on_message` runs on the receive thread for every datagram that
    /// decodes. It must not block; use [`Endpoint::deliver_to`] to hand events
    /// to the tick instead of touching shared state here.
    pub fn start_receiving<F>(&self, on_message: F) -> Result<JoinHandle<()>, TransportError>
    where
        F: FnMut(WireMessage, SocketAddr) + Send + 'static,
    {
        self.socket.set_read_timeout(Some(self.recv_timeout))?;

        let socket = Arc::clone(&self.socket);
        let shutdown = Arc::clone(&self.shutdown);

        thread::Builder::new()
            .name(format!("udp-recv-{}", self.local_addr))
            .spawn(move || receive_loop(&socket, &shutdown, on_message))
            .map_err(TransportError::ThreadSpawn)
    }

    /// Starts receiving into a marshaling queue
    pub fn deliver_to(&self, queue: InboundQueue<Inbound>) -> Result<JoinHandle<()>, TransportError> {
        self.start_receiving(move |message, from| queue.push(Inbound { message, from }))
    }

    /// Asks the receive loop to stop at its next heartbeat
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn receive_loop<F>(socket: &UdpSocket, shutdown: &AtomicBool, mut on_message: F)
where
    F: FnMut(WireMessage, SocketAddr),
{
    let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

    while !shutdown.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buffer) {
            Ok((len, from)) => match codec::decode(&buffer[..len]) {
                Ok(message) => {
                    debug!("Received {} from {}", message.tag(), from);
                    on_message(message, from);
                }
                Err(e) => warn!("Dropping malformed datagram from {}: {}", from, e),
            },
            Err(e) if is_timeout(&e) => {}
            Err(e) => {
                error!("Error receiving datagram: {}", e);
                thread::sleep(Duration::from_millis(10));
            }
        }
    }

    debug!("Receive loop stopped");
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
