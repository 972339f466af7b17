//! TCP control channel.
//!
//! Agents connect, send a short identification string and then receive
//! every control message the engine produces. One dispatcher task copies
//! each encoded message, in order, into a bounded queue per peer; a writer
//! task per peer drains its queue onto the socket. A peer whose queue fills
//! up is dropped.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use touch_engine::{FrameSize, HandlerError};
use touch_proto::ControlMessage;

/// Longest identification string read from a new peer.
const IDENT_MAX: usize = 64;

/// Back-off after a failed `accept`.
const ACCEPT_RETRY: Duration = Duration::from_millis(100);

/// Encoded messages buffered per peer before it is dropped as too slow.
const PEER_QUEUE: usize = 1024;

/// How long peers get to flush their queues on shutdown before being aborted.
const PEER_DRAIN: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum Outgoing {
    Message(Bytes),
    /// Stops the dispatcher.
    Shutdown,
}

/// Cheap handle for queueing messages from the engine.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    queue: mpsc::UnboundedSender<Outgoing>,
    device: Option<FrameSize>,
}

impl ServerHandle {
    /// Encode `msg` and queue it for every connected peer.
    ///
    /// Coordinates are rescaled to the device resolution when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::ChannelClosed`] once the server has shut down.
    pub fn send(&self, msg: &ControlMessage) -> Result<(), HandlerError> {
        let bytes = match self.device {
            Some(device) => msg.scaled_to(device.width, device.height).to_bytes(),
            None => msg.to_bytes(),
        };
        self.queue
            .send(Outgoing::Message(bytes))
            .map_err(|_| HandlerError::ChannelClosed)
    }
}

struct PeerTable {
    next_id: u64,
    writers: HashMap<u64, mpsc::Sender<Bytes>>,
    count: watch::Sender<usize>,
    /// Set on shutdown; no peer registers afterwards.
    closed: bool,
}

impl PeerTable {
    fn publish(&self) {
        self.count.send_replace(self.writers.len());
    }
}

/// Registered peers and their write queues.
#[derive(Clone)]
struct Peers {
    inner: Arc<Mutex<PeerTable>>,
}

impl Peers {
    fn new(count: watch::Sender<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PeerTable {
                next_id: 0,
                writers: HashMap::new(),
                count,
                closed: false,
            })),
        }
    }

    /// Add a peer queue. Returns `None` once the server is stopping.
    async fn register(&self, writer: mpsc::Sender<Bytes>) -> Option<u64> {
        let mut table = self.inner.lock().await;
        if table.closed {
            return None;
        }
        table.next_id += 1;
        let id = table.next_id;
        table.writers.insert(id, writer);
        table.publish();
        Some(id)
    }

    async fn remove(&self, id: u64) {
        let mut table = self.inner.lock().await;
        if table.writers.remove(&id).is_some() {
            table.publish();
        }
    }

    /// Drop every peer queue and refuse new ones; writer tasks end once
    /// their queue is empty.
    async fn close(&self) {
        let mut table = self.inner.lock().await;
        table.closed = true;
        table.writers.clear();
        table.publish();
    }

    async fn broadcast(&self, bytes: &Bytes) {
        let mut table = self.inner.lock().await;
        let before = table.writers.len();
        table
            .writers
            .retain(|id, writer| match writer.try_send(bytes.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(peer = *id, "Peer is not keeping up, dropping it");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(peer = *id, "Dropping closed peer queue");
                    false
                }
            });
        if table.writers.len() != before {
            table.publish();
        }
    }
}

/// Running control channel.
pub struct ControlServer {
    local_addr: SocketAddr,
    handle: ServerHandle,
    peers: Peers,
    peer_count: watch::Receiver<usize>,
    stop: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
    dispatch_task: JoinHandle<()>,
}

impl ControlServer {
    /// Bind the listener and start accepting peers.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(addr: SocketAddr, device: Option<FrameSize>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind control channel to {addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("failed to read listener address")?;

        let (count_tx, peer_count) = watch::channel(0);
        let peers = Peers::new(count_tx);
        let (queue, queue_rx) = mpsc::unbounded_channel();
        let (stop, stop_rx) = watch::channel(false);

        let accept_task = tokio::spawn(accept_loop(listener, peers.clone(), stop_rx));
        let dispatch_task = tokio::spawn(dispatch_loop(queue_rx, peers.clone()));

        if let Some(device) = device {
            tracing::info!(
                width = device.width,
                height = device.height,
                "Scaling coordinates to device resolution"
            );
        }
        tracing::info!(bind = %local_addr, "Control channel listening");

        Ok(Self {
            local_addr,
            handle: ServerHandle { queue, device },
            peers,
            peer_count,
            stop,
            accept_task,
            dispatch_task,
        })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Number of registered peers, updated on every change.
    #[must_use]
    pub fn peer_count(&self) -> watch::Receiver<usize> {
        self.peer_count.clone()
    }

    /// Stop the dispatcher, stop accepting and disconnect every peer.
    ///
    /// Messages queued before the call are still dispatched. Peers that have
    /// not identified yet are closed without being registered.
    pub async fn shutdown(self) {
        // A send failure means the dispatcher already stopped.
        let _ = self.handle.queue.send(Outgoing::Shutdown);
        if let Err(e) = self.dispatch_task.await {
            tracing::warn!("Dispatcher task failed: {e}");
        }
        self.peers.close().await;
        self.stop.send_replace(true);
        if let Err(e) = self.accept_task.await {
            tracing::warn!("Accept task failed: {e}");
        }
        tracing::info!("Control channel stopped");
    }
}

/// Accept peers until `stop` is set, then wait for their tasks to finish.
async fn accept_loop(listener: TcpListener, peers: Peers, mut stop: watch::Receiver<bool>) {
    let mut tasks = JoinSet::new();
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            () = stopped(&mut stop) => break,
            // Reap finished peers so the set does not grow.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => continue,
        };
        let (stream, peer_addr) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("Failed to accept connection: {e}");
                tokio::time::sleep(ACCEPT_RETRY).await;
                continue;
            }
        };
        tracing::info!(%peer_addr, "New connection");

        let peers = peers.clone();
        let stop = stop.clone();
        tasks.spawn(async move {
            if let Err(e) = serve_peer(stream, peer_addr, peers, stop).await {
                tracing::warn!(%peer_addr, "Peer connection failed: {e:#}");
            }
        });
    }
    drop(listener);

    let drained = tokio::time::timeout(PEER_DRAIN, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!(peers = tasks.len(), "Aborting peers that did not drain in time");
        tasks.shutdown().await;
    }
}

/// Resolves once shutdown is signalled or the server is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn dispatch_loop(mut queue: mpsc::UnboundedReceiver<Outgoing>, peers: Peers) {
    while let Some(item) = queue.recv().await {
        match item {
            Outgoing::Message(bytes) => peers.broadcast(&bytes).await,
            Outgoing::Shutdown => break,
        }
    }
    tracing::debug!("Dispatcher stopped");
}

async fn serve_peer(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    peers: Peers,
    mut stop: watch::Receiver<bool>,
) -> Result<()> {
    let mut ident = [0u8; IDENT_MAX];
    let n = tokio::select! {
        read = stream.read(&mut ident) => read.context("failed to read peer identification")?,
        () = stopped(&mut stop) => {
            tracing::debug!(%peer_addr, "Closing unidentified peer on shutdown");
            return Ok(());
        }
    };
    if n == 0 {
        tracing::debug!(%peer_addr, "Peer closed before identifying");
        return Ok(());
    }
    tracing::info!(
        %peer_addr,
        ident = %String::from_utf8_lossy(&ident[..n]),
        "Peer identified"
    );

    let (writer, mut queue) = mpsc::channel(PEER_QUEUE);
    let Some(id) = peers.register(writer).await else {
        tracing::info!(%peer_addr, "Control channel stopping, rejecting peer");
        return Ok(());
    };
    let result = pump(&mut stream, &mut queue).await;
    peers.remove(id).await;
    tracing::info!(%peer_addr, "Peer disconnected");
    result
}

/// Write queued messages until the queue closes or the peer hangs up.
async fn pump(stream: &mut TcpStream, queue: &mut mpsc::Receiver<Bytes>) -> Result<()> {
    let mut scratch = [0u8; IDENT_MAX];
    loop {
        tokio::select! {
            msg = queue.recv() => match msg {
                Some(bytes) => stream
                    .write_all(&bytes)
                    .await
                    .context("failed to write to peer")?,
                None => return Ok(()),
            },
            read = stream.read(&mut scratch) => {
                // Agents never send after identifying; only EOF matters.
                if read.context("failed to read from peer")? == 0 {
                    return Ok(());
                }
            }
        }
    }
}
