//! Coordinator service for distributed mode
//!
//! Accepts one TCP connection per walker process and forwards every frame it
//! receives into a single coordinator inbox. The counting loop itself is the
//! same [`Coordinator`] used in standalone mode; this module only adds producers.
//!
//! The listener keeps accepting until the coordinator returns, so a surplus
//! walker process is seen (and its signal counted as a protocol violation)
//! instead of sitting unnoticed in the backlog. A HELLO whose rank is outside
//! `1..=walkers` is rejected on the spot.
//!
//! When a connection fails before delivering a signal, its handler forwards an
//! abort notice so the coordinator never waits on a walker that is already
//! gone. Failures from a connection that never registered a valid rank are
//! sent under the coordinator's own rank.

use crate::coordinator::{CompletionSummary, Coordinator};
use crate::distributed::protocol::*;
use crate::transport::{AbortNotice, Envelope, Inbox, Message, Rank, TransportError, COORDINATOR_RANK};
use anyhow::{Context, Result};
use crossbeam::channel::Sender;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

/// Coordinator side of distributed mode
pub struct CoordinatorService {
    listener: TcpListener,
    local_addr: SocketAddr,
    runtime: Runtime,

    /// Number of walker processes expected to connect
    walkers: usize,

    receive_timeout: Option<Duration>,
}

impl CoordinatorService {
    /// Bind the listener; nothing is accepted until [`run`](Self::run)
    pub fn bind(listen_addr: &str, walkers: usize) -> Result<Self> {
        let runtime = tokio::runtime::Runtime::new()
            .context("Failed to create tokio runtime")?;

        let listener = runtime
            .block_on(TcpListener::bind(listen_addr))
            .with_context(|| format!("Failed to bind coordinator service on {}", listen_addr))?;
        let local_addr = listener.local_addr()
            .context("Failed to read listener address")?;

        Ok(Self {
            runtime,
            listener,
            local_addr,
            walkers,
            receive_timeout: None,
        })
    }

    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Collect one signal per walker and return
    ///
    /// Blocks the calling thread while network I/O runs on the service's
    /// own tokio runtime.
    pub fn run(self) -> Result<CompletionSummary> {
        info!(addr = %self.local_addr, walkers = self.walkers, "coordinator listening");

        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        self.runtime.spawn(accept_walkers(self.listener, self.walkers, tx));

        let outcome = Coordinator::new(self.walkers)
            .with_receive_timeout(self.receive_timeout)
            .run(&inbox);

        self.runtime.shutdown_background();
        outcome.context("Coordinator failed")
    }
}

/// Accept connections and spawn a handler for each
///
/// Runs until the runtime shuts down or accepting fails.
pub async fn accept_walkers(listener: TcpListener, walkers: usize, inbox: Sender<Envelope>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "walker connected");
                tokio::spawn(handle_connection(stream, peer, walkers, inbox.clone()));
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                let notice = AbortNotice::new(format!("accept failed: {}", e));
                let _ = inbox.send(Envelope::new(COORDINATOR_RANK, Message::Abort(notice)));
                return;
            }
        }
    }
}

/// Forward one walker's frames, turning any failure into an abort notice
async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, walkers: usize, inbox: Sender<Envelope>) {
    let mut rank = None;
    if let Err(e) = forward_frames(&mut stream, walkers, &inbox, &mut rank).await {
        warn!(%peer, ?rank, error = %e, "walker connection failed");
        let notice = AbortNotice::new(format!("connection from {} failed: {}", peer, e));
        let _ = inbox.send(Envelope::new(
            rank.unwrap_or(COORDINATOR_RANK),
            Message::Abort(notice),
        ));
    }
}

async fn forward_frames(
    stream: &mut TcpStream,
    walkers: usize,
    inbox: &Sender<Envelope>,
    rank: &mut Option<Rank>,
) -> Result<(), TransportError> {
    let hello = match read_frame(stream).await? {
        Some(Frame::Hello(hello)) => hello,
        Some(other) => return Err(TransportError::Codec(format!("expected HELLO, got {:?}", other))),
        None => return Err(TransportError::Codec("connection closed before HELLO".to_string())),
    };

    if hello.protocol_version != PROTOCOL_VERSION {
        return Err(TransportError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            got: hello.protocol_version,
        });
    }
    if hello.rank == COORDINATOR_RANK || hello.rank > walkers {
        return Err(TransportError::UnknownRank {
            rank: hello.rank,
            size: walkers.saturating_add(1),
        });
    }
    *rank = Some(hello.rank);
    info!(rank = hello.rank, node = %hello.node_id, "walker registered");

    let mut delivered = false;
    while let Some(frame) = read_frame(stream).await? {
        match frame {
            Frame::Payload(message) => {
                inbox
                    .send(Envelope::new(hello.rank, message))
                    .map_err(|_| TransportError::Disconnected { rank: COORDINATOR_RANK })?;
                delivered = true;
            }
            Frame::Hello(_) => return Err(TransportError::Codec("duplicate HELLO".to_string())),
        }
    }

    if !delivered {
        return Err(TransportError::Disconnected { rank: hello.rank });
    }
    Ok(())
}
