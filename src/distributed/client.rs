//! Walker side of distributed mode

use crate::distributed::protocol::*;
use crate::transport::{Message, MessageSender, Rank, TransportError, COORDINATOR_RANK};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::Mutex;
use tracing::debug;

/// Connection from one walker process to the coordinator
///
/// Only the coordinator is reachable through it.
pub struct RemoteLink {
    // Declared before the runtime so it is dropped first
    stream: Mutex<TcpStream>,
    runtime: Runtime,
}

impl RemoteLink {
    /// Connect and introduce ourselves as `rank`
    pub fn connect(addr: &str, rank: Rank) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let stream = runtime.block_on(async {
            let mut stream = TcpStream::connect(addr).await?;
            let hello = Frame::Hello(HelloMessage {
                protocol_version: PROTOCOL_VERSION,
                rank,
                node_id: get_node_id(),
            });
            write_frame(&mut stream, &hello).await?;
            Ok::<_, TransportError>(stream)
        })?;
        debug!(addr, rank, "connected to coordinator");

        Ok(Self {
            stream: Mutex::new(stream),
            runtime,
        })
    }
}

impl MessageSender for RemoteLink {
    fn send(&self, dest: Rank, message: Message) -> Result<(), TransportError> {
        if dest != COORDINATOR_RANK {
            return Err(TransportError::Unreachable { rank: dest });
        }

        self.runtime.block_on(async {
            let mut stream = self.stream.lock().await;
            write_frame(&mut *stream, &Frame::Payload(message)).await
        })
    }
}

/// Hostname, or "unknown" when it cannot be determined
fn get_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
