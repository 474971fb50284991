//! Point-to-point messaging between participants
//!
//! Every participant in a group is identified by a rank in `0..size`. Rank 0 is
//! always the coordinator, every other rank is a walker.
//!
//! The messaging surface is deliberately small:
//!
//! - [`MessageSender::send`] delivers one message to one destination rank
//! - [`AnySourceReceiver::recv_any`] blocks until a message from *any* sender
//!   is available
//!
//! Each participant's inbox is a multi-producer single-consumer queue, so the
//! any-source receive needs no special support from the transport. The
//! in-process implementation lives in [`local`]; the TCP implementation in
//! [`crate::distributed`] feeds the same inbox type.

pub mod local;

use crate::walker::{TerminationReason, TerminationReport};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use local::{group, Endpoint, Inbox};

/// Participant identity within a group
pub type Rank = usize;

/// Rank of the single coordinator in every group
pub const COORDINATOR_RANK: Rank = 0;

/// Role a participant plays, derived from its rank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Walker,
}

impl Role {
    /// Rank 0 coordinates, everyone else walks
    pub fn of(rank: Rank) -> Self {
        if rank == COORDINATOR_RANK {
            Role::Coordinator
        } else {
            Role::Walker
        }
    }
}

/// One-shot notice that a walker has terminated
///
/// The coordinator only counts these. The step count and reason ride along
/// for reporting and never influence termination detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSignal {
    pub steps: u64,
    pub reason: TerminationReason,
}

impl From<&TerminationReport> for CompletionSignal {
    fn from(report: &TerminationReport) -> Self {
        Self {
            steps: report.steps,
            reason: report.reason,
        }
    }
}

/// Sent in place of a completion signal when a participant cannot finish
///
/// Receiving one makes the coordinator stop the whole run instead of waiting
/// for a signal that will never come.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortNotice {
    pub reason: String,
}

impl AbortNotice {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Payload exchanged between participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Completion(CompletionSignal),
    Abort(AbortNotice),
}

/// A delivered message plus the sender's rank
///
/// The source is delivery metadata filled in by the transport, never by the
/// payload itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source: Rank,
    pub message: Message,
}

impl Envelope {
    pub fn new(source: Rank, message: Message) -> Self {
        Self { source, message }
    }
}

/// Transport-layer failures
///
/// All of these are fatal to a run. Nothing in the crate retries them.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("rank {rank} is outside the group (size {size})")]
    UnknownRank { rank: Rank, size: usize },

    #[error("rank {rank} is not reachable over this link")]
    Unreachable { rank: Rank },

    #[error("channel to rank {rank} is disconnected")]
    Disconnected { rank: Rank },

    #[error("no message received within {0:?}")]
    Timeout(Duration),

    #[error("protocol version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    #[error("codec error: {0}")]
    Codec(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Point-to-point send primitive
pub trait MessageSender {
    /// Deliver `message` to `dest`
    fn send(&self, dest: Rank, message: Message) -> Result<(), TransportError>;
}

/// Blocking receive that accepts a message from any sender
pub trait AnySourceReceiver {
    /// Block until a message arrives
    ///
    /// With `timeout == None` this waits indefinitely. With a timeout, an empty
    /// window yields [`TransportError::Timeout`].
    fn recv_any(&self, timeout: Option<Duration>) -> Result<Envelope, TransportError>;

    /// Return a queued message without blocking, if there is one
    fn try_recv_any(&self) -> Result<Option<Envelope>, TransportError>;
}
