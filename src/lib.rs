//! random-walk - concurrent random walkers with counting termination detection
//!
//! A fixed group of N participants: rank 0 coordinates, ranks 1..N-1 each run
//! an independent bounded 1-D random walk and report completion exactly once.
//! The coordinator counts completion signals from any source and declares the
//! run finished when the count reaches N-1, whatever order they arrive in.
//!
//! # Architecture
//!
//! - **Walkers**: bounded walks over a pluggable step source
//! - **Coordinator**: order-agnostic counting barrier over an any-source inbox
//! - **Transport**: in-process channels (standalone) or TCP (distributed mode)
//! - **Output**: per-walker and controller records, optional JSON summary

pub mod config;
pub mod coordinator;
pub mod distributed;
pub mod output;
pub mod simulation;
pub mod transport;
pub mod util;
pub mod walker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{Coordinator, CoordinatorError};
pub use transport::{Rank, TransportError, COORDINATOR_RANK};
pub use walker::Walker;

/// Result type used throughout random-walk
pub type Result<T> = anyhow::Result<T>;
