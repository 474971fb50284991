//! Distributed mode implementation
//!
//! Runs walkers as separate processes that report to a coordinator process
//! over TCP.
//!
//! # Modules
//!
//! - `protocol`: Frame definitions and serialization
//! - `service`: Coordinator side (listener feeding the coordinator inbox)
//! - `client`: Walker side (one connection per walker process)

pub mod client;
pub mod protocol;
pub mod service;

pub use client::RemoteLink;
pub use protocol::{Frame, HelloMessage, PROTOCOL_VERSION};
pub use service::CoordinatorService;
