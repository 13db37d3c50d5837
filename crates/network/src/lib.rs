//! # srcquery Networking Layer
//!
//! This crate provides Tokio-based async query clients for Source game
//! servers and the master server directory.
//!
//! ## Modules
//!
//! - [`config`] - Client configuration options
//! - [`transport`] - Datagram transports (UDP and in-memory)
//! - [`query`] - Fragment reassembly pipeline and timeouts
//! - [`challenge`] - Challenge token negotiation
//! - [`server`] - Per-server info/players/rules/ping client
//! - [`master`] - Master server directory client with failover

pub mod config;
pub mod transport;
pub mod query;
pub mod challenge;
pub mod server;
pub mod master;

// Re-export commonly used items
pub use config::{ClientConfig, DEFAULT_MASTER_SERVERS};
pub use transport::{Connector, MemoryConnector, MemoryTransport, Transport, UdpConnector, UdpTransport};
pub use query::{exchange, read_response, with_timeout};
pub use challenge::negotiate_challenge;
pub use server::SourceServer;
pub use master::{DirectoryClient, EndpointSet};
