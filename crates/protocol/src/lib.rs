//! # srcquery Protocol Library
//!
//! Pure, I/O-free implementation of the Source server query protocol and the
//! master server directory protocol.
//!
//! ## Architecture
//!
//! ### 1. Codecs Layer ([`codecs`])
//! Little-endian primitive readers and the NUL-terminated string codec.
//!
//! ### 2. Framing ([`fragment`], [`reassembly`], [`compression`])
//! - [`fragment::Fragment::parse`] classifies one datagram as simple or split
//! - [`reassembly::Reassembler`] collects fragments by index
//! - [`compression::decompress`] inflates bzip2 payloads and verifies size and CRC-32
//!
//! ### 3. Requests ([`packets`], [`packet_builder`])
//! Header sentinels, request/response discriminants and request builders.
//!
//! ### 4. Decoders ([`challenge`], [`info`], [`players`], [`rules`])
//! Turn a verified payload into typed records. Every decoder fails the whole
//! payload on the first bad field; there are no partial records.
//!
//! ### 5. Master Server ([`master`], [`filter`])
//! Directory request/response codec and the filter-string builder.
//!
//! ## Usage Example
//!
//! ```rust
//! use srcquery_protocol::{Fragment, Reassembler, decode_rules};
//! use bytes::Bytes;
//!
//! let datagram = Bytes::from_static(b"\xFF\xFF\xFF\xFFE\x01\x00sv_gravity\x00800\x00");
//! let mut reassembler = Reassembler::new();
//! reassembler.push(Fragment::parse(datagram)?)?;
//! let rules = decode_rules(reassembler.into_payload()?)?;
//! assert_eq!(rules[0].value, "800");
//! # Ok::<(), srcquery_core::QueryError>(())
//! ```

pub mod codecs;
pub mod packets;
pub mod packet_builder;
pub mod fragment;
pub mod reassembly;
pub mod compression;
pub mod challenge;
pub mod info;
pub mod players;
pub mod rules;
pub mod master;
pub mod filter;

// Re-export commonly used items
pub use packets::*;
pub use packet_builder::*;
pub use fragment::{CompressionInfo, Fragment, SplitHeader, COMPRESSED_FLAG};
pub use reassembly::Reassembler;
pub use challenge::parse_challenge_response;
pub use info::{ExtraData, ServerInfo, ShipInfo, SourceTvInfo};
pub use players::{decode_players, Player};
pub use rules::{decode_rules, into_map, CollisionPolicy, Rule};
pub use master::{
    build_master_request, decode_master_response, AddressRecord, START_OF_LIST,
};
pub use filter::{Filter, FilterValue};
