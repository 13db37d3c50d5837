//! # Packet Builder
//!
//! Builder functions for the requests a query client sends.
//!
//! ## Usage
//!
//! ```rust
//! use srcquery_protocol::packet_builder::*;
//! use bytes::BytesMut;
//!
//! let mut buf = BytesMut::new();
//! build_info_request(&mut buf);
//! ```

use bytes::{BufMut, BytesMut};
use super::{codecs::*, packets::*};

/// Build a server info request
///
/// # Packet Format
/// ```text
/// {FF FF FF FF}{0x54}{"Source Engine Query"}{0x00}
/// ```
pub fn build_info_request(buf: &mut BytesMut) {
    buf.put_slice(&HEADER_SIMPLE_BYTES);
    buf.put_u8(RequestType::Info.as_u8());
    write_cstring(buf, INFO_QUERY_STRING);
}

/// Build a challenge request for a players or rules query
///
/// The challenge is always [`NO_CHALLENGE`]: the server answers with a
/// fresh token instead of the data.
///
/// # Packet Format
/// ```text
/// {FF FF FF FF}{type}{LONG -1}
/// ```
pub fn build_challenge_request(buf: &mut BytesMut, request: RequestType) {
    build_challenged_request(buf, request, NO_CHALLENGE);
}

/// Build a players or rules request carrying a challenge
///
/// # Packet Format
/// ```text
/// {FF FF FF FF}{type}{LONG challenge}
/// ```
pub fn build_challenged_request(buf: &mut BytesMut, request: RequestType, challenge: i32) {
    buf.put_slice(&HEADER_SIMPLE_BYTES);
    buf.put_u8(request.as_u8());
    buf.put_i32_le(challenge);
}

/// Build a ping request
///
/// # Packet Format
/// ```text
/// {FF FF FF FF}{0x69}
/// ```
pub fn build_ping_request(buf: &mut BytesMut) {
    buf.put_slice(&HEADER_SIMPLE_BYTES);
    buf.put_u8(RequestType::Ping.as_u8());
}
