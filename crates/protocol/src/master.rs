//! Master server (directory) wire format
//!
//! # Request Format
//! ```text
//! {0x31}{BYTE region}{STRING start_address}{filter bytes, NUL terminated}
//! ```
//!
//! # Response Format
//! ```text
//! {FF FF FF FF 66 0A}
//! N * {BYTE o1}{BYTE o2}{BYTE o3}{BYTE o4}{USHORT port, BIG ENDIAN}
//! ```
//!
//! The port is the only big-endian field anywhere in the protocol.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;
use srcquery_core::{QueryError, Region, Result};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::codecs::write_cstring;

/// Request tag of a master server query
pub const MASTER_REQUEST_TAG: u8 = 0x31;

/// Start address meaning "from the beginning of the list"
pub const START_OF_LIST: &str = "0.0.0.0:0";

/// Magic every master server response starts with
pub const MASTER_RESPONSE_HEADER: [u8; 6] = [0xFF, 0xFF, 0xFF, 0xFF, 0x66, 0x0A];

/// Size of one address record on the wire
pub const ADDRESS_RECORD_SIZE: usize = 6;

/// One server address returned by the master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AddressRecord {
    pub octets: [u8; 4],
    pub port: u16,
}

impl AddressRecord {
    pub const fn new(octets: [u8; 4], port: u16) -> Self {
        Self { octets, port }
    }

    /// `0.0.0.0:0` marks the end of the master's list
    pub fn is_terminator(&self) -> bool {
        self.octets == [0, 0, 0, 0] && self.port == 0
    }

    pub fn to_socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::from(self.octets), self.port)
    }

    /// Read one record; the caller guarantees enough bytes remain
    fn read(buf: &mut Bytes) -> Self {
        let mut octets = [0u8; 4];
        buf.copy_to_slice(&mut octets);
        let port = buf.get_u16();
        Self { octets, port }
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.octets);
        buf.put_u16(self.port);
    }
}

impl fmt::Display for AddressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets;
        write!(f, "{}.{}.{}.{}:{}", a, b, c, d, self.port)
    }
}

impl From<SocketAddrV4> for AddressRecord {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(addr.ip().octets(), addr.port())
    }
}

/// Build a master server request
///
/// `filter` is the already encoded filter string (see
/// [`crate::filter::Filter::encode`]) and must carry its own NUL terminator.
pub fn build_master_request(buf: &mut BytesMut, region: Region, start: &str, filter: &[u8]) {
    buf.put_u8(MASTER_REQUEST_TAG);
    buf.put_u8(region.code());
    write_cstring(buf, start);
    buf.put_slice(filter);
}

/// Decode a master server response into its address records
///
/// Records are consumed until fewer than [`ADDRESS_RECORD_SIZE`] bytes remain;
/// a short trailing remainder is ignored.
pub fn decode_master_response(payload: Bytes) -> Result<Vec<AddressRecord>> {
    let mut buf = payload;

    if buf.remaining() < MASTER_RESPONSE_HEADER.len()
        || buf[..MASTER_RESPONSE_HEADER.len()] != MASTER_RESPONSE_HEADER
    {
        return Err(QueryError::HeaderMismatch);
    }
    buf.advance(MASTER_RESPONSE_HEADER.len());

    let mut records = Vec::with_capacity(buf.remaining() / ADDRESS_RECORD_SIZE);
    while buf.remaining() >= ADDRESS_RECORD_SIZE {
        records.push(AddressRecord::read(&mut buf));
    }

    Ok(records)
}
