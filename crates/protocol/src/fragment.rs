//! Datagram framing
//!
//! Classifies one received datagram as a complete response or as one fragment
//! of a split response, and strips the framing headers. No I/O happens here.
//!
//! # Wire Format
//! ```text
//! simple: {ULONG 0xFFFFFFFF}{payload...}
//! split:  {ULONG 0xFFFFFFFE}{ULONG id}{BYTE total}{BYTE number}{SHORT size}
//!         [{ULONG decompressed_size}{ULONG crc32}]   -- only if id & 0x80000000
//!         {payload...}
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use srcquery_core::{QueryError, Result};

use crate::codecs::*;
use crate::packets::{HEADER_SIMPLE, HEADER_SPLIT};

/// Bit of the sequence id that marks a bzip2-compressed response
pub const COMPRESSED_FLAG: u32 = 1 << 31;

/// Compression metadata of a split response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionInfo {
    /// Size of the payload once decompressed
    pub decompressed_size: u32,
    /// CRC-32 (IEEE) of the decompressed payload
    pub crc32: u32,
}

/// Extended header carried by every fragment of a split response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitHeader {
    pub sequence_id: u32,
    /// Total number of fragments in the response
    pub total: u8,
    /// Index of this fragment, zero-based
    pub number: u8,
    /// Fragment size the server declared; informational only
    pub size: i16,
    /// Present iff the sequence id has [`COMPRESSED_FLAG`] set
    pub compression: Option<CompressionInfo>,
}

/// One datagram's contribution to a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// `None` for a single-datagram response
    pub split: Option<SplitHeader>,
    pub payload: Bytes,
}

impl Fragment {
    /// A complete, single-datagram response
    pub fn simple(payload: impl Into<Bytes>) -> Self {
        Self {
            split: None,
            payload: payload.into(),
        }
    }

    /// Parse a raw datagram
    ///
    /// Any header code other than the two sentinels is rejected; the framer
    /// never guesses.
    pub fn parse(datagram: Bytes) -> Result<Self> {
        let mut buf = datagram;

        let header = read_ulong(&mut buf)?;
        match header {
            HEADER_SIMPLE => Ok(Self::simple(buf)),
            HEADER_SPLIT => {
                let sequence_id = read_ulong(&mut buf)?;
                let total = read_byte(&mut buf)?;
                let number = read_byte(&mut buf)?;
                let size = read_short(&mut buf)?;

                let compression = if sequence_id & COMPRESSED_FLAG != 0 {
                    Some(CompressionInfo {
                        decompressed_size: read_ulong(&mut buf)?,
                        crc32: read_ulong(&mut buf)?,
                    })
                } else {
                    None
                };

                Ok(Self {
                    split: Some(SplitHeader {
                        sequence_id,
                        total,
                        number,
                        size,
                        compression,
                    }),
                    payload: buf,
                })
            }
            other => Err(QueryError::Malformed(format!(
                "unknown datagram header {:#010x}",
                other
            ))),
        }
    }

    pub fn is_split(&self) -> bool {
        self.split.is_some()
    }

    /// Number of fragments the response consists of (1 when not split)
    pub fn fragment_count(&self) -> u8 {
        self.split.map_or(1, |s| s.total)
    }

    /// Position of this fragment in the response (0 when not split)
    pub fn fragment_index(&self) -> u8 {
        self.split.map_or(0, |s| s.number)
    }

    pub fn compression(&self) -> Option<CompressionInfo> {
        self.split.and_then(|s| s.compression)
    }

    /// Serialize back into datagram form
    ///
    /// The compression sub-header is written iff `compression` is set; the
    /// sequence id is written as stored.
    pub fn write_to(&self, buf: &mut BytesMut) {
        match &self.split {
            None => buf.put_u32_le(HEADER_SIMPLE),
            Some(split) => {
                buf.put_u32_le(HEADER_SPLIT);
                buf.put_u32_le(split.sequence_id);
                buf.put_u8(split.total);
                buf.put_u8(split.number);
                buf.put_i16_le(split.size);
                if let Some(info) = split.compression {
                    buf.put_u32_le(info.decompressed_size);
                    buf.put_u32_le(info.crc32);
                }
            }
        }
        buf.put_slice(&self.payload);
    }
}
