//! Challenge response decoding
//!
//! # Packet Format
//! ```text
//! {0x41 'A'}{LONG challenge}
//! ```

use bytes::Bytes;
use srcquery_core::{QueryError, Result};

use crate::codecs::*;
use crate::packets::ResponseType;

/// Decode a challenge response payload into its token
pub fn parse_challenge_response(payload: Bytes) -> Result<i32> {
    let mut buf = payload;

    let tag = read_byte(&mut buf)?;
    if tag != ResponseType::Challenge.as_u8() {
        return Err(QueryError::Malformed(format!(
            "expected challenge response, got tag {:#04x}",
            tag
        )));
    }

    read_long(&mut buf)
}
