//! Source query primitive codecs
//!
//! Every multi-byte integer on the wire is little-endian. The one exception
//! (the port of a master server address record) lives in [`crate::master`].
//!
//! Readers take `&mut Bytes` and advance it; a read past the end is a
//! malformed packet, never a short-but-valid value.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use srcquery_core::{QueryError, Result};

#[inline]
fn ensure(buf: &Bytes, needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(QueryError::Malformed(format!(
            "not enough bytes for {}: need {}, have {}",
            what,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

/// Read a single byte
#[inline]
pub fn read_byte(buf: &mut Bytes) -> Result<u8> {
    ensure(buf, 1, "byte")?;
    Ok(buf.get_u8())
}

/// Read a little-endian signed 16-bit integer
#[inline]
pub fn read_short(buf: &mut Bytes) -> Result<i16> {
    ensure(buf, 2, "short")?;
    Ok(buf.get_i16_le())
}

/// Read a little-endian unsigned 16-bit integer
#[inline]
pub fn read_ushort(buf: &mut Bytes) -> Result<u16> {
    ensure(buf, 2, "ushort")?;
    Ok(buf.get_u16_le())
}

/// Read a little-endian signed 32-bit integer
#[inline]
pub fn read_long(buf: &mut Bytes) -> Result<i32> {
    ensure(buf, 4, "long")?;
    Ok(buf.get_i32_le())
}

/// Read a little-endian unsigned 32-bit integer
#[inline]
pub fn read_ulong(buf: &mut Bytes) -> Result<u32> {
    ensure(buf, 4, "ulong")?;
    Ok(buf.get_u32_le())
}

/// Read a little-endian IEEE-754 single precision float
#[inline]
pub fn read_float(buf: &mut Bytes) -> Result<f32> {
    ensure(buf, 4, "float")?;
    Ok(buf.get_f32_le())
}

/// Read a little-endian unsigned 64-bit integer
#[inline]
pub fn read_long_long(buf: &mut Bytes) -> Result<u64> {
    ensure(buf, 8, "long long")?;
    Ok(buf.get_u64_le())
}

/// Read a NUL-terminated string
///
/// # Format
/// - N bytes of string data
/// - 1 byte: 0x00 terminator (consumed, not returned)
///
/// Invalid UTF-8 is replaced rather than rejected: server names routinely
/// carry legacy code-page bytes.
pub fn read_cstring(buf: &mut Bytes) -> Result<String> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| QueryError::malformed("string is missing its NUL terminator"))?;

    let raw = buf.split_to(end);
    buf.advance(1);
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Write a NUL-terminated string
#[inline]
pub fn write_cstring(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
}
