//! Compression layer for split responses
//!
//! Compressed responses are bzip2 streams. The first fragment's header carries
//! the decompressed size and a CRC-32 of the decompressed bytes; both are
//! checked before anything is handed to a decoder.

use crate::fragment::CompressionInfo;
use srcquery_core::{QueryError, Result};
use std::io::{Read, Write};

/// Compress a payload with bzip2 and compute the metadata a server would send with it
pub fn compress(data: &[u8]) -> Result<(Vec<u8>, CompressionInfo)> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| QueryError::Decompression(format!("Failed to compress payload: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| QueryError::Decompression(format!("Failed to finish compression: {}", e)))?;

    let info = CompressionInfo {
        decompressed_size: data.len() as u32,
        crc32: crc32fast::hash(data),
    };
    Ok((compressed, info))
}

/// Decompress a payload and verify it against its metadata
///
/// At most `decompressed_size + 1` bytes are inflated, so a hostile stream
/// cannot balloon memory before the size check rejects it. No partial data
/// is returned on failure.
pub fn decompress(data: &[u8], info: &CompressionInfo) -> Result<Vec<u8>> {
    let expected = info.decompressed_size;
    let limit = u64::from(expected) + 1;

    let mut decompressed = Vec::with_capacity(expected.min(1 << 20) as usize);
    bzip2::read::BzDecoder::new(data)
        .take(limit)
        .read_to_end(&mut decompressed)
        .map_err(|e| QueryError::Decompression(format!("Failed to decompress payload: {}", e)))?;

    if decompressed.len() != expected as usize {
        return Err(QueryError::PayloadSizeMismatch {
            expected,
            actual: decompressed.len(),
        });
    }

    let checksum = crc32fast::hash(&decompressed);
    if checksum != info.crc32 {
        return Err(QueryError::CrcMismatch {
            expected: info.crc32,
            actual: checksum,
        });
    }

    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bzip2_roundtrip() {
        let original = b"Hello, World! This is a test of the compression system.";

        let (compressed, info) = compress(original).unwrap();
        assert_eq!(info.decompressed_size as usize, original.len());

        let decompressed = decompress(&compressed, &info).unwrap();
        assert_eq!(original, &decompressed[..]);
    }

    #[test]
    fn test_size_mismatch() {
        let original = b"some rules payload that is long enough to compress";
        let (compressed, mut info) = compress(original).unwrap();

        info.decompressed_size += 5;
        let err = decompress(&compressed, &info).unwrap_err();
        assert!(matches!(
            err,
            QueryError::PayloadSizeMismatch { expected, actual } if actual == original.len() && expected == original.len() as u32 + 5
        ));

        info.decompressed_size = 10;
        let err = decompress(&compressed, &info).unwrap_err();
        assert!(matches!(err, QueryError::PayloadSizeMismatch { actual: 11, .. }));
    }

    #[test]
    fn test_crc_mismatch() {
        let original = b"abcdefghijklmnopqrstuvwxyz";
        let altered = b"abcdefghijklmnopqrstuvwxyZ";

        // Same length, different content: size passes, CRC must fail
        let (compressed, _) = compress(altered).unwrap();
        let info = CompressionInfo {
            decompressed_size: original.len() as u32,
            crc32: crc32fast::hash(original),
        };

        let err = decompress(&compressed, &info).unwrap_err();
        assert!(matches!(err, QueryError::CrcMismatch { .. }));
        assert_eq!(err.kind(), srcquery_core::ErrorKind::Integrity);
    }

    #[test]
    fn test_garbage_stream() {
        let info = CompressionInfo {
            decompressed_size: 4,
            crc32: 0,
        };
        let err = decompress(b"definitely not bzip2", &info).unwrap_err();
        assert_eq!(err.kind(), srcquery_core::ErrorKind::Integrity);
    }
}
