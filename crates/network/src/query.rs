//! # Request/Response Pipeline
//!
//! Turns one or more received datagrams into a single verified payload and
//! bounds every exchange with a timeout.
//!
//! # Flow
//!
//! ```text
//! send request -> recv datagram -> Fragment::parse -> Reassembler::push
//!                      ^                                     |
//!                      +---------- not complete -------------+
//!                                                            |
//!                                      Reassembler::into_payload (decompress + CRC)
//! ```

use bytes::Bytes;
use srcquery_core::{QueryError, Result};
use srcquery_protocol::{Fragment, Reassembler, PACKET_SIZE};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

use crate::transport::Transport;

/// Receive datagrams until a full response is reassembled
///
/// Each receive is a single blocking read with no timeout of its own; wrap
/// the call in [`with_timeout`].
pub async fn read_response<T: Transport + ?Sized>(conn: &mut T) -> Result<Bytes> {
    let mut reassembler = Reassembler::new();

    loop {
        let mut buffer = [0u8; PACKET_SIZE];
        let n = conn.recv(&mut buffer).await?;
        trace!("Received datagram: {:02X?}", &buffer[..n.min(64)]);

        let fragment = Fragment::parse(Bytes::copy_from_slice(&buffer[..n]))?;
        if reassembler.push(fragment)? {
            break;
        }
        debug!(
            "Waiting for more fragments ({}/{})",
            reassembler.received(),
            reassembler.expected()
        );
    }

    reassembler.into_payload()
}

/// Send a request and read its full response
pub async fn exchange<T: Transport + ?Sized>(conn: &mut T, request: &[u8]) -> Result<Bytes> {
    conn.send(request).await?;
    read_response(conn).await
}

/// Race a query against a deadline
///
/// If the deadline passes first, the query future is dropped along with any
/// read it was blocked on, and [`QueryError::Timeout`] is returned.
pub async fn with_timeout<F, T>(limit: Duration, query: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, query).await {
        Ok(result) => result,
        Err(_) => {
            debug!("Query timed out after {:?}", limit);
            Err(QueryError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Connector, MemoryConnector};
    use bytes::BytesMut;
    use srcquery_protocol::{compression, SplitHeader, COMPRESSED_FLAG};

    const ADDR: &str = "10.0.0.1:27015";

    fn split_datagram(total: u8, number: u8, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::new();
        Fragment {
            split: Some(SplitHeader {
                sequence_id: 42,
                total,
                number,
                size: 1248,
                compression: None,
            }),
            payload: Bytes::copy_from_slice(payload),
        }
        .write_to(&mut buf);
        buf.freeze()
    }

    #[tokio::test]
    async fn test_single_datagram() {
        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, &b"\xFF\xFF\xFF\xFFA\x01\x00\x00\x00"[..]);

        let mut conn = connector.connect(ADDR).await.unwrap();
        let payload = exchange(&mut conn, b"request").await.unwrap();
        assert_eq!(&payload[..], b"A\x01\x00\x00\x00");
    }

    #[tokio::test]
    async fn test_split_out_of_order() {
        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, split_datagram(3, 2, b"ghi"));
        connector.push_datagram(ADDR, split_datagram(3, 0, b"abc"));
        connector.push_datagram(ADDR, split_datagram(3, 1, b"def"));

        let mut conn = connector.connect(ADDR).await.unwrap();
        let payload = read_response(&mut conn).await.unwrap();
        assert_eq!(&payload[..], b"abcdefghi");
    }

    #[tokio::test]
    async fn test_compressed_split_response() {
        let original = b"\xFF\xFF\xFF\xFFE\x01\x00sv_gravity\x00800\x00";
        let (compressed, info) = compression::compress(original).unwrap();

        let mut buf = BytesMut::new();
        Fragment {
            split: Some(SplitHeader {
                sequence_id: 9 | COMPRESSED_FLAG,
                total: 1,
                number: 0,
                size: 1248,
                compression: Some(info),
            }),
            payload: Bytes::from(compressed),
        }
        .write_to(&mut buf);

        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, buf.freeze());

        let mut conn = connector.connect(ADDR).await.unwrap();
        let payload = read_response(&mut conn).await.unwrap();
        assert_eq!(&payload[..], &original[4..]);
    }

    #[tokio::test]
    async fn test_bad_fragment_index_aborts() {
        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, split_datagram(2, 5, b"x"));

        let mut conn = connector.connect(ADDR).await.unwrap();
        let err = read_response(&mut conn).await.unwrap_err();
        assert!(matches!(err, QueryError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_missing_fragment_times_out() {
        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, split_datagram(2, 0, b"half"));

        let mut conn = connector.connect(ADDR).await.unwrap();
        let err = with_timeout(Duration::from_millis(20), read_response(&mut conn))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
