//! # Server Query Client
//!
//! Thin per-server client exposing info, players, rules and ping queries.
//!
//! # Execution Model
//!
//! Every query:
//! 1. Fails with [`QueryError::NoAddress`] before any I/O if no address is set
//! 2. Acquires a fresh connection from the [`Connector`]
//! 3. Runs its request/response exchange(s) raced against the query timeout
//! 4. Drops the connection, abandoning any in-flight read
//!
//! Players and rules queries negotiate a challenge first, on the same
//! connection and under the same deadline.
//!
//! # Example
//!
//! ```rust,no_run
//! use srcquery_network::SourceServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = SourceServer::new("127.0.0.1:27015");
//!     let info = server.info().await?;
//!     println!("{} on {} ({}/{})", info.name, info.map, info.players, info.max_players);
//!     Ok(())
//! }
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use srcquery_core::{QueryError, Result};
use srcquery_protocol::{
    build_challenged_request, build_info_request, build_ping_request, decode_players,
    decode_rules, parse_challenge_response, Fragment, Player, RequestType, ResponseType, Rule,
    ServerInfo, PACKET_SIZE,
};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::challenge::negotiate_challenge;
use crate::config::ClientConfig;
use crate::query::{exchange, with_timeout};
use crate::transport::{Connector, Transport, UdpConnector};

/// Query client for one game server
#[derive(Debug, Clone)]
pub struct SourceServer<C = UdpConnector> {
    address: Option<String>,
    connector: C,
    timeout: Duration,
}

impl SourceServer<UdpConnector> {
    /// Client for `address` over UDP with the default timeout
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_connector(Some(address.into()), UdpConnector)
    }
}

impl<C: Connector> SourceServer<C> {
    pub fn with_connector(address: Option<String>, connector: C) -> Self {
        Self {
            address,
            connector,
            timeout: ClientConfig::default().query_timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = Some(address.into());
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn require_address(&self) -> Result<&str> {
        self.address
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or(QueryError::NoAddress)
    }

    /// Query server info
    ///
    /// Servers that demand a challenge for info answer the first request
    /// with `'A'`; the request is then repeated with the token appended.
    pub async fn info(&self) -> Result<ServerInfo> {
        let addr = self.require_address()?;

        with_timeout(self.timeout, async {
            let mut conn = self.connector.connect(addr).await?;

            let mut request = BytesMut::new();
            build_info_request(&mut request);
            let mut payload = exchange(&mut conn, &request).await?;

            if payload.first() == Some(&ResponseType::Challenge.as_u8()) {
                let challenge = parse_challenge_response(payload)?;
                debug!("{} requires challenge {:#010x} for info", addr, challenge);
                request.put_i32_le(challenge);
                payload = exchange(&mut conn, &request).await?;
            }

            ServerInfo::decode(payload)
        })
        .await
    }

    /// Query the connected players
    pub async fn players(&self) -> Result<Vec<Player>> {
        let addr = self.require_address()?;

        with_timeout(self.timeout, async {
            let mut conn = self.connector.connect(addr).await?;
            let payload = challenged_exchange(&mut conn, RequestType::Players).await?;
            decode_players(payload)
        })
        .await
    }

    /// Query the server rules, in wire order
    pub async fn rules(&self) -> Result<Vec<Rule>> {
        let addr = self.require_address()?;

        with_timeout(self.timeout, async {
            let mut conn = self.connector.connect(addr).await?;
            let payload = challenged_exchange(&mut conn, RequestType::Rules).await?;
            decode_rules(payload)
        })
        .await
    }

    /// Measure round-trip latency
    pub async fn ping(&self) -> Result<Duration> {
        let addr = self.require_address()?;

        with_timeout(self.timeout, async {
            let mut conn = self.connector.connect(addr).await?;

            let mut request = BytesMut::new();
            build_ping_request(&mut request);

            let mut buffer = [0u8; PACKET_SIZE];
            let start = Instant::now();
            conn.send(&request).await?;
            let n = conn.recv(&mut buffer).await?;
            let elapsed = start.elapsed();

            let reply = Fragment::parse(Bytes::copy_from_slice(&buffer[..n]))?;
            match reply.payload.first() {
                Some(&tag) if tag == ResponseType::Ping.as_u8() => Ok(elapsed),
                other => Err(QueryError::Malformed(format!(
                    "expected ping reply, got tag {:02X?}",
                    other
                ))),
            }
        })
        .await
    }
}

async fn challenged_exchange<T: Transport + ?Sized>(
    conn: &mut T,
    request_type: RequestType,
) -> Result<Bytes> {
    let challenge = negotiate_challenge(conn, request_type).await?;

    let mut request = BytesMut::new();
    build_challenged_request(&mut request, request_type, challenge);
    exchange(conn, &request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryConnector;
    use srcquery_core::ErrorKind;

    const ADDR: &str = "10.0.0.1:27015";

    fn server(connector: &MemoryConnector) -> SourceServer<MemoryConnector> {
        SourceServer::with_connector(Some(ADDR.to_string()), connector.clone())
            .with_timeout(Duration::from_millis(50))
    }

    fn info_datagram() -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_slice(b"\xFF\xFF\xFF\xFFI\x11");
        buf.put_slice(b"Test\x00cp_badlands\x00tf\x00Team Fortress\x00");
        buf.put_i16_le(440);
        buf.put_slice(&[3, 24, 0, b'd', b'w', 0, 1]);
        buf.put_slice(b"8622567\x00");
        buf.put_u8(0x80);
        buf.put_u16_le(27015);
        buf.freeze()
    }

    #[tokio::test]
    async fn test_info() {
        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, info_datagram());

        let info = server(&connector).info().await.unwrap();
        assert_eq!(info.name, "Test");
        assert_eq!(info.app_id, 440);
        assert_eq!(info.extra.port, Some(27015));
        assert_eq!(connector.connect_attempts().len(), 1);
    }

    #[tokio::test]
    async fn test_info_with_challenge() {
        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, &b"\xFF\xFF\xFF\xFFA\x04\x03\x02\x01"[..]);
        connector.push_datagram(ADDR, info_datagram());

        let info = server(&connector).info().await.unwrap();
        assert_eq!(info.map, "cp_badlands");

        let sent = connector.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].1.ends_with(b"Source Engine Query\x00\x04\x03\x02\x01"));
    }

    #[tokio::test]
    async fn test_players_uses_challenge() {
        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, &b"\xFF\xFF\xFF\xFFA\x78\x56\x34\x12"[..]);
        connector.push_datagram(
            ADDR,
            &b"\xFF\xFF\xFF\xFFD\x01\x00Bob\x00\x07\x00\x00\x00\x00\x00\x20\x41"[..],
        );

        let players = server(&connector).players().await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Bob");
        assert_eq!(players[0].score, 7);
        assert_eq!(players[0].duration, Duration::from_secs(10));

        let sent = connector.sent();
        assert_eq!(&sent[0].1[..], b"\xFF\xFF\xFF\xFF\x55\xFF\xFF\xFF\xFF");
        assert_eq!(&sent[1].1[..], b"\xFF\xFF\xFF\xFF\x55\x78\x56\x34\x12");
    }

    #[tokio::test]
    async fn test_rules() {
        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, &b"\xFF\xFF\xFF\xFFA\x01\x00\x00\x00"[..]);
        connector.push_datagram(ADDR, &b"\xFF\xFF\xFF\xFFE\x02\x00a\x001\x00a\x002\x00"[..]);

        let rules = server(&connector).rules().await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].value, "2");
        assert_eq!(connector.sent()[1].1[4], 0x56);
    }

    #[tokio::test]
    async fn test_ping() {
        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, &b"\xFF\xFF\xFF\xFFj00000000000000\x00"[..]);

        let rtt = server(&connector).ping().await.unwrap();
        assert!(rtt < Duration::from_secs(1));
        assert_eq!(&connector.sent()[0].1[..], b"\xFF\xFF\xFF\xFF\x69");
    }

    #[tokio::test]
    async fn test_ping_wrong_reply() {
        let connector = MemoryConnector::new();
        connector.push_datagram(ADDR, &b"\xFF\xFF\xFF\xFFI"[..]);
        let err = server(&connector).ping().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn test_no_address_before_io() {
        let connector = MemoryConnector::new();
        let server = SourceServer::with_connector(None, connector.clone());

        assert!(matches!(server.info().await.unwrap_err(), QueryError::NoAddress));
        assert!(matches!(server.players().await.unwrap_err(), QueryError::NoAddress));
        assert!(matches!(server.rules().await.unwrap_err(), QueryError::NoAddress));
        assert!(matches!(server.ping().await.unwrap_err(), QueryError::NoAddress));
        assert!(connector.connect_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let connector = MemoryConnector::new();
        let err = server(&connector).rules().await.unwrap_err();
        assert!(matches!(err, QueryError::Timeout));
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let connector = MemoryConnector::new();
        connector.refuse(ADDR);
        let err = server(&connector).info().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
