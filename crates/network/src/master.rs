//! # Master Server Directory Client
//!
//! Fetches game server addresses from the master server directory.
//!
//! # Failover
//!
//! Master servers are kept in a fixed circular list with a shared preferred
//! index. A query starts at the preferred endpoint; on timeout it moves on to
//! the next one, and gives up with [`QueryError::Timeout`] once every
//! endpoint has been tried exactly once. The endpoint that answers becomes
//! the new preferred endpoint for later queries. Any error other than a
//! timeout is returned immediately without trying further endpoints.
//!
//! # Paging
//!
//! One response carries one page of addresses. The last address of a page
//! is the start address of the next; the list ends with `0.0.0.0:0`.
//! [`DirectoryClient::query_all`] follows pages up to a configured bound.

use bytes::{Bytes, BytesMut};
use srcquery_core::{QueryError, Region, Result};
use srcquery_protocol::{build_master_request, decode_master_response, AddressRecord, Filter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, DEFAULT_MASTER_SERVERS};
use crate::query::with_timeout;
use crate::transport::{Connector, Transport, UdpConnector};

pub use srcquery_protocol::START_OF_LIST;

/// Master server responses are read whole into a buffer this large
const MASTER_BUFFER_SIZE: usize = 64 * 1024;

/// Circular list of master server endpoints with a shared preferred index
///
/// Clones share the preferred index.
#[derive(Debug, Clone)]
pub struct EndpointSet {
    endpoints: Arc<[String]>,
    preferred: Arc<AtomicUsize>,
}

impl EndpointSet {
    pub fn new(endpoints: Vec<String>, preferred: usize) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(QueryError::Config(
                "at least one master server is required".to_string(),
            ));
        }
        if preferred >= endpoints.len() {
            return Err(QueryError::Config(format!(
                "preferred master {} out of range for {} endpoints",
                preferred,
                endpoints.len()
            )));
        }

        Ok(Self {
            endpoints: endpoints.into(),
            preferred: Arc::new(AtomicUsize::new(preferred)),
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.endpoints.get(index).map(String::as_str)
    }

    pub fn preferred(&self) -> usize {
        self.preferred.load(Ordering::Relaxed)
    }

    pub fn set_preferred(&self, index: usize) {
        if index < self.endpoints.len() {
            self.preferred.store(index, Ordering::Relaxed);
        }
    }
}

impl Default for EndpointSet {
    fn default() -> Self {
        let config = ClientConfig::default();
        Self {
            endpoints: DEFAULT_MASTER_SERVERS.iter().map(|s| s.to_string()).collect(),
            preferred: Arc::new(AtomicUsize::new(config.preferred_master)),
        }
    }
}

/// Master server directory client
#[derive(Debug, Clone)]
pub struct DirectoryClient<C = UdpConnector> {
    endpoints: EndpointSet,
    connector: C,
    region: Region,
    filter: Filter,
    timeout: Duration,
    max_pages: usize,
}

impl DirectoryClient<UdpConnector> {
    /// UDP client over the default master servers
    pub fn new() -> Self {
        Self::with_connector(EndpointSet::default(), UdpConnector)
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::from_config_with_connector(config, UdpConnector)
    }
}

impl Default for DirectoryClient<UdpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> DirectoryClient<C> {
    pub fn with_connector(endpoints: EndpointSet, connector: C) -> Self {
        let config = ClientConfig::default();
        Self {
            endpoints,
            connector,
            region: config.region,
            filter: Filter::new(),
            timeout: config.master_timeout,
            max_pages: config.max_pages,
        }
    }

    pub fn from_config_with_connector(config: &ClientConfig, connector: C) -> Result<Self> {
        config.validate().map_err(QueryError::Config)?;

        let endpoints = EndpointSet::new(config.master_servers.clone(), config.preferred_master)?;
        Ok(Self {
            endpoints,
            connector,
            region: config.region,
            filter: Filter::new(),
            timeout: config.master_timeout,
            max_pages: config.max_pages,
        })
    }

    pub fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn set_region(&mut self, region: Region) {
        self.region = region;
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Per-endpoint timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_max_pages(&mut self, max_pages: usize) {
        self.max_pages = max_pages;
    }

    /// Fetch one page of addresses starting after `start`
    ///
    /// The returned records may end with the `0.0.0.0:0` terminator.
    pub async fn query(&self, start: &str) -> Result<Vec<AddressRecord>> {
        let mut request = BytesMut::new();
        build_master_request(&mut request, self.region, start, &self.filter.encode());

        let first = self.endpoints.preferred();
        let mut index = first;

        loop {
            let Some(endpoint) = self.endpoints.get(index) else {
                return Err(QueryError::Config(format!("no master server at index {}", index)));
            };
            debug!("Querying master server {} (index {})", endpoint, index);

            match with_timeout(self.timeout, self.fetch(endpoint, &request)).await {
                Ok(records) => {
                    if index != first {
                        info!("Master server {} is now preferred", endpoint);
                    }
                    self.endpoints.set_preferred(index);
                    return Ok(records);
                }
                Err(e) if e.is_timeout() => {
                    warn!("Master server {} timed out", endpoint);
                    index = (index + 1) % self.endpoints.len();
                    if index == first {
                        warn!("All {} master servers timed out", self.endpoints.len());
                        return Err(QueryError::Timeout);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch every page from the start of the list
    ///
    /// Stops at the terminator, at an empty page or after the configured
    /// page limit. The terminator is not included.
    pub async fn query_all(&self) -> Result<Vec<AddressRecord>> {
        let mut servers = Vec::new();
        let mut start = START_OF_LIST.to_string();

        for page in 0..self.max_pages {
            let records = self.query(&start).await?;
            let done = records.last().map_or(true, AddressRecord::is_terminator);

            debug!("Master page {} returned {} addresses", page, records.len());
            servers.extend(records.iter().filter(|r| !r.is_terminator()).copied());

            if done {
                return Ok(servers);
            }
            if let Some(last) = records.last() {
                start = last.to_string();
            }
        }

        warn!(
            "Stopped directory listing after {} pages ({} addresses)",
            self.max_pages,
            servers.len()
        );
        Ok(servers)
    }

    async fn fetch(&self, endpoint: &str, request: &[u8]) -> Result<Vec<AddressRecord>> {
        let mut conn = self.connector.connect(endpoint).await?;
        conn.send(request).await?;

        let mut buffer = vec![0u8; MASTER_BUFFER_SIZE];
        let n = conn.recv(&mut buffer).await?;
        decode_master_response(Bytes::copy_from_slice(&buffer[..n]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryConnector;
    use bytes::BufMut;
    use srcquery_core::ErrorKind;
    use srcquery_protocol::master::MASTER_RESPONSE_HEADER;

    fn endpoints() -> Vec<String> {
        (1..=4).map(|i| format!("10.0.0.{}:27011", i)).collect()
    }

    fn client(connector: &MemoryConnector, preferred: usize) -> DirectoryClient<MemoryConnector> {
        let set = EndpointSet::new(endpoints(), preferred).unwrap();
        let mut client = DirectoryClient::with_connector(set, connector.clone());
        client.set_timeout(Duration::from_millis(20));
        client
    }

    fn page(records: &[AddressRecord]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_slice(&MASTER_RESPONSE_HEADER);
        for record in records {
            record.write_to(&mut buf);
        }
        buf.freeze()
    }

    const A: AddressRecord = AddressRecord::new([1, 2, 3, 4], 27015);
    const B: AddressRecord = AddressRecord::new([5, 6, 7, 8], 27016);
    const END: AddressRecord = AddressRecord::new([0, 0, 0, 0], 0);

    #[tokio::test]
    async fn test_query_preferred() {
        let connector = MemoryConnector::new();
        connector.push_datagram("10.0.0.3:27011", page(&[A, B]));

        let client = client(&connector, 2);
        let records = client.query(START_OF_LIST).await.unwrap();
        assert_eq!(records, vec![A, B]);
        assert_eq!(connector.connect_attempts(), ["10.0.0.3:27011"]);

        let sent = connector.sent();
        assert_eq!(&sent[0].1[..], b"\x31\x010.0.0.0:0\x00\x00");
    }

    #[tokio::test]
    async fn test_all_silent_times_out_after_each_endpoint() {
        let connector = MemoryConnector::new();
        let client = client(&connector, 2);

        let err = client.query(START_OF_LIST).await.unwrap_err();
        assert!(matches!(err, QueryError::Timeout));
        assert_eq!(
            connector.connect_attempts(),
            ["10.0.0.3:27011", "10.0.0.4:27011", "10.0.0.1:27011", "10.0.0.2:27011"]
        );
        assert_eq!(client.endpoints().preferred(), 2);
    }

    #[tokio::test]
    async fn test_failover_updates_preferred() {
        let connector = MemoryConnector::new();
        connector.push_datagram("10.0.0.1:27011", page(&[A]));
        connector.push_datagram("10.0.0.1:27011", page(&[B]));

        let client = client(&connector, 2);
        let records = client.query(START_OF_LIST).await.unwrap();
        assert_eq!(records, vec![A]);
        assert_eq!(client.endpoints().preferred(), 0);

        let records = client.query(START_OF_LIST).await.unwrap();
        assert_eq!(records, vec![B]);
        assert_eq!(
            connector.connect_attempts(),
            ["10.0.0.3:27011", "10.0.0.4:27011", "10.0.0.1:27011", "10.0.0.1:27011"]
        );
    }

    #[tokio::test]
    async fn test_preferred_shared_between_clones() {
        let connector = MemoryConnector::new();
        connector.push_datagram("10.0.0.4:27011", page(&[A]));

        let client = client(&connector, 2);
        let other = client.clone();
        client.query(START_OF_LIST).await.unwrap();
        assert_eq!(other.endpoints().preferred(), 3);
    }

    #[tokio::test]
    async fn test_transport_error_does_not_fail_over() {
        let connector = MemoryConnector::new();
        connector.refuse("10.0.0.3:27011");
        connector.push_datagram("10.0.0.4:27011", page(&[A]));

        let client = client(&connector, 2);
        let err = client.query(START_OF_LIST).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(connector.connect_attempts().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_header_does_not_fail_over() {
        let connector = MemoryConnector::new();
        connector.push_datagram("10.0.0.3:27011", &b"\xFF\xFF\xFF\xFFI\x00"[..]);

        let client = client(&connector, 2);
        let err = client.query(START_OF_LIST).await.unwrap_err();
        assert!(matches!(err, QueryError::HeaderMismatch));
        assert_eq!(client.endpoints().preferred(), 2);
    }

    #[tokio::test]
    async fn test_query_all_follows_pages() {
        let connector = MemoryConnector::new();
        connector.push_datagram("10.0.0.3:27011", page(&[A]));
        connector.push_datagram("10.0.0.3:27011", page(&[B, END]));

        let mut client = client(&connector, 2);
        client.set_region(Region::Europe);
        client.filter_mut().set("appid", 440i64);

        let servers = client.query_all().await.unwrap();
        assert_eq!(servers, vec![A, B]);

        let sent = connector.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(&sent[0].1[..], b"\x31\x030.0.0.0:0\x00\\appid\\440\x00");
        assert_eq!(&sent[1].1[..], b"\x31\x031.2.3.4:27015\x00\\appid\\440\x00");
    }

    #[tokio::test]
    async fn test_query_all_page_limit() {
        let connector = MemoryConnector::new();
        connector.push_datagram("10.0.0.3:27011", page(&[A]));
        connector.push_datagram("10.0.0.3:27011", page(&[B]));
        connector.push_datagram("10.0.0.3:27011", page(&[END]));

        let mut client = client(&connector, 2);
        client.set_max_pages(2);

        let servers = client.query_all().await.unwrap();
        assert_eq!(servers, vec![A, B]);
        assert_eq!(connector.pending("10.0.0.3:27011"), 1);
    }

    #[test]
    fn test_endpoint_set_validation() {
        assert!(EndpointSet::new(Vec::new(), 0).is_err());
        assert!(EndpointSet::new(endpoints(), 4).is_err());

        let set = EndpointSet::default();
        assert_eq!(set.len(), 4);
        assert_eq!(set.preferred(), 2);
        assert_eq!(set.get(2), Some("208.64.200.117:27011"));
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = ClientConfig {
            master_servers: Vec::new(),
            preferred_master: 0,
            ..Default::default()
        };
        let err = DirectoryClient::from_config(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
