//! # Datagram Transports
//!
//! Every query acquires a fresh connection from a [`Connector`] and drops it
//! when done. Nothing is pooled: a read abandoned on timeout dies with its
//! socket, so a late reply can never be mistaken for the answer to a later
//! query.
//!
//! Two implementations ship with the crate:
//! - [`UdpConnector`] - real UDP sockets via Tokio
//! - [`MemoryConnector`] - scripted in-memory datagrams, for tests and tooling

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use srcquery_core::Result;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::trace;

/// A connected datagram channel to one remote address
#[async_trait]
pub trait Transport: Send {
    /// Send one datagram
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one datagram into `buf`, returning its length
    ///
    /// Blocks until a datagram arrives; there is no intrinsic timeout.
    /// Datagrams longer than `buf` are truncated.
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Produces a fresh [`Transport`] for an address string
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Transport;

    async fn connect(&self, addr: &str) -> Result<Self::Conn>;
}

/// Connects UDP sockets
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector;

/// A connected UDP socket
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.peer_addr()?)
    }
}

#[async_trait]
impl Connector for UdpConnector {
    type Conn = UdpTransport;

    async fn connect(&self, addr: &str) -> Result<UdpTransport> {
        let remote = tokio::net::lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("{} did not resolve", addr))
            })?;

        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(remote).await?;
        trace!("Connected UDP socket {:?} -> {}", socket.local_addr().ok(), remote);

        Ok(UdpTransport { socket })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.socket.send(data).await?;
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.socket.recv(buf).await?)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Datagrams waiting to be received, per remote address
    inbound: HashMap<String, VecDeque<Bytes>>,
    /// Addresses whose connect fails
    refused: HashSet<String>,
    /// Every connect attempt, in order
    connects: Vec<String>,
    /// Every datagram sent, with its destination
    sent: Vec<(String, Bytes)>,
}

/// Scripted in-memory connector
///
/// Datagrams queued with [`MemoryConnector::push_datagram`] are handed out in
/// order to whichever connection to that address reads next. A read with
/// nothing queued never completes, which is how a silent server looks.
/// Clones share the same script.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a datagram to be received from `addr`
    pub fn push_datagram(&self, addr: &str, datagram: impl Into<Bytes>) {
        self.state
            .lock()
            .inbound
            .entry(addr.to_string())
            .or_default()
            .push_back(datagram.into());
    }

    /// Make every connect to `addr` fail with `ConnectionRefused`
    pub fn refuse(&self, addr: &str) {
        self.state.lock().refused.insert(addr.to_string());
    }

    /// Addresses connected to so far, in order
    pub fn connect_attempts(&self) -> Vec<String> {
        self.state.lock().connects.clone()
    }

    /// Datagrams sent so far, with their destinations
    pub fn sent(&self) -> Vec<(String, Bytes)> {
        self.state.lock().sent.clone()
    }

    /// Number of datagrams still queued for `addr`
    pub fn pending(&self, addr: &str) -> usize {
        self.state.lock().inbound.get(addr).map_or(0, VecDeque::len)
    }
}

/// Connection handed out by [`MemoryConnector`]
#[derive(Debug)]
pub struct MemoryTransport {
    addr: String,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Conn = MemoryTransport;

    async fn connect(&self, addr: &str) -> Result<MemoryTransport> {
        let mut state = self.state.lock();
        state.connects.push(addr.to_string());
        if state.refused.contains(addr) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{} refused the connection", addr),
            )
            .into());
        }

        Ok(MemoryTransport {
            addr: addr.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.state
            .lock()
            .sent
            .push((self.addr.clone(), Bytes::copy_from_slice(data)));
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let next = self
            .state
            .lock()
            .inbound
            .get_mut(&self.addr)
            .and_then(VecDeque::pop_front);

        match next {
            Some(datagram) => {
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(n)
            }
            None => std::future::pending().await,
        }
    }
}
