//! Packet reassembly
//!
//! Collects the fragments of one response, keyed by fragment index, and turns
//! them into a single verified payload.
//!
//! # Lifecycle
//! 1. Start expecting exactly one fragment
//! 2. [`Reassembler::push`] each parsed [`Fragment`] as it arrives
//! 3. Once [`Reassembler::is_complete`], call [`Reassembler::into_payload`]
//!
//! The fragment count is only trusted once a fragment declares it. A fragment
//! declaring a different count than currently expected drops everything held
//! so far and resizes the slot table to the new count. Fragment counts are a
//! single byte, so the table never exceeds 255 slots.

use bytes::{Bytes, BytesMut};
use srcquery_core::{QueryError, Result};
use tracing::{debug, trace};

use crate::compression;
use crate::fragment::Fragment;
use crate::packets::HEADER_SIMPLE_BYTES;

/// Accumulates fragments for one in-flight query
#[derive(Debug)]
pub struct Reassembler {
    slots: Vec<Option<Fragment>>,
    received: usize,
}

impl Reassembler {
    pub fn new() -> Self {
        Self {
            slots: vec![None],
            received: 0,
        }
    }

    /// Number of fragments the response is currently believed to have
    pub fn expected(&self) -> usize {
        self.slots.len()
    }

    /// Number of distinct fragment slots filled so far
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.slots.len()
    }

    /// Add a fragment; returns whether the response is now complete
    ///
    /// A fragment whose index does not fit the declared count fails with
    /// [`QueryError::Malformed`]. A repeated index replaces the earlier copy
    /// without counting twice.
    pub fn push(&mut self, fragment: Fragment) -> Result<bool> {
        let total = usize::from(fragment.fragment_count());
        if total != self.slots.len() {
            debug!(
                "Fragment count changed from {} to {}, resetting reassembly buffer",
                self.slots.len(),
                total
            );
            self.slots = vec![None; total];
            self.received = 0;
        }

        let index = usize::from(fragment.fragment_index());
        if index >= self.slots.len() {
            return Err(QueryError::Malformed(format!(
                "fragment index {} out of range for {} fragments",
                index,
                self.slots.len()
            )));
        }

        trace!(
            "Fragment {}/{} ({} bytes)",
            index + 1,
            total,
            fragment.payload.len()
        );

        if self.slots[index].replace(fragment).is_none() {
            self.received += 1;
        }

        Ok(self.is_complete())
    }

    /// Concatenate the fragment payloads in index order
    pub fn contiguous_payload(&self) -> Result<Bytes> {
        if !self.is_complete() {
            return Err(QueryError::Malformed(format!(
                "response incomplete: {} of {} fragments",
                self.received,
                self.slots.len()
            )));
        }

        if let [Some(only)] = self.slots.as_slice() {
            return Ok(only.payload.clone());
        }

        let size: usize = self.slots.iter().flatten().map(|f| f.payload.len()).sum();
        let mut contiguous = BytesMut::with_capacity(size);
        for fragment in self.slots.iter().flatten() {
            contiguous.extend_from_slice(&fragment.payload);
        }
        Ok(contiguous.freeze())
    }

    /// Produce the full payload, decompressing if fragment 0 says so
    ///
    /// Fragment 0's header is the only source of compression metadata. Split
    /// responses repeat the simple `FF FF FF FF` header at the start of the
    /// reassembled payload; it is stripped here so decoders always start at
    /// the response tag.
    pub fn into_payload(self) -> Result<Bytes> {
        let payload = self.contiguous_payload()?;

        let first = self.slots.first().and_then(Option::as_ref);
        let split = first.is_some_and(Fragment::is_split);
        let payload = match first.and_then(Fragment::compression) {
            Some(info) => {
                debug!(
                    "Decompressing {} byte payload (expecting {} bytes)",
                    payload.len(),
                    info.decompressed_size
                );
                Bytes::from(compression::decompress(&payload, &info)?)
            }
            None => payload,
        };

        Ok(if split {
            strip_simple_header(payload)
        } else {
            payload
        })
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove a leading simple header if the payload carries one
pub fn strip_simple_header(payload: Bytes) -> Bytes {
    if payload.starts_with(&HEADER_SIMPLE_BYTES) {
        payload.slice(HEADER_SIMPLE_BYTES.len()..)
    } else {
        payload
    }
}
