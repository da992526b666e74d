//! Change detection over polled memory ranges
//!
//! Each poll reads every range, fingerprints the bytes, and reports which
//! ranges differ from the previous generation. Snapshots are replaced as a
//! whole, never mutated, so byte views handed out earlier stay valid while
//! the next poll runs.

use crate::range::{MemoryRange, MemoryReader, ReadError};
use std::sync::Arc;
use tracing::{debug, trace};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fingerprint(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// One generation of one range's content.
#[derive(Debug, Clone)]
pub struct RangeSnapshot {
    data: Arc<[u8]>,
    fingerprint: u64,
}

impl RangeSnapshot {
    fn new(bytes: Vec<u8>) -> Self {
        let fingerprint = fingerprint(&bytes);
        Self { data: bytes.into(), fingerprint }
    }

    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }
}

/// Indices of ranges whose content changed since the previous poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedRanges(Vec<u8>);

impl ChangedRanges {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[u8] {
        &self.0
    }
}

/// Polls a fixed range table through a [`MemoryReader`] and reports changes.
pub struct ChangeDetector<R: MemoryReader> {
    reader: R,
    ranges: Vec<MemoryRange>,
    snapshots: Option<Vec<RangeSnapshot>>,
}

impl<R: MemoryReader> ChangeDetector<R> {
    pub fn new(reader: R, ranges: impl Into<Vec<MemoryRange>>) -> Self {
        Self {
            reader,
            ranges: ranges.into(),
            snapshots: None,
        }
    }

    pub fn ranges(&self) -> &[MemoryRange] {
        &self.ranges
    }

    /// Reads every range and reports which ones changed.
    ///
    /// The first poll after attach reports all ranges changed. A hash that
    /// differs from the previous generation proves a change; an equal hash
    /// is confirmed by byte comparison, so a collision can never hide one.
    /// A read failure leaves every snapshot untouched and is retried by the
    /// caller on the next tick.
    pub fn poll(&mut self) -> Result<ChangedRanges, ReadError> {
        let mut fresh = Vec::with_capacity(self.ranges.len());
        for range in &self.ranges {
            let bytes = self.reader.read(*range)?;
            if bytes.len() != range.len as usize {
                return Err(ReadError::Short {
                    offset: range.offset,
                    wanted: range.len,
                    got: bytes.len(),
                });
            }
            fresh.push(bytes);
        }

        let changed = match self.snapshots.as_mut() {
            None => {
                let all = (0..self.ranges.len() as u8).collect();
                self.snapshots = Some(fresh.into_iter().map(RangeSnapshot::new).collect());
                debug!(ranges = self.ranges.len(), "bootstrap poll, all ranges changed");
                ChangedRanges(all)
            }
            Some(snapshots) => {
                let mut changed = Vec::new();
                for (index, bytes) in fresh.into_iter().enumerate() {
                    let prev = &snapshots[index];
                    let hash = fingerprint(&bytes);
                    let differs = if hash != prev.fingerprint {
                        true
                    } else {
                        // equal hash could be a collision
                        bytes[..] != prev.data[..]
                    };
                    if differs {
                        snapshots[index] = RangeSnapshot::new(bytes);
                        changed.push(index as u8);
                    }
                }
                ChangedRanges(changed)
            }
        };
        trace!(changed = changed.0.len(), "poll complete");
        Ok(changed)
    }

    /// Latest snapshot of one range, if a poll has completed.
    pub fn snapshot(&self, index: usize) -> Option<&RangeSnapshot> {
        self.snapshots.as_ref()?.get(index)
    }

    /// All range contents concatenated in table order.
    pub fn concat(&self) -> Option<Vec<u8>> {
        let snapshots = self.snapshots.as_ref()?;
        let total = self.ranges.iter().map(|r| r.len as usize).sum();
        let mut out = Vec::with_capacity(total);
        for snapshot in snapshots {
            out.extend_from_slice(&snapshot.data);
        }
        Some(out)
    }
}
