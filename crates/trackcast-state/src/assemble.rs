//! Reassembling range snapshots from producer packets
//!
//! The server side of the producer stream: applies `RangesInit` and
//! `RangesDelta` packets against the static range table and yields the
//! concatenated snapshot bytes whenever a packet completes one.

use crate::range::MemoryRange;
use thiserror::Error;
use trackcast_wire::Packet;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("delta received before any init packet")]
    DeltaBeforeInit,

    #[error("init packet carries {got} ranges, table has {expected}")]
    RangeCount { expected: usize, got: usize },

    #[error("range index {0} is outside the table")]
    RangeIndex(u8),

    #[error("range {index} payload is {got} bytes, table says {expected}")]
    RangeLength { index: u8, expected: u32, got: usize },
}

/// Tracks the latest payload per range for one producer connection.
pub struct RangeAssembler {
    table: Vec<MemoryRange>,
    bufs: Option<Vec<Vec<u8>>>,
}

impl RangeAssembler {
    pub fn new(table: impl Into<Vec<MemoryRange>>) -> Self {
        Self { table: table.into(), bufs: None }
    }

    /// Applies one packet. Returns the concatenated snapshot if the packet
    /// produced a new complete one, `None` for `Goodbye`.
    pub fn apply(&mut self, packet: &Packet) -> Result<Option<Vec<u8>>, AssembleError> {
        match packet {
            Packet::Goodbye => Ok(None),
            Packet::RangesInit(ranges) => {
                if ranges.len() != self.table.len() {
                    return Err(AssembleError::RangeCount {
                        expected: self.table.len(),
                        got: ranges.len(),
                    });
                }
                for (index, (payload, range)) in ranges.iter().zip(&self.table).enumerate() {
                    check_len(index as u8, range, payload)?;
                }
                self.bufs = Some(ranges.clone());
                Ok(Some(self.concat()))
            }
            Packet::RangesDelta(entries) => {
                let Some(bufs) = self.bufs.as_mut() else {
                    return Err(AssembleError::DeltaBeforeInit);
                };
                for (index, payload) in entries {
                    let range = self
                        .table
                        .get(*index as usize)
                        .ok_or(AssembleError::RangeIndex(*index))?;
                    check_len(*index, range, payload)?;
                    bufs[*index as usize] = payload.clone();
                }
                Ok(Some(self.concat()))
            }
        }
    }

    fn concat(&self) -> Vec<u8> {
        let bufs = self.bufs.as_ref().expect("concat before init");
        let total = self.table.iter().map(|r| r.len as usize).sum();
        let mut out = Vec::with_capacity(total);
        for buf in bufs {
            out.extend_from_slice(buf);
        }
        out
    }
}

fn check_len(index: u8, range: &MemoryRange, payload: &[u8]) -> Result<(), AssembleError> {
    if payload.len() != range.len as usize {
        return Err(AssembleError::RangeLength {
            index,
            expected: range.len,
            got: payload.len(),
        });
    }
    Ok(())
}
