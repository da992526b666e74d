//! Memory ranges and the process-memory boundary

use std::io;
use thiserror::Error;

/// A fixed contiguous window of the observed process's memory, polled as a
/// unit. The table of ranges is static for the lifetime of an attachment
/// and all ranges are disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRange {
    pub offset: u32,
    pub len: u32,
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("I/O error reading process memory: {0}")]
    Io(#[from] io::Error),

    #[error("process detached")]
    Detached,

    #[error("short read: wanted {wanted} bytes at {offset:#x}, got {got}")]
    Short { offset: u32, wanted: u32, got: usize },
}

/// Access to the observed process's memory. Marshaling to an emulator or
/// debugger API lives behind this trait; the poll loop only sees bytes.
pub trait MemoryReader {
    fn read(&mut self, range: MemoryRange) -> Result<Vec<u8>, ReadError>;
}

impl<R: MemoryReader + ?Sized> MemoryReader for &mut R {
    fn read(&mut self, range: MemoryRange) -> Result<Vec<u8>, ReadError> {
        (**self).read(range)
    }
}
