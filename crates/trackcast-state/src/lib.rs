//! State observation for trackcast
//!
//! Turns repeated raw reads of a foreign process's memory into a minimal
//! stream of state changes: the change detector fingerprints fixed memory
//! ranges, the state codec decides whether a poll warrants a full snapshot,
//! a diff, or nothing at all.

pub mod assemble;
pub mod codec;
pub mod detector;
pub mod engine;
pub mod range;
pub mod slots;

pub use assemble::{AssembleError, RangeAssembler};
pub use codec::{Action, StateCodec};
pub use detector::{ChangeDetector, ChangedRanges, RangeSnapshot};
pub use engine::StateEngine;
pub use range::{MemoryRange, MemoryReader, ReadError};
