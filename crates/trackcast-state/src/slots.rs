//! A minimal item-slot engine
//!
//! Tracks 52 item slots, one byte of progression level each, parsed
//! straight out of the concatenated range snapshot. The binaries and the
//! integration tests run against this engine; a real game engine plugs in
//! through [`StateEngine`](crate::engine::StateEngine) the same way.

use crate::engine::StateEngine;
use crate::range::MemoryRange;
use thiserror::Error;
use trackcast_wire::{CellOverlay, CellRender, CellStyle, DoubleTrackerLayout, ImageDir, TrackerLayout};

pub const SLOT_COUNT: usize = 52;

/// The memory windows whose concatenation this engine decodes: two
/// 26-slot inventory banks.
pub const RANGES: &[MemoryRange] = &[
    MemoryRange { offset: 0x20, len: 26 },
    MemoryRange { offset: 0x40, len: 26 },
];

/// Highest progression level a slot can hold.
pub const MAX_LEVEL: u8 = 9;

const DOUBLE_CELL_COUNT: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotState {
    pub slots: [u8; SLOT_COUNT],
}

impl Default for SlotState {
    fn default() -> Self {
        Self { slots: [0; SLOT_COUNT] }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDiff {
    /// (slot index, new level) pairs, in slot order.
    pub changes: Vec<(u8, u8)>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotParseError {
    #[error("snapshot is {got} bytes, expected {expected}")]
    Length { expected: usize, got: usize },

    #[error("slot {index} holds {value}, beyond the maximum level")]
    Level { index: usize, value: u8 },
}

pub struct SlotEngine {
    _private: (),
}

impl SlotEngine {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for SlotEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateEngine for SlotEngine {
    type State = SlotState;
    type Diff = SlotDiff;
    type ParseError = SlotParseError;

    fn parse(&self, bytes: &[u8]) -> Result<SlotState, SlotParseError> {
        if bytes.len() != SLOT_COUNT {
            return Err(SlotParseError::Length { expected: SLOT_COUNT, got: bytes.len() });
        }
        let mut slots = [0; SLOT_COUNT];
        for (index, (&value, slot)) in bytes.iter().zip(slots.iter_mut()).enumerate() {
            if value > MAX_LEVEL {
                return Err(SlotParseError::Level { index, value });
            }
            *slot = value;
        }
        Ok(SlotState { slots })
    }

    fn diff(&self, old: &SlotState, new: &SlotState) -> SlotDiff {
        SlotDiff {
            changes: old
                .slots
                .iter()
                .zip(new.slots.iter())
                .enumerate()
                .filter(|(_, (old, new))| old != new)
                .map(|(index, (_, &new))| (index as u8, new))
                .collect(),
        }
    }

    fn apply_diff(&self, state: &SlotState, diff: &SlotDiff) -> SlotState {
        let mut next = *state;
        for &(index, value) in &diff.changes {
            next.slots[index as usize] = value;
        }
        next
    }

    fn cell_count(&self, _layout: &TrackerLayout) -> u8 {
        SLOT_COUNT as u8
    }

    fn render_cell(&self, state: &SlotState, _layout: &TrackerLayout, cell_id: u8) -> CellRender {
        let level = state.slots[cell_id as usize];
        CellRender {
            dir: ImageDir::Xopar,
            img: format!("item{cell_id}"),
            style: if level == 0 { CellStyle::Dimmed } else { CellStyle::Normal },
            overlay: if level > 1 {
                CellOverlay::Count {
                    count: level,
                    dir: ImageDir::Extra,
                    img: format!("count{level}"),
                }
            } else {
                CellOverlay::None
            },
        }
    }

    fn double_cell_count(&self, _layout: &DoubleTrackerLayout) -> u8 {
        DOUBLE_CELL_COUNT
    }

    fn render_double_cell(
        &self,
        left: &SlotState,
        right: &SlotState,
        _layout: &DoubleTrackerLayout,
        cell_id: u8,
    ) -> CellRender {
        let (l, r) = (left.slots[cell_id as usize], right.slots[cell_id as usize]);
        CellRender {
            dir: ImageDir::Xopar,
            img: format!("item{cell_id}"),
            style: match (l > 0, r > 0) {
                (true, true) => CellStyle::Normal,
                (true, false) => CellStyle::RightDimmed,
                (false, true) => CellStyle::LeftDimmed,
                (false, false) => CellStyle::Dimmed,
            },
            overlay: CellOverlay::None,
        }
    }

    fn click(&self, state: &mut SlotState, _layout: &TrackerLayout, cell_id: u8, right: bool) {
        let slot = &mut state.slots[cell_id as usize];
        *slot = if right {
            slot.checked_sub(1).unwrap_or(MAX_LEVEL)
        } else if *slot == MAX_LEVEL {
            0
        } else {
            *slot + 1
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_validates_length_and_levels() {
        let engine = SlotEngine::new();
        assert!(engine.parse(&[0; SLOT_COUNT]).is_ok());
        assert_eq!(
            engine.parse(&[0; 3]),
            Err(SlotParseError::Length { expected: SLOT_COUNT, got: 3 })
        );
        let mut bytes = [0; SLOT_COUNT];
        bytes[5] = MAX_LEVEL + 1;
        assert_eq!(
            engine.parse(&bytes),
            Err(SlotParseError::Level { index: 5, value: MAX_LEVEL + 1 })
        );
    }

    #[test]
    fn diff_then_apply_reconstructs_state() {
        let engine = SlotEngine::new();
        let old = engine.parse(&[0; SLOT_COUNT]).unwrap();
        let mut bytes = [0; SLOT_COUNT];
        bytes[3] = 2;
        bytes[51] = 1;
        let new = engine.parse(&bytes).unwrap();
        let diff = engine.diff(&old, &new);
        assert_eq!(diff.changes, vec![(3, 2), (51, 1)]);
        assert_eq!(engine.apply_diff(&old, &diff), new);
    }

    #[test]
    fn clicks_cycle_through_levels() {
        let engine = SlotEngine::new();
        let layout = TrackerLayout::default();
        let mut state = engine.parse(&[0; SLOT_COUNT]).unwrap();
        engine.click(&mut state, &layout, 7, false);
        assert_eq!(state.slots[7], 1);
        engine.click(&mut state, &layout, 7, true);
        engine.click(&mut state, &layout, 7, true);
        assert_eq!(state.slots[7], MAX_LEVEL);
    }

    #[test]
    fn render_reflects_level() {
        let engine = SlotEngine::new();
        let layout = TrackerLayout::default();
        let mut bytes = [0; SLOT_COUNT];
        bytes[2] = 4;
        let state = engine.parse(&bytes).unwrap();
        let empty = engine.render_cell(&state, &layout, 0);
        assert_eq!(empty.style, CellStyle::Dimmed);
        assert_eq!(empty.overlay, CellOverlay::None);
        let stacked = engine.render_cell(&state, &layout, 2);
        assert_eq!(stacked.style, CellStyle::Normal);
        assert!(matches!(stacked.overlay, CellOverlay::Count { count: 4, .. }));
    }
}
