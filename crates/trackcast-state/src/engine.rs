//! The state-engine boundary
//!
//! Which memory offsets mean which items, how clicks mutate knowledge, and
//! how a layout projects state onto cells are all owned by an engine behind
//! this trait. The sync core only ever parses, compares, diffs, and renders
//! through it.

use trackcast_wire::{CellRender, DoubleTrackerLayout, TrackerLayout};

pub trait StateEngine: Send + Sync + 'static {
    /// Structured decoding of one concatenated range snapshot. Immutable
    /// once constructed; equality is semantic, not byte-level. The default
    /// value is the empty tracker a click-only room starts from.
    type State: Clone + PartialEq + Default + Send + Sync + 'static;

    /// Delta between two states, sufficient for a receiver holding the old
    /// state to reconstruct the new one.
    type Diff: Clone + Send + Sync + 'static;

    /// Raised when a snapshot does not decode into a valid state, e.g. a
    /// read torn mid-write.
    type ParseError: std::error::Error + Send + Sync + 'static;

    fn parse(&self, bytes: &[u8]) -> Result<Self::State, Self::ParseError>;

    fn diff(&self, old: &Self::State, new: &Self::State) -> Self::Diff;

    fn apply_diff(&self, state: &Self::State, diff: &Self::Diff) -> Self::State;

    /// Number of cells the layout projects onto, at most 52.
    fn cell_count(&self, layout: &TrackerLayout) -> u8;

    fn render_cell(&self, state: &Self::State, layout: &TrackerLayout, cell_id: u8) -> CellRender;

    fn double_cell_count(&self, layout: &DoubleTrackerLayout) -> u8;

    fn render_double_cell(
        &self,
        left: &Self::State,
        right: &Self::State,
        layout: &DoubleTrackerLayout,
        cell_id: u8,
    ) -> CellRender;

    /// Routes a cell click into the state.
    fn click(&self, state: &mut Self::State, layout: &TrackerLayout, cell_id: u8, right: bool);

    fn render_cells(&self, state: &Self::State, layout: &TrackerLayout) -> Vec<CellRender> {
        (0..self.cell_count(layout))
            .map(|cell_id| self.render_cell(state, layout, cell_id))
            .collect()
    }

    fn render_double_cells(
        &self,
        left: &Self::State,
        right: &Self::State,
        layout: &DoubleTrackerLayout,
    ) -> Vec<CellRender> {
        (0..self.double_cell_count(layout))
            .map(|cell_id| self.render_double_cell(left, right, layout, cell_id))
            .collect()
    }
}
