//! Consumer-side cell model
//!
//! Mirrors the server's view of the cell array on the renderer side. Init
//! replaces the whole array atomically, Update replaces exactly one slot,
//! and clicks translate back into client messages using the subscription
//! the connection was opened with.

use crate::subscription::Subscription;
use thiserror::Error;
use trackcast_wire::{CellRender, ClientMessage, ServerMessage};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("update for cell {0} arrived before init")]
    UpdateBeforeInit(u8),

    #[error("cell index {index} is outside the {count}-cell array")]
    CellIndex { index: u8, count: usize },
}

/// What handling one server message asks the driver to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Send this message back before anything else goes out.
    Reply(ClientMessage),
    /// The cell array changed; repaint.
    Repaint,
    /// Server reported a fatal error; show `display` and close.
    Fatal { debug: String, display: String },
}

pub struct CellModel {
    subscription: Subscription,
    cells: Option<Vec<CellRender>>,
}

impl CellModel {
    /// `subscription` is reconstructed from the connection's own addressing
    /// context (the page URL), not transmitted by the server.
    pub fn new(subscription: Subscription) -> Self {
        Self { subscription, cells: None }
    }

    pub fn cells(&self) -> Option<&[CellRender]> {
        self.cells.as_deref()
    }

    /// Applies one server message. The apply is atomic per message: either
    /// the whole effect lands or, on error, none of it does.
    pub fn handle(&mut self, msg: ServerMessage) -> Result<Reaction, RenderError> {
        match msg {
            ServerMessage::Ping => Ok(Reaction::Reply(ClientMessage::Pong)),
            ServerMessage::Error { debug, display } => Ok(Reaction::Fatal { debug, display }),
            ServerMessage::Init(cells) => {
                self.cells = Some(cells);
                Ok(Reaction::Repaint)
            }
            ServerMessage::Update { cell_id, new_cell } => {
                let cells = self
                    .cells
                    .as_mut()
                    .ok_or(RenderError::UpdateBeforeInit(cell_id))?;
                let slot = cells.len();
                let cell = cells
                    .get_mut(cell_id as usize)
                    .ok_or(RenderError::CellIndex { index: cell_id, count: slot })?;
                *cell = new_cell;
                Ok(Reaction::Repaint)
            }
        }
    }

    /// Builds the click message for a cell, addressed by this connection's
    /// subscription. Double-restream views are read-only, so clicks there
    /// produce nothing.
    pub fn translate_click(&self, cell_id: u8, right: bool) -> Option<ClientMessage> {
        Some(match &self.subscription {
            Subscription::Room { room, layout } => ClientMessage::ClickRoom {
                room: room.clone(),
                layout: *layout,
                cell_id,
                right,
            },
            Subscription::Restream { restream, runner, layout } => ClientMessage::ClickRestream {
                restream: restream.clone(),
                runner: runner.clone(),
                layout: *layout,
                cell_id,
                right,
            },
            Subscription::Multiworld { room, world, layout } => ClientMessage::ClickMw {
                room: room.clone(),
                world: *world,
                layout: *layout,
                cell_id,
                right,
            },
            Subscription::DoubleRestream { .. } => return None,
        })
    }
}
