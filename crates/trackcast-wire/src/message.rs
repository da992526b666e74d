//! Client and server message catalogs
//!
//! Both catalogs are closed: an unrecognized discriminant byte is a fatal
//! [`DecodeError`], never a silent no-op, so a protocol-revision mismatch
//! fails fast instead of desynchronizing the renderer. Discriminants 6–11
//! of the client catalog belonged to retired protocol revisions and are
//! rejected like any other unknown byte.

use crate::{
    cell::CellRender,
    layout::{DoubleTrackerLayout, TrackerLayout},
    primitive::{finish, read_bool, read_string, read_u64, read_u8, write_bool, write_string},
    DecodeError,
};

/// Messages a renderer client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Pong,
    SubscribeRestream {
        restream: String,
        runner: String,
        layout: TrackerLayout,
    },
    SubscribeDoubleRestream {
        restream: String,
        runner1: String,
        runner2: String,
        layout: DoubleTrackerLayout,
    },
    ClickRestream {
        restream: String,
        runner: String,
        layout: TrackerLayout,
        cell_id: u8,
        right: bool,
    },
    SubscribeRoom {
        room: String,
        layout: TrackerLayout,
    },
    ClickRoom {
        room: String,
        layout: TrackerLayout,
        cell_id: u8,
        right: bool,
    },
    ClickMw {
        room: String,
        world: u8,
        layout: TrackerLayout,
        cell_id: u8,
        right: bool,
    },
    SubscribeMw {
        room: String,
        world: u8,
        layout: TrackerLayout,
    },
}

impl ClientMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            ClientMessage::Pong => buf.push(0),
            ClientMessage::SubscribeRestream { restream, runner, layout } => {
                buf.push(1);
                write_string(&mut buf, restream);
                write_string(&mut buf, runner);
                layout.write_to(&mut buf);
            }
            ClientMessage::SubscribeDoubleRestream { restream, runner1, runner2, layout } => {
                buf.push(2);
                write_string(&mut buf, restream);
                write_string(&mut buf, runner1);
                write_string(&mut buf, runner2);
                buf.push(layout.discriminant());
            }
            ClientMessage::ClickRestream { restream, runner, layout, cell_id, right } => {
                buf.push(3);
                write_string(&mut buf, restream);
                write_string(&mut buf, runner);
                layout.write_to(&mut buf);
                buf.push(*cell_id);
                write_bool(&mut buf, *right);
            }
            ClientMessage::SubscribeRoom { room, layout } => {
                buf.push(4);
                write_string(&mut buf, room);
                layout.write_to(&mut buf);
            }
            ClientMessage::ClickRoom { room, layout, cell_id, right } => {
                buf.push(5);
                write_string(&mut buf, room);
                layout.write_to(&mut buf);
                buf.push(*cell_id);
                write_bool(&mut buf, *right);
            }
            ClientMessage::ClickMw { room, world, layout, cell_id, right } => {
                buf.push(12);
                write_string(&mut buf, room);
                buf.push(*world);
                layout.write_to(&mut buf);
                buf.push(*cell_id);
                write_bool(&mut buf, *right);
            }
            ClientMessage::SubscribeMw { room, world, layout } => {
                buf.push(13);
                write_string(&mut buf, room);
                buf.push(*world);
                layout.write_to(&mut buf);
            }
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = bytes;
        let msg = match read_u8(&mut buf)? {
            0 => ClientMessage::Pong,
            1 => ClientMessage::SubscribeRestream {
                restream: read_string(&mut buf)?,
                runner: read_string(&mut buf)?,
                layout: TrackerLayout::read_from(&mut buf)?,
            },
            2 => ClientMessage::SubscribeDoubleRestream {
                restream: read_string(&mut buf)?,
                runner1: read_string(&mut buf)?,
                runner2: read_string(&mut buf)?,
                layout: DoubleTrackerLayout::from_discriminant(read_u8(&mut buf)?)?,
            },
            3 => ClientMessage::ClickRestream {
                restream: read_string(&mut buf)?,
                runner: read_string(&mut buf)?,
                layout: TrackerLayout::read_from(&mut buf)?,
                cell_id: read_u8(&mut buf)?,
                right: read_bool(&mut buf)?,
            },
            4 => ClientMessage::SubscribeRoom {
                room: read_string(&mut buf)?,
                layout: TrackerLayout::read_from(&mut buf)?,
            },
            5 => ClientMessage::ClickRoom {
                room: read_string(&mut buf)?,
                layout: TrackerLayout::read_from(&mut buf)?,
                cell_id: read_u8(&mut buf)?,
                right: read_bool(&mut buf)?,
            },
            12 => ClientMessage::ClickMw {
                room: read_string(&mut buf)?,
                world: read_u8(&mut buf)?,
                layout: TrackerLayout::read_from(&mut buf)?,
                cell_id: read_u8(&mut buf)?,
                right: read_bool(&mut buf)?,
            },
            13 => ClientMessage::SubscribeMw {
                room: read_string(&mut buf)?,
                world: read_u8(&mut buf)?,
                layout: TrackerLayout::read_from(&mut buf)?,
            },
            value => return Err(DecodeError::UnknownDiscriminant { kind: "ClientMessage", value }),
        };
        finish(buf)?;
        Ok(msg)
    }

    /// Whether this message establishes a subscription.
    pub fn is_subscribe(&self) -> bool {
        matches!(
            self,
            ClientMessage::SubscribeRestream { .. }
                | ClientMessage::SubscribeDoubleRestream { .. }
                | ClientMessage::SubscribeRoom { .. }
                | ClientMessage::SubscribeMw { .. }
        )
    }
}

/// Messages the server pushes to a renderer client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Ping,
    Error {
        debug: String,
        display: String,
    },
    Init(Vec<CellRender>),
    Update {
        cell_id: u8,
        new_cell: CellRender,
    },
}

impl ServerMessage {
    pub fn from_error(e: impl std::fmt::Debug + std::fmt::Display) -> ServerMessage {
        ServerMessage::Error {
            debug: format!("{e:?}"),
            display: e.to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            ServerMessage::Ping => buf.push(0),
            ServerMessage::Error { debug, display } => {
                buf.push(1);
                write_string(&mut buf, debug);
                write_string(&mut buf, display);
            }
            ServerMessage::Init(cells) => {
                buf.push(2);
                buf.extend_from_slice(&(cells.len() as u64).to_be_bytes());
                for cell in cells {
                    cell.write_to(&mut buf);
                }
            }
            ServerMessage::Update { cell_id, new_cell } => {
                buf.push(3);
                buf.push(*cell_id);
                new_cell.write_to(&mut buf);
            }
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = bytes;
        let msg = match read_u8(&mut buf)? {
            0 => ServerMessage::Ping,
            1 => ServerMessage::Error {
                debug: read_string(&mut buf)?,
                display: read_string(&mut buf)?,
            },
            2 => {
                let count = read_u64(&mut buf)?;
                // cap the preallocation at what the buffer could possibly hold
                let mut cells = Vec::with_capacity(count.min(buf.len() as u64) as usize);
                for _ in 0..count {
                    cells.push(CellRender::read_from(&mut buf)?);
                }
                ServerMessage::Init(cells)
            }
            3 => ServerMessage::Update {
                cell_id: read_u8(&mut buf)?,
                new_cell: CellRender::read_from(&mut buf)?,
            },
            value => return Err(DecodeError::UnknownDiscriminant { kind: "ServerMessage", value }),
        };
        finish(buf)?;
        Ok(msg)
    }
}
