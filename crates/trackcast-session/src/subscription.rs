//! Subscription identity
//!
//! What a session attached to (room, restream runner, double restream, or
//! multiworld world) and how it wants that state projected onto cells.
//! Derived from the first subscribe-class client message and immutable for
//! the session's lifetime; changing it means a new connection.

use trackcast_wire::{ClientMessage, DoubleTrackerLayout, TrackerLayout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    Room {
        room: String,
        layout: TrackerLayout,
    },
    Restream {
        restream: String,
        runner: String,
        layout: TrackerLayout,
    },
    DoubleRestream {
        restream: String,
        runner1: String,
        runner2: String,
        layout: DoubleTrackerLayout,
    },
    Multiworld {
        room: String,
        world: u8,
        layout: TrackerLayout,
    },
}

impl Subscription {
    /// Builds the subscription a subscribe-class message asks for; `None`
    /// for every other message kind.
    pub fn from_message(msg: &ClientMessage) -> Option<Self> {
        Some(match msg {
            ClientMessage::SubscribeRoom { room, layout } => Subscription::Room {
                room: room.clone(),
                layout: *layout,
            },
            ClientMessage::SubscribeRestream { restream, runner, layout } => {
                Subscription::Restream {
                    restream: restream.clone(),
                    runner: runner.clone(),
                    layout: *layout,
                }
            }
            ClientMessage::SubscribeDoubleRestream { restream, runner1, runner2, layout } => {
                Subscription::DoubleRestream {
                    restream: restream.clone(),
                    runner1: runner1.clone(),
                    runner2: runner2.clone(),
                    layout: *layout,
                }
            }
            ClientMessage::SubscribeMw { room, world, layout } => Subscription::Multiworld {
                room: room.clone(),
                world: *world,
                layout: *layout,
            },
            _ => return None,
        })
    }
}

/// Where a click lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Room {
        room: String,
        layout: TrackerLayout,
    },
    Restream {
        restream: String,
        runner: String,
        layout: TrackerLayout,
    },
    Multiworld {
        room: String,
        world: u8,
        layout: TrackerLayout,
    },
}

/// A routed cell click. Clicks carry their own addressing, taken from the
/// message rather than the session's subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Click {
    pub target: ClickTarget,
    pub cell_id: u8,
    pub right: bool,
}

impl Click {
    /// Extracts the click a click-class message describes; `None` for every
    /// other message kind.
    pub fn from_message(msg: &ClientMessage) -> Option<Self> {
        Some(match msg {
            ClientMessage::ClickRoom { room, layout, cell_id, right } => Click {
                target: ClickTarget::Room {
                    room: room.clone(),
                    layout: *layout,
                },
                cell_id: *cell_id,
                right: *right,
            },
            ClientMessage::ClickRestream { restream, runner, layout, cell_id, right } => Click {
                target: ClickTarget::Restream {
                    restream: restream.clone(),
                    runner: runner.clone(),
                    layout: *layout,
                },
                cell_id: *cell_id,
                right: *right,
            },
            ClientMessage::ClickMw { room, world, layout, cell_id, right } => Click {
                target: ClickTarget::Multiworld {
                    room: room.clone(),
                    world: *world,
                    layout: *layout,
                },
                cell_id: *cell_id,
                right: *right,
            },
            _ => return None,
        })
    }
}
