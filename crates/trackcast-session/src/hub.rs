//! Distribution hub
//!
//! Groups sessions by subscription context and fans state changes out to
//! them. Each group holds the authoritative model for its context plus a
//! watch channel; publishing replaces the model and notifies every
//! subscribed session, which re-renders its own cells and emits per-cell
//! updates. Watch semantics guarantee a subscriber never observes an
//! older state after a newer one.

use crate::subscription::{Click, ClickTarget, Subscription};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::debug;
use trackcast_state::StateEngine;
use trackcast_wire::CellRender;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("no such restream")]
    NoSuchRestream(String),

    #[error("no such runner")]
    NoSuchRunner(String),

    #[error("no such world")]
    NoSuchWorld(u8),

    #[error("no such cell")]
    NoSuchCell(u8),

    #[error("no such room")]
    NoSuchRoom(String),
}

struct Group<S> {
    model: S,
    tx: watch::Sender<()>,
    rx: watch::Receiver<()>,
}

impl<S: Default> Default for Group<S> {
    fn default() -> Self {
        let (tx, rx) = watch::channel(());
        Self { model: S::default(), tx, rx }
    }
}

impl<S> Group<S> {
    fn notify(&self) {
        let _ = self.tx.send(());
    }
}

struct RestreamGroup<S> {
    runners: HashMap<String, S>,
    tx: watch::Sender<()>,
    rx: watch::Receiver<()>,
}

struct MwRoom<S> {
    worlds: Vec<S>,
    tx: watch::Sender<()>,
    rx: watch::Receiver<()>,
}

impl<S> MwRoom<S> {
    fn new() -> Self {
        let (tx, rx) = watch::channel(());
        Self { worlds: Vec::new(), tx, rx }
    }
}

/// Fan-out point between the producer side and the sessions.
pub struct Hub<E: StateEngine> {
    engine: Arc<E>,
    rooms: Mutex<HashMap<String, Group<E::State>>>,
    restreams: RwLock<HashMap<String, RestreamGroup<E::State>>>,
    multiworlds: Mutex<HashMap<String, MwRoom<E::State>>>,
}

impl<E: StateEngine> Hub<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            rooms: Mutex::new(HashMap::new()),
            restreams: RwLock::new(HashMap::new()),
            multiworlds: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Registers a restream and its runners. Unlike rooms, restreams do
    /// not auto-create: subscribing to an unknown one is an error.
    pub async fn create_restream(&self, restream: &str, runners: impl IntoIterator<Item = String>) {
        let (tx, rx) = watch::channel(());
        let group = RestreamGroup {
            runners: runners
                .into_iter()
                .map(|runner| (runner, E::State::default()))
                .collect(),
            tx,
            rx,
        };
        self.restreams.write().await.insert(restream.to_owned(), group);
    }

    /// Joins the group a subscription names. Returns the initial cell
    /// array and the change-notification receiver, atomically with respect
    /// to concurrent publishes.
    pub async fn subscribe(
        &self,
        sub: &Subscription,
    ) -> Result<(Vec<CellRender>, watch::Receiver<()>), HubError> {
        match sub {
            Subscription::Room { room, .. } => {
                let mut rooms = self.rooms.lock().await;
                let group = rooms.entry(room.clone()).or_default();
                Ok((self.render_room_cells(group, sub), group.rx.clone()))
            }
            Subscription::Restream { .. } | Subscription::DoubleRestream { .. } => {
                let restreams = self.restreams.read().await;
                self.render_restream(&restreams, sub)
            }
            Subscription::Multiworld { room, world, layout } => {
                let mut multiworlds = self.multiworlds.lock().await;
                let mw = multiworlds
                    .entry(room.clone())
                    .or_insert_with(MwRoom::new);
                let state = Self::mw_world(&mut mw.worlds, *world)?;
                let cells = self.engine.render_cells(state, layout);
                Ok((cells, mw.rx.clone()))
            }
        }
    }

    /// Renders the current cells for a subscription, for re-sending after
    /// a change notification.
    pub async fn render(&self, sub: &Subscription) -> Result<Vec<CellRender>, HubError> {
        match sub {
            Subscription::Room { room, .. } => {
                let mut rooms = self.rooms.lock().await;
                let group = rooms.entry(room.clone()).or_default();
                Ok(self.render_room_cells(group, sub))
            }
            Subscription::Restream { .. } | Subscription::DoubleRestream { .. } => {
                let restreams = self.restreams.read().await;
                self.render_restream(&restreams, sub).map(|(cells, _)| cells)
            }
            Subscription::Multiworld { room, world, layout } => {
                let mut multiworlds = self.multiworlds.lock().await;
                let mw = multiworlds
                    .entry(room.clone())
                    .or_insert_with(MwRoom::new);
                let state = Self::mw_world(&mut mw.worlds, *world)?;
                Ok(self.engine.render_cells(state, layout))
            }
        }
    }

    /// Routes a click into its target group's model and notifies the
    /// group. Clicks address their target themselves; the session's own
    /// subscription is not consulted.
    pub async fn click(&self, click: &Click) -> Result<(), HubError> {
        match &click.target {
            ClickTarget::Room { room, layout } => {
                self.check_cell(click.cell_id, self.engine.cell_count(layout))?;
                let mut rooms = self.rooms.lock().await;
                let group = rooms.entry(room.clone()).or_default();
                self.engine
                    .click(&mut group.model, layout, click.cell_id, click.right);
                group.notify();
            }
            ClickTarget::Restream { restream, runner, layout } => {
                self.check_cell(click.cell_id, self.engine.cell_count(layout))?;
                let mut restreams = self.restreams.write().await;
                let group = restreams
                    .get_mut(restream)
                    .ok_or_else(|| HubError::NoSuchRestream(restream.clone()))?;
                let state = group
                    .runners
                    .get_mut(runner)
                    .ok_or_else(|| HubError::NoSuchRunner(runner.clone()))?;
                self.engine.click(state, layout, click.cell_id, click.right);
                let _ = group.tx.send(());
            }
            ClickTarget::Multiworld { room, world, layout } => {
                self.check_cell(click.cell_id, self.engine.cell_count(layout))?;
                let mut multiworlds = self.multiworlds.lock().await;
                let mw = multiworlds
                    .entry(room.clone())
                    .or_insert_with(MwRoom::new);
                let state = Self::mw_world(&mut mw.worlds, *world)?;
                self.engine.click(state, layout, click.cell_id, click.right);
                let _ = mw.tx.send(());
            }
        }
        debug!(cell = click.cell_id, right = click.right, "click routed");
        Ok(())
    }

    /// Replaces a room's model with a freshly produced full state.
    pub async fn publish(&self, room: &str, state: E::State) {
        let mut rooms = self.rooms.lock().await;
        let group = rooms.entry(room.to_owned()).or_default();
        group.model = state;
        group.notify();
    }

    /// Advances a room's model by a produced diff.
    pub async fn apply_diff(&self, room: &str, diff: &E::Diff) -> Result<(), HubError> {
        let mut rooms = self.rooms.lock().await;
        let group = rooms
            .get_mut(room)
            .ok_or_else(|| HubError::NoSuchRoom(room.to_owned()))?;
        group.model = self.engine.apply_diff(&group.model, diff);
        group.notify();
        Ok(())
    }

    fn render_room_cells(&self, group: &Group<E::State>, sub: &Subscription) -> Vec<CellRender> {
        match sub {
            Subscription::Room { layout, .. } => self.engine.render_cells(&group.model, layout),
            _ => unreachable!("room group rendered for a non-room subscription"),
        }
    }

    fn render_restream(
        &self,
        restreams: &HashMap<String, RestreamGroup<E::State>>,
        sub: &Subscription,
    ) -> Result<(Vec<CellRender>, watch::Receiver<()>), HubError> {
        match sub {
            Subscription::Restream { restream, runner, layout } => {
                let group = restreams
                    .get(restream)
                    .ok_or_else(|| HubError::NoSuchRestream(restream.clone()))?;
                let state = group
                    .runners
                    .get(runner)
                    .ok_or_else(|| HubError::NoSuchRunner(runner.clone()))?;
                Ok((self.engine.render_cells(state, layout), group.rx.clone()))
            }
            Subscription::DoubleRestream { restream, runner1, runner2, layout } => {
                let group = restreams
                    .get(restream)
                    .ok_or_else(|| HubError::NoSuchRestream(restream.clone()))?;
                let left = group
                    .runners
                    .get(runner1)
                    .ok_or_else(|| HubError::NoSuchRunner(runner1.clone()))?;
                let right = group
                    .runners
                    .get(runner2)
                    .ok_or_else(|| HubError::NoSuchRunner(runner2.clone()))?;
                Ok((
                    self.engine.render_double_cells(left, right, layout),
                    group.rx.clone(),
                ))
            }
            _ => unreachable!("restream lookup for a non-restream subscription"),
        }
    }

    fn mw_world(worlds: &mut Vec<E::State>, world: u8) -> Result<&mut E::State, HubError> {
        if world == 0 {
            return Err(HubError::NoSuchWorld(world));
        }
        let index = usize::from(world - 1);
        if worlds.len() <= index {
            worlds.resize_with(index + 1, E::State::default);
        }
        Ok(&mut worlds[index])
    }

    fn check_cell(&self, cell_id: u8, count: u8) -> Result<(), HubError> {
        if cell_id < count {
            Ok(())
        } else {
            Err(HubError::NoSuchCell(cell_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackcast_state::{slots::SlotEngine, StateEngine as _};
    use trackcast_wire::{CellStyle, TrackerLayout};

    fn hub() -> Hub<SlotEngine> {
        Hub::new(Arc::new(SlotEngine::new()))
    }

    fn room_sub(room: &str) -> Subscription {
        Subscription::Room {
            room: room.to_owned(),
            layout: TrackerLayout::default(),
        }
    }

    #[tokio::test]
    async fn room_click_routes_to_the_named_room_and_cell() {
        let hub = hub();
        let (cells, mut rx) = hub.subscribe(&room_sub("alpha")).await.unwrap();
        assert_eq!(cells.len(), 52);
        hub.click(&Click {
            target: ClickTarget::Room {
                room: "alpha".to_owned(),
                layout: TrackerLayout::default(),
            },
            cell_id: 7,
            right: false,
        })
        .await
        .unwrap();
        rx.changed().await.unwrap();
        let cells = hub.render(&room_sub("alpha")).await.unwrap();
        assert_eq!(cells[7].style, CellStyle::Normal);
        // other rooms are untouched
        let other = hub.render(&room_sub("beta")).await.unwrap();
        assert_eq!(other[7].style, CellStyle::Dimmed);
    }

    #[tokio::test]
    async fn unknown_restream_and_runner_are_errors() {
        let hub = hub();
        let sub = Subscription::Restream {
            restream: "finals".to_owned(),
            runner: "alice".to_owned(),
            layout: TrackerLayout::default(),
        };
        assert_eq!(
            hub.subscribe(&sub).await.unwrap_err(),
            HubError::NoSuchRestream("finals".to_owned())
        );
        hub.create_restream("finals", vec!["bob".to_owned()]).await;
        assert_eq!(
            hub.subscribe(&sub).await.unwrap_err(),
            HubError::NoSuchRunner("alice".to_owned())
        );
    }

    #[tokio::test]
    async fn double_restream_renders_both_runners() {
        let hub = hub();
        hub.create_restream("finals", vec!["alice".to_owned(), "bob".to_owned()])
            .await;
        hub.click(&Click {
            target: ClickTarget::Restream {
                restream: "finals".to_owned(),
                runner: "alice".to_owned(),
                layout: TrackerLayout::default(),
            },
            cell_id: 0,
            right: false,
        })
        .await
        .unwrap();
        let sub = Subscription::DoubleRestream {
            restream: "finals".to_owned(),
            runner1: "alice".to_owned(),
            runner2: "bob".to_owned(),
            layout: trackcast_wire::DoubleTrackerLayout::DungeonRewards,
        };
        let (cells, _rx) = hub.subscribe(&sub).await.unwrap();
        assert_eq!(cells.len(), 9);
        // alice has the item, bob does not
        assert_eq!(cells[0].style, CellStyle::RightDimmed);
    }

    #[tokio::test]
    async fn multiworld_worlds_are_one_based() {
        let hub = hub();
        let bad = Subscription::Multiworld {
            room: "weekly".to_owned(),
            world: 0,
            layout: TrackerLayout::MwExpanded,
        };
        assert_eq!(hub.subscribe(&bad).await.unwrap_err(), HubError::NoSuchWorld(0));
        let good = Subscription::Multiworld {
            room: "weekly".to_owned(),
            world: 2,
            layout: TrackerLayout::MwExpanded,
        };
        let (cells, _rx) = hub.subscribe(&good).await.unwrap();
        assert_eq!(cells.len(), 52);
    }

    #[tokio::test]
    async fn out_of_range_click_is_rejected() {
        let hub = hub();
        let err = hub
            .click(&Click {
                target: ClickTarget::Room {
                    room: "alpha".to_owned(),
                    layout: TrackerLayout::default(),
                },
                cell_id: 52,
                right: false,
            })
            .await
            .unwrap_err();
        assert_eq!(err, HubError::NoSuchCell(52));
    }

    #[tokio::test]
    async fn publish_notifies_subscribers() {
        let hub = hub();
        let (_cells, mut rx) = hub.subscribe(&room_sub("alpha")).await.unwrap();
        let engine = SlotEngine::new();
        let mut bytes = [0u8; 52];
        bytes[3] = 2;
        let state = engine.parse(&bytes).unwrap();
        hub.publish("alpha", state).await;
        rx.changed().await.unwrap();
        let cells = hub.render(&room_sub("alpha")).await.unwrap();
        assert_eq!(cells[3].style, CellStyle::Normal);
    }
}
