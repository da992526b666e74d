//! End-to-end scenarios across the poll → decide → fan-out → session →
//! renderer pipeline, using the slot engine and real wire encoding at the
//! session boundary.

use std::sync::Arc;
use trackcast_session::{
    CellModel, Hub, Output, Reaction, Session, SessionPhase, Subscription,
};
use trackcast_state::{
    slots::{SlotEngine, SLOT_COUNT},
    Action, StateCodec,
};
use trackcast_wire::{CellStyle, ClientMessage, ServerMessage, TrackerLayout};

const ROOM: &str = "sync-room";

fn room_subscription() -> Subscription {
    Subscription::Room {
        room: ROOM.to_owned(),
        layout: TrackerLayout::default(),
    }
}

/// Subscribes a fresh session to [`ROOM`] over real encoded bytes and
/// returns the machine, the consumer model mirroring it, and the hub-side
/// notification receiver.
async fn subscribed_pipeline(
    hub: &Hub<SlotEngine>,
) -> (Session, CellModel, tokio::sync::watch::Receiver<()>) {
    let mut session = Session::new();
    session.on_open();
    let subscribe = ClientMessage::SubscribeRoom {
        room: ROOM.to_owned(),
        layout: TrackerLayout::default(),
    };
    let outputs = session.on_client_bytes(&subscribe.encode()).unwrap();
    let subscription = match &outputs[..] {
        [Output::Subscribe(sub)] => sub.clone(),
        other => panic!("expected a subscribe output, got {other:?}"),
    };
    let (cells, rx) = hub.subscribe(&subscription).await.unwrap();
    let init = session.init_cells(cells);

    let mut model = CellModel::new(room_subscription());
    let reaction = model
        .handle(ServerMessage::decode(&init.encode()).unwrap())
        .unwrap();
    assert_eq!(reaction, Reaction::Repaint);
    (session, model, rx)
}

/// Renders the room and feeds the result through the session, returning
/// the updates it emitted, decoded on the consumer model as it goes.
async fn deliver(
    hub: &Hub<SlotEngine>,
    session: &mut Session,
    model: &mut CellModel,
) -> Vec<ServerMessage> {
    let cells = hub.render(&room_subscription()).await.unwrap();
    let updates = session.on_cells(cells);
    for update in &updates {
        model
            .handle(ServerMessage::decode(&update.encode()).unwrap())
            .unwrap();
    }
    updates
}

#[tokio::test]
async fn first_snapshot_inits_all_cells() {
    let hub = Hub::new(Arc::new(SlotEngine::new()));
    let mut codec = StateCodec::new(Arc::clone(hub.engine()));

    match codec.decide(&[0; SLOT_COUNT]).unwrap() {
        Action::SendFull(state) => hub.publish(ROOM, state).await,
        _ => panic!("first snapshot must be a full state"),
    }

    let (_session, model, _rx) = subscribed_pipeline(&hub).await;
    assert_eq!(model.cells().unwrap().len(), 52);
}

#[tokio::test]
async fn identical_snapshots_produce_no_updates() {
    let hub = Hub::new(Arc::new(SlotEngine::new()));
    let mut codec = StateCodec::new(Arc::clone(hub.engine()));

    let snapshot = [0u8; SLOT_COUNT];
    match codec.decide(&snapshot).unwrap() {
        Action::SendFull(state) => hub.publish(ROOM, state).await,
        _ => panic!("first snapshot must be a full state"),
    }
    let (mut session, mut model, _rx) = subscribed_pipeline(&hub).await;

    // the same bytes again decide to send nothing at all
    assert!(matches!(codec.decide(&snapshot).unwrap(), Action::NoOp));
    assert!(deliver(&hub, &mut session, &mut model).await.is_empty());
}

#[tokio::test]
async fn single_slot_change_updates_exactly_one_cell() {
    let hub = Hub::new(Arc::new(SlotEngine::new()));
    let mut codec = StateCodec::new(Arc::clone(hub.engine()));

    match codec.decide(&[0; SLOT_COUNT]).unwrap() {
        Action::SendFull(state) => hub.publish(ROOM, state).await,
        _ => panic!("first snapshot must be a full state"),
    }
    let (mut session, mut model, mut rx) = subscribed_pipeline(&hub).await;

    let mut snapshot = [0u8; SLOT_COUNT];
    snapshot[17] = 1;
    match codec.decide(&snapshot).unwrap() {
        Action::SendDiff(diff) => hub.apply_diff(ROOM, &diff).await.unwrap(),
        _ => panic!("a changed snapshot must be a diff"),
    }
    rx.changed().await.unwrap();

    let updates = deliver(&hub, &mut session, &mut model).await;
    assert_eq!(updates.len(), 1);
    assert!(matches!(updates[0], ServerMessage::Update { cell_id: 17, .. }));
    assert_eq!(model.cells().unwrap()[17].style, CellStyle::Normal);
}

#[tokio::test]
async fn scripted_snapshots_emit_init_then_chronological_updates() {
    let hub = Hub::new(Arc::new(SlotEngine::new()));
    let mut codec = StateCodec::new(Arc::clone(hub.engine()));

    match codec.decide(&[0; SLOT_COUNT]).unwrap() {
        Action::SendFull(state) => hub.publish(ROOM, state).await,
        _ => panic!("first snapshot must be a full state"),
    }
    let (mut session, mut model, _rx) = subscribed_pipeline(&hub).await;

    // three distinct generations touching different slots
    let mut emitted = Vec::new();
    for (slot, level) in [(4u8, 1u8), (4, 2), (30, 1)] {
        let mut snapshot = [0u8; SLOT_COUNT];
        // accumulate previous generations so only the named slot changes
        if let Some(state) = codec.current() {
            snapshot.copy_from_slice(&state.slots);
        }
        snapshot[slot as usize] = level;
        match codec.decide(&snapshot).unwrap() {
            Action::SendDiff(diff) => hub.apply_diff(ROOM, &diff).await.unwrap(),
            _ => panic!("a changed snapshot must be a diff"),
        }
        emitted.extend(deliver(&hub, &mut session, &mut model).await);
    }
    let cell_ids: Vec<u8> = emitted
        .iter()
        .map(|msg| match msg {
            ServerMessage::Update { cell_id, .. } => *cell_id,
            other => panic!("only updates may follow init, got {other:?}"),
        })
        .collect();
    assert_eq!(cell_ids, vec![4, 4, 30]);
}

#[tokio::test]
async fn click_routes_to_the_named_room() {
    let hub = Hub::new(Arc::new(SlotEngine::new()));
    // session subscribed to one room can still click another by address
    let (mut session, _model, _rx) = subscribed_pipeline(&hub).await;
    let click = ClientMessage::ClickRoom {
        room: "alpha".to_owned(),
        layout: TrackerLayout::default(),
        cell_id: 7,
        right: false,
    };
    let outputs = session.on_client_bytes(&click.encode()).unwrap();
    match &outputs[..] {
        [Output::Click(click)] => hub.click(click).await.unwrap(),
        other => panic!("expected a click output, got {other:?}"),
    }
    let cells = hub
        .render(&Subscription::Room {
            room: "alpha".to_owned(),
            layout: TrackerLayout::default(),
        })
        .await
        .unwrap();
    assert_eq!(cells[7].style, CellStyle::Normal);
}

#[tokio::test]
async fn ping_is_answered_with_a_single_pong_first() {
    let mut model = CellModel::new(room_subscription());
    let ping = ServerMessage::decode(&ServerMessage::Ping.encode()).unwrap();
    // the reply is produced before any other outgoing message exists
    assert_eq!(
        model.handle(ping).unwrap(),
        Reaction::Reply(ClientMessage::Pong)
    );
}

#[tokio::test]
async fn unknown_discriminant_closes_the_session_cleanly() {
    let hub = Hub::new(Arc::new(SlotEngine::new()));
    let (mut session, _model, _rx) = subscribed_pipeline(&hub).await;
    assert!(session.on_client_bytes(&[255]).is_err());
    assert_eq!(session.phase(), SessionPhase::Closed);
    // no further messages are processed
    assert!(session.on_client_bytes(&ClientMessage::Pong.encode()).is_err());
}
