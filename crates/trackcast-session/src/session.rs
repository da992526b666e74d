//! Per-connection session state machine
//!
//! `Connecting → AwaitingSubscription → Subscribed → Closed`. The machine
//! is sans-io: the transport driver feeds it raw client bytes and timer
//! events, and it returns the actions to perform. One message is processed
//! fully before the next, so a renderer never observes a partial apply.

use crate::subscription::{Click, Subscription};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use trackcast_wire::{CellRender, ClientMessage, DecodeError, ServerMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    AwaitingSubscription,
    Subscribed,
    Closed,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often the server probes the client with a Ping.
    pub ping_interval: Duration,
    /// How long after a Ping the client has to answer with a Pong.
    pub pong_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_window: Duration::from_secs(60),
        }
    }
}

/// Errors that terminate a session. Every one of these transitions the
/// machine to `Closed`; none are recoverable.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to decode client message: {0}")]
    Decode(#[from] DecodeError),

    #[error("expected a subscribe message first")]
    SubscribeExpected,

    #[error("session is already subscribed")]
    AlreadySubscribed,

    #[error("pong without an outstanding ping")]
    UnexpectedPong,

    #[error("no pong within the keepalive window")]
    KeepaliveTimeout,

    #[error("session is closed")]
    Closed,
}

/// Actions the transport driver performs on the machine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Join the distribution group this subscription names, then hand the
    /// initial cell array back via [`Session::init_cells`].
    Subscribe(Subscription),
    /// Route a click into its target group.
    Click(Click),
}

pub struct Session {
    phase: SessionPhase,
    subscription: Option<Subscription>,
    cells: Vec<CellRender>,
    init_sent: bool,
    awaiting_pong: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Connecting,
            subscription: None,
            cells: Vec::new(),
            init_sent: false,
            awaiting_pong: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Whether a Ping is outstanding.
    pub fn awaiting_pong(&self) -> bool {
        self.awaiting_pong
    }

    /// Transport opened; no message has been exchanged yet.
    pub fn on_open(&mut self) {
        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::AwaitingSubscription;
        }
    }

    /// Transport closed, or the driver decided to close.
    pub fn on_close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Processes one client message. Any error closes the session; the
    /// driver should emit `ServerMessage::from_error` first if the
    /// transport is still writable.
    pub fn on_client_bytes(&mut self, bytes: &[u8]) -> Result<Vec<Output>, SessionError> {
        match self.phase {
            SessionPhase::Connecting | SessionPhase::Closed => return Err(self.fail(SessionError::Closed)),
            SessionPhase::AwaitingSubscription | SessionPhase::Subscribed => {}
        }
        let msg = match ClientMessage::decode(bytes) {
            Ok(msg) => msg,
            Err(e) => return Err(self.fail(e.into())),
        };
        match self.phase {
            SessionPhase::AwaitingSubscription => match Subscription::from_message(&msg) {
                Some(subscription) => {
                    debug!(?subscription, "session subscribed");
                    self.subscription = Some(subscription.clone());
                    self.phase = SessionPhase::Subscribed;
                    Ok(vec![Output::Subscribe(subscription)])
                }
                None => Err(self.fail(SessionError::SubscribeExpected)),
            },
            SessionPhase::Subscribed => {
                if msg.is_subscribe() {
                    return Err(self.fail(SessionError::AlreadySubscribed));
                }
                if let Some(click) = Click::from_message(&msg) {
                    return Ok(vec![Output::Click(click)]);
                }
                match msg {
                    ClientMessage::Pong => {
                        if self.awaiting_pong {
                            self.awaiting_pong = false;
                            Ok(Vec::new())
                        } else {
                            Err(self.fail(SessionError::UnexpectedPong))
                        }
                    }
                    _ => unreachable!("message is neither subscribe, click, nor pong"),
                }
            }
            SessionPhase::Connecting | SessionPhase::Closed => unreachable!(),
        }
    }

    /// Records the initial cell array after the driver joined the group,
    /// and produces the one and only Init message of this session.
    pub fn init_cells(&mut self, cells: Vec<CellRender>) -> ServerMessage {
        debug_assert!(self.phase == SessionPhase::Subscribed && !self.init_sent);
        self.init_sent = true;
        self.cells = cells.clone();
        ServerMessage::Init(cells)
    }

    /// Compares freshly rendered cells against the last ones sent and
    /// emits an Update for each slot that changed, in slot order.
    pub fn on_cells(&mut self, new_cells: Vec<CellRender>) -> Vec<ServerMessage> {
        if self.phase != SessionPhase::Subscribed || !self.init_sent {
            return Vec::new();
        }
        let updates = self
            .cells
            .iter()
            .zip(new_cells.iter())
            .enumerate()
            .filter(|(_, (old, new))| old != new)
            .map(|(cell_id, (_, new_cell))| ServerMessage::Update {
                cell_id: cell_id as u8,
                new_cell: new_cell.clone(),
            })
            .collect();
        self.cells = new_cells;
        updates
    }

    /// The keepalive interval fired. An unanswered previous Ping is a
    /// timeout; otherwise a new Ping goes out.
    pub fn start_ping(&mut self) -> Result<ServerMessage, SessionError> {
        if self.phase != SessionPhase::Subscribed {
            return Err(self.fail(SessionError::Closed));
        }
        if self.awaiting_pong {
            return Err(self.fail(SessionError::KeepaliveTimeout));
        }
        self.awaiting_pong = true;
        Ok(ServerMessage::Ping)
    }

    /// The pong window after a Ping elapsed.
    pub fn pong_deadline(&mut self) -> Result<(), SessionError> {
        if self.awaiting_pong {
            Err(self.fail(SessionError::KeepaliveTimeout))
        } else {
            Ok(())
        }
    }

    fn fail(&mut self, e: SessionError) -> SessionError {
        self.phase = SessionPhase::Closed;
        e
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
