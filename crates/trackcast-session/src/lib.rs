//! Sessions, subscriptions, and fan-out for trackcast
//!
//! One [`Session`] per renderer connection: a sequential state machine that
//! turns decoded client messages into actions and per-cell updates. The
//! [`Hub`] groups sessions by subscription context and notifies them when a
//! group's state changes. [`CellModel`] is the consumer-side mirror of the
//! cell array.

pub mod hub;
pub mod renderer;
pub mod session;
pub mod subscription;

pub use hub::{Hub, HubError};
pub use renderer::{CellModel, Reaction, RenderError};
pub use session::{Output, Session, SessionConfig, SessionError, SessionPhase};
pub use subscription::{Click, ClickTarget, Subscription};
