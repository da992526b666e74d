//! Send decisions
//!
//! Sits between the change detector and the distribution side: given the
//! latest snapshot bytes, decides whether the network sees a full state, a
//! diff, or nothing. Byte churn that parses to an equal state (timer words
//! in otherwise-unrelated memory) produces no traffic at all.

use crate::engine::StateEngine;
use std::sync::Arc;
use tracing::debug;

/// What a poll turned into.
pub enum Action<E: StateEngine> {
    SendFull(E::State),
    SendDiff(E::Diff),
    NoOp,
}

pub struct StateCodec<E: StateEngine> {
    engine: Arc<E>,
    current: Option<E::State>,
}

impl<E: StateEngine> StateCodec<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine, current: None }
    }

    /// Decides what to send for the latest snapshot bytes.
    ///
    /// The first successful parse always yields a full state. After that,
    /// a candidate equal to the current state is a no-op; otherwise the
    /// diff is emitted and the candidate becomes current *immediately* —
    /// a failed transmission downstream is resolved by reconnect and full
    /// resend, not by replaying old diffs. A parse failure leaves the
    /// current state untouched so a torn read is never mistaken for a
    /// legitimate new state.
    pub fn decide(&mut self, bytes: &[u8]) -> Result<Action<E>, E::ParseError> {
        let candidate = self.engine.parse(bytes)?;
        Ok(match self.current.take() {
            None => {
                self.current = Some(candidate.clone());
                debug!("first snapshot, sending full state");
                Action::SendFull(candidate)
            }
            Some(current) if candidate == current => {
                self.current = Some(current);
                Action::NoOp
            }
            Some(current) => {
                let diff = self.engine.diff(&current, &candidate);
                self.current = Some(candidate);
                Action::SendDiff(diff)
            }
        })
    }

    pub fn current(&self) -> Option<&E::State> {
        self.current.as_ref()
    }
}
