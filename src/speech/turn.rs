use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;

/// Who owns the voice channel right now
///
/// Speaking, listening and sending are mutually exclusive so the recognizer
/// never captures the synthesizer's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    Speaking,
    Listening,
    Sending,
}

#[derive(Debug)]
struct GateInner {
    state: TurnState,
    /// Set once the session ends; no turn may begin afterwards
    closed: bool,
    /// Bumped on every transition so a stale owner can be told apart
    epoch: u64,
}

/// Single lock around the turn state; every change is a checked compare-and-set
#[derive(Debug)]
pub struct TurnGate {
    inner: Mutex<GateInner>,
    watch_tx: watch::Sender<TurnState>,
}

impl TurnGate {
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(TurnState::Idle);
        Self {
            inner: Mutex::new(GateInner {
                state: TurnState::Idle,
                closed: false,
                epoch: 0,
            }),
            watch_tx,
        }
    }

    pub fn state(&self) -> TurnState {
        self.lock().state
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Observe turn changes (UI indicators)
    pub fn subscribe(&self) -> watch::Receiver<TurnState> {
        self.watch_tx.subscribe()
    }

    /// Enter `to` if the gate is open and the current state is one of `from`
    ///
    /// Returns the state that was left, or the blocking state on refusal.
    pub fn begin(&self, from: &[TurnState], to: TurnState) -> Result<TurnState, TurnState> {
        self.transition(from, to).map(|(previous, _)| previous)
    }

    /// Like [`TurnGate::begin`], but returns the epoch that identifies this turn
    pub fn enter(&self, from: &[TurnState], to: TurnState) -> Result<u64, TurnState> {
        self.transition(from, to).map(|(_, epoch)| epoch)
    }

    fn transition(&self, from: &[TurnState], to: TurnState) -> Result<(TurnState, u64), TurnState> {
        let mut inner = self.lock();
        if inner.closed || !from.contains(&inner.state) {
            debug!("Turn {:?} refused (current {:?})", to, inner.state);
            return Err(inner.state);
        }

        let previous = inner.state;
        inner.state = to;
        inner.epoch += 1;
        self.watch_tx.send_replace(to);
        Ok((previous, inner.epoch))
    }

    /// Return to idle if `state` still owns the turn
    pub fn release(&self, state: TurnState) -> bool {
        let mut inner = self.lock();
        if inner.state != state {
            return false;
        }

        self.reset(&mut inner);
        true
    }

    /// Whether the turn entered at `epoch` is still current and the gate open
    pub fn owns(&self, state: TurnState, epoch: u64) -> bool {
        let inner = self.lock();
        !inner.closed && inner.state == state && inner.epoch == epoch
    }

    /// Return to idle only if the turn entered at `epoch` is still current
    pub fn release_turn(&self, state: TurnState, epoch: u64) -> bool {
        let mut inner = self.lock();
        if inner.state != state || inner.epoch != epoch {
            return false;
        }

        self.reset(&mut inner);
        true
    }

    fn reset(&self, inner: &mut GateInner) {
        inner.state = TurnState::Idle;
        inner.epoch += 1;
        self.watch_tx.send_replace(TurnState::Idle);
    }

    /// Close the gate for good; returns the state that was active
    pub fn close(&self) -> TurnState {
        let mut inner = self.lock();
        let previous = inner.state;
        inner.closed = true;
        self.reset(&mut inner);
        previous
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateInner> {
        // State is a plain enum; a poisoned lock still holds a valid value
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for TurnGate {
    fn default() -> Self {
        Self::new()
    }
}
