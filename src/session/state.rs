use serde::{Deserialize, Serialize};

/// Orchestrator lifecycle state. Exactly one session is active per
/// orchestrator at a time.
///
/// Transitions are strictly linear except `Active ↔ Paused`; everything else
/// moves one way toward `Idle` or `Error`. Recovering from `Error` requires
/// `stop_session` (reset to Idle) followed by a fresh `start_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Initializing,
    Active,
    Paused,
    Stopping,
    Error,
}

impl SessionState {
    /// Whether the edge `self → next` exists in the state machine.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Initializing)
                | (Initializing, Active)
                | (Initializing, Error)
                | (Active, Paused)
                | (Paused, Active)
                | (Active, Stopping)
                | (Paused, Stopping)
                | (Active, Error)
                | (Paused, Error)
                | (Stopping, Idle)
                | (Stopping, Error)
                | (Error, Idle)
        )
    }
}
