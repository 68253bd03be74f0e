//! Capture lifecycle state machine.
//!
//! Valid transitions:
//! - Idle -> Listening (capture started)
//! - Listening -> Ended (engine finished gracefully)
//! - Listening -> Error (engine error or deadline expired)
//! - Listening -> Idle (stop requested, end callback still pending)
//! - Idle -> Ended (late end callback after an eager stop)
//! - Ended -> Processing (final transcript handed to the responder)
//! - Ended -> Idle (nothing was recognised)
//! - Idle -> Processing (typed text bypassing capture)
//! - Processing -> Idle (reply delivered)
//! - Error -> Idle (failure surfaced, ready to retry)

use ezcaters_core::error::AgentError;
use ezcaters_core::types::SessionState;

/// Returns whether a transition from `from` to `to` is valid.
pub fn can_transition(from: SessionState, to: SessionState) -> bool {
    use SessionState::*;
    matches!(
        (from, to),
        (Idle, Listening)
            | (Listening, Ended)
            | (Listening, Error)
            | (Listening, Idle)
            | (Idle, Ended)
            | (Ended, Processing)
            | (Ended, Idle)
            | (Idle, Processing)
            | (Processing, Idle)
            | (Error, Idle)
    )
}

/// Single-owner state machine for one session's lifecycle.
///
/// Callbacks and timers can race, so besides the strict `transition` there is
/// `advance`, which treats an invalid request as a no-op instead of an error.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: SessionState,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn current(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Attempt to transition to the target state.
    ///
    /// Returns `AgentError::InvalidTransition` if the transition is not allowed
    /// from the current state; the state is left untouched.
    pub fn transition(&mut self, target: SessionState) -> Result<(), AgentError> {
        if can_transition(self.state, target) {
            tracing::debug!("Session state: {} -> {}", self.state, target);
            self.state = target;
            Ok(())
        } else {
            Err(AgentError::InvalidTransition {
                from: self.state,
                to: target,
            })
        }
    }

    /// Transition if allowed, otherwise do nothing. Returns whether it applied.
    pub fn advance(&mut self, target: SessionState) -> bool {
        match self.transition(target) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring out-of-order transition");
                false
            }
        }
    }

    /// Force the state machine back to Idle.
    pub fn reset(&mut self) {
        if self.state != SessionState::Idle {
            tracing::debug!("Session state reset to Idle from {}", self.state);
        }
        self.state = SessionState::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================
