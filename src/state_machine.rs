//! Synthesizer lifecycle: Uninitialized → Initialized → (Rendering ⇄ Idle) → Destroyed.
//! A destroyed synthesizer may be initialized again.

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, SynthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SynthState {
    Uninitialized,
    Initialized,
    Rendering,
    Idle,
    Destroyed,
}

impl std::fmt::Display for SynthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthState::Uninitialized => write!(f, "Uninitialized"),
            SynthState::Initialized => write!(f, "Initialized"),
            SynthState::Rendering => write!(f, "Rendering"),
            SynthState::Idle => write!(f, "Idle"),
            SynthState::Destroyed => write!(f, "Destroyed"),
        }
    }
}

impl SynthState {
    pub fn can_transition_to(self, next: SynthState) -> bool {
        matches!(
            (self, next),
            (SynthState::Uninitialized, SynthState::Initialized)
                | (SynthState::Initialized, SynthState::Initialized) // re-initialize
                | (SynthState::Idle, SynthState::Initialized)
                | (SynthState::Destroyed, SynthState::Initialized)
                | (SynthState::Initialized, SynthState::Rendering)
                | (SynthState::Idle, SynthState::Rendering)
                | (SynthState::Rendering, SynthState::Idle)
                | (SynthState::Initialized, SynthState::Destroyed)
                | (SynthState::Idle, SynthState::Destroyed)
        )
    }

    /// Whether buffers are allocated.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            SynthState::Initialized | SynthState::Rendering | SynthState::Idle
        )
    }
}

/// Thread-safe lifecycle tracker.
pub struct Lifecycle {
    state: RwLock<SynthState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SynthState::Uninitialized),
        }
    }

    pub fn current(&self) -> SynthState {
        *self.state.read()
    }

    /// Attempt a transition; on failure the state is left unchanged.
    pub fn transition(&self, next: SynthState) -> Result<SynthState> {
        let mut state = self.state.write();
        let current = *state;
        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "invalid lifecycle transition");
            return Err(SynthError::InvalidTransition {
                from: current,
                to: next,
            });
        }
        *state = next;
        info!(from = %current, to = %next, "lifecycle_transition");
        Ok(next)
    }
}
