//! Notifications emitted while ticking.
//!
//! Outputs carry the events raised during one tick, in raise order. Events
//! raised by playback calls between ticks are delivered with the next tick.

use serde::{Deserialize, Serialize};

use crate::ids::StateId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimatorEvent {
    /// A state became current through a transition, cross-fade or hard cut.
    StateStarted { layer: usize, state: StateId },
    /// A `Once` state hit its bound, a `Loop` state wrapped, or a `PingPong`
    /// state returned to its start.
    StateCompleted { layer: usize, state: StateId },
}

impl AnimatorEvent {
    #[inline]
    pub fn layer(&self) -> usize {
        match self {
            AnimatorEvent::StateStarted { layer, .. }
            | AnimatorEvent::StateCompleted { layer, .. } => *layer,
        }
    }

    #[inline]
    pub fn state(&self) -> StateId {
        match self {
            AnimatorEvent::StateStarted { state, .. }
            | AnimatorEvent::StateCompleted { state, .. } => *state,
        }
    }
}

/// Outputs returned by `Animator::tick()`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub events: Vec<AnimatorEvent>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[inline]
    pub fn push_event(&mut self, event: AnimatorEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn started(&self) -> impl Iterator<Item = &AnimatorEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, AnimatorEvent::StateStarted { .. }))
    }

    pub fn completed(&self) -> impl Iterator<Item = &AnimatorEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, AnimatorEvent::StateCompleted { .. }))
    }
}
