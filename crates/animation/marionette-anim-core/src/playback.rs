//! Per-state time cursor math for the three loop policies.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopMode {
    #[default]
    Loop,
    PingPong,
    Once,
}

/// Playback position of one state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Cursor {
    /// Seconds in [0, duration].
    pub time: f32,
    /// +1 forward, -1 backward (ping-pong).
    pub direction: f32,
    /// Sticky completion flag (edge-latched for `Once`).
    pub completed: bool,
}

impl Cursor {
    pub fn at(time: f32) -> Self {
        Self {
            time,
            direction: 1.0,
            completed: false,
        }
    }
}

/// Result of advancing a cursor: the new position and whether a completion
/// boundary was crossed during this step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Step {
    pub cursor: Cursor,
    pub completed_now: bool,
    /// The cursor wrapped (`Loop`) or reflected off either bound (`PingPong`).
    pub wrapped: bool,
}

/// Euclidean-style remainder that is always in `[0, b)` for `b > 0`.
fn fmod(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        return 0.0;
    }
    let m = a % b;
    if (m < 0.0 && b > 0.0) || (m > 0.0 && b < 0.0) {
        m + b
    } else {
        m
    }
}

/// Advance `cursor` by `delta` seconds (already scaled by speed and direction)
/// inside a clip of `duration` seconds. `duration <= 0` leaves the cursor alone.
pub fn advance(cursor: Cursor, delta: f32, duration: f32, mode: LoopMode) -> Step {
    if duration <= 0.0 || !delta.is_finite() {
        return Step {
            cursor,
            completed_now: false,
            wrapped: false,
        };
    }
    let mut next = cursor;
    let mut completed_now = false;
    let mut wrapped = false;
    let mut t = cursor.time + delta;
    match mode {
        LoopMode::Loop => {
            if t >= duration {
                t = fmod(t, duration);
                completed_now = true;
            } else if t < 0.0 {
                let m = fmod(-t, duration);
                t = if m == 0.0 { 0.0 } else { duration - m };
                completed_now = true;
            }
            // duration - tiny remainder can round up to duration
            if t >= duration {
                t = 0.0;
            }
            if completed_now {
                next.completed = true;
                wrapped = true;
            }
        }
        LoopMode::PingPong => {
            // Each reflection consumes at least one full span, so a large step
            // is folded in a bounded number of passes.
            let mut passes = 0;
            while (t > duration || t < 0.0) && passes < 64 {
                if t > duration {
                    t = duration - (t - duration);
                } else {
                    t = -t;
                    completed_now = true;
                }
                next.direction = -next.direction;
                passes += 1;
            }
            wrapped = passes > 0;
            t = t.clamp(0.0, duration);
            if completed_now {
                next.completed = true;
            }
        }
        LoopMode::Once => {
            let at_bound = if t >= duration {
                t = duration;
                true
            } else if t <= 0.0 {
                t = 0.0;
                delta < 0.0
            } else {
                false
            };
            if at_bound {
                if !next.completed {
                    next.completed = true;
                    completed_now = true;
                }
            } else {
                next.completed = false;
            }
        }
    }
    next.time = t;
    Step {
        cursor: next,
        completed_now,
        wrapped,
    }
}
