//! Clip sampling contract and a keyframed reference clip.
//!
//! Model:
//! - A clip is sampled at a ratio in [0,1] over its duration.
//! - The caller seeds the output buffer with the skeleton rest pose; a sampler
//!   overwrites only the channels it animates.
//! - `AnimationClip` stores per-joint keys at normalized stamps, lerping
//!   translation/scale and slerping rotation between neighbouring keys.

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::math::Transform;

/// Produces local joint transforms for a clip at a normalized time.
pub trait ClipSampler: fmt::Debug + Send + Sync {
    /// Clip length in seconds. Non-positive durations disable time advancement.
    fn duration(&self) -> f32;

    /// Overwrite animated channels of `out` (indexed by joint) at `ratio` in [0,1].
    fn sample(&self, ratio: f32, out: &mut [Transform]);
}

/// A single key at a normalized stamp in [0,1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Key<T> {
    pub stamp: f32,
    pub value: T,
}

impl<T> Key<T> {
    pub fn new(stamp: f32, value: T) -> Self {
        Self { stamp, value }
    }
}

/// Keys for one joint. Empty channels leave the seeded value alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JointTrack {
    pub joint: usize,
    #[serde(default)]
    pub translations: Vec<Key<Vec3>>,
    #[serde(default)]
    pub rotations: Vec<Key<Quat>>,
    #[serde(default)]
    pub scales: Vec<Key<Vec3>>,
}

impl JointTrack {
    pub fn new(joint: usize) -> Self {
        Self {
            joint,
            ..Self::default()
        }
    }

    pub fn with_translation(mut self, stamp: f32, value: Vec3) -> Self {
        self.translations.push(Key::new(stamp, value));
        self
    }

    pub fn with_rotation(mut self, stamp: f32, value: Quat) -> Self {
        self.rotations.push(Key::new(stamp, value));
        self
    }

    pub fn with_scale(mut self, stamp: f32, value: Vec3) -> Self {
        self.scales.push(Key::new(stamp, value));
        self
    }
}

/// Keyframed clip: the reference [`ClipSampler`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds.
    pub duration: f32,
    #[serde(default)]
    pub tracks: Vec<JointTrack>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: JointTrack) -> Self {
        self.tracks.push(track);
        self
    }

    /// Validate basic invariants (finite stamps in [0,1], non-decreasing).
    pub fn validate_basic(&self) -> Result<(), String> {
        fn check<T>(keys: &[Key<T>], joint: usize, channel: &str) -> Result<(), String> {
            let mut last = f32::NEG_INFINITY;
            for k in keys {
                if !k.stamp.is_finite() || !(0.0..=1.0).contains(&k.stamp) {
                    return Err(format!(
                        "key stamp must be finite and in [0,1] (joint {joint} {channel})"
                    ));
                }
                if k.stamp < last {
                    return Err(format!(
                        "key stamps must be non-decreasing (joint {joint} {channel})"
                    ));
                }
                last = k.stamp;
            }
            Ok(())
        }
        if !self.duration.is_finite() {
            return Err(format!("clip '{}' duration is not finite", self.name));
        }
        for track in &self.tracks {
            check(&track.translations, track.joint, "translation")?;
            check(&track.rotations, track.joint, "rotation")?;
            check(&track.scales, track.joint, "scale")?;
        }
        Ok(())
    }
}

/// Find the segment [i, i+1] containing `u`, returning (i, i+1, local_t).
/// Before the first / after the last key the segment collapses onto that key.
fn find_segment<T>(keys: &[Key<T>], u: f32) -> (usize, usize, f32) {
    let n = keys.len();
    if n <= 1 || u <= keys[0].stamp {
        return (0, 0, 0.0);
    }
    if u >= keys[n - 1].stamp {
        return (n - 1, n - 1, 0.0);
    }
    // First key strictly after u; guaranteed in 1..n by the checks above.
    let hi = keys.partition_point(|k| k.stamp <= u).clamp(1, n - 1);
    let lo = hi - 1;
    let denom = (keys[hi].stamp - keys[lo].stamp).max(f32::EPSILON);
    (lo, hi, ((u - keys[lo].stamp) / denom).clamp(0.0, 1.0))
}

fn sample_channel<T: Copy>(keys: &[Key<T>], u: f32, blend: impl Fn(T, T, f32) -> T) -> Option<T> {
    if keys.is_empty() {
        return None;
    }
    let (i0, i1, t) = find_segment(keys, u);
    if i0 == i1 {
        return Some(keys[i0].value);
    }
    Some(blend(keys[i0].value, keys[i1].value, t))
}

impl ClipSampler for AnimationClip {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn sample(&self, ratio: f32, out: &mut [Transform]) {
        let u = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
        for track in &self.tracks {
            let Some(slot) = out.get_mut(track.joint) else {
                continue;
            };
            if let Some(t) = sample_channel(&track.translations, u, |a, b, t| a.lerp(b, t)) {
                slot.translation = t;
            }
            if let Some(r) = sample_channel(&track.rotations, u, |a, b, t| a.slerp(b, t).normalize()) {
                slot.rotation = r;
            }
            if let Some(s) = sample_channel(&track.scales, u, |a, b, t| a.lerp(b, t)) {
                slot.scale = s;
            }
        }
    }
}
