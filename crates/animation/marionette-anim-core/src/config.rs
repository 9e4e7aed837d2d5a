//! Runtime configuration for animator sizing and per-tick guards.

use serde::{Deserialize, Serialize};

/// Hard caps applied by every [`Animator`](crate::animator::Animator).
///
/// The defaults match the skinning shader budget and the transition guard used
/// across the runtime; hosts normally keep them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorConfig {
    /// Bones beyond this count are silently dropped from the bone-matrix buffer.
    pub max_bones: usize,
    /// Layers beyond this count are never evaluated.
    pub max_layers: usize,
    /// Per-layer cap on transitions started within a single tick.
    pub max_transitions_per_frame: u32,
    /// Tolerance for `Equals`/`NotEqual` float conditions.
    pub epsilon: f32,
}

pub const DEFAULT_MAX_BONES: usize = 256;
pub const DEFAULT_MAX_LAYERS: usize = 8;
pub const DEFAULT_MAX_TRANSITIONS_PER_FRAME: u32 = 8;

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            max_bones: DEFAULT_MAX_BONES,
            max_layers: DEFAULT_MAX_LAYERS,
            max_transitions_per_frame: DEFAULT_MAX_TRANSITIONS_PER_FRAME,
            epsilon: 1e-5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: AnimatorConfig = serde_json::from_str(r#"{ "max_bones": 64 }"#).unwrap();
        assert_eq!(cfg.max_bones, 64);
        assert_eq!(cfg.max_layers, DEFAULT_MAX_LAYERS);
        assert_eq!(cfg.max_transitions_per_frame, DEFAULT_MAX_TRANSITIONS_PER_FRAME);
    }
}
