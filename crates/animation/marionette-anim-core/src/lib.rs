//! Marionette animation core (engine-agnostic)
//!
//! Skeletons, clip sampling, the authored animation blueprint (controller,
//! layers, states, transitions) and the per-character `Animator` that ticks it
//! into skinning matrices.

pub mod animator;
pub mod blueprint;
pub mod clip;
pub mod config;
pub mod easing;
pub mod error;
pub mod events;
pub mod ids;
pub mod math;
pub mod params;
pub mod playback;
pub mod scratch;
pub mod skeleton;

// Re-exports for hosts
pub use animator::{ActiveTransition, Animator, LayerState, MeshBinding};
pub use blueprint::{
    AnimatorController, AnimatorLayer, AnimatorState, AnimatorTransition, BlendMode, BoneMask,
    DEFAULT_TRANSITION_DURATION,
};
pub use clip::{AnimationClip, ClipSampler, JointTrack, Key};
pub use config::AnimatorConfig;
pub use easing::EasingCurve;
pub use error::{BlueprintError, SkeletonError};
pub use events::{AnimatorEvent, Outputs};
pub use ids::StateId;
pub use math::Transform;
pub use params::{Comparator, Condition, ParamKind, ParamValue, Parameter, ParameterTable};
pub use playback::LoopMode;
pub use scratch::Scratch;
pub use skeleton::{local_to_model, Joint, Skeleton};

pub use glam;
