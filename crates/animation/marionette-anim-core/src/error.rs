//! Load-time validation errors.
//!
//! The runtime itself never fails on expected conditions; these errors are only
//! produced by the opt-in `validate()` calls hosts run when an asset is loaded.

use thiserror::Error;

/// Structural problems in a [`Skeleton`](crate::skeleton::Skeleton).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkeletonError {
    #[error("skeleton has no joints")]
    Empty,
    #[error("joint {joint} references parent {parent}, which does not precede it")]
    ParentNotBeforeChild { joint: usize, parent: usize },
    #[error("joint {joint} rest transform is not finite")]
    NonFiniteRest { joint: usize },
}

/// Problems in an [`AnimatorController`](crate::blueprint::AnimatorController) graph.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum BlueprintError {
    #[error("controller has no layers")]
    NoLayers,
    #[error("layer {layer} default state {state} is out of range")]
    DefaultStateOutOfRange { layer: usize, state: u32 },
    #[error("layer {layer}: transition from '{from}' targets missing state {destination}")]
    DanglingTransition {
        layer: usize,
        from: String,
        destination: u32,
    },
    #[error("layer {layer}: condition references unknown parameter '{parameter}'")]
    UnknownParameter { layer: usize, parameter: String },
    #[error("layer {layer}: comparator {comparator} cannot be applied to {kind} parameter '{parameter}'")]
    ComparatorMismatch {
        layer: usize,
        parameter: String,
        comparator: String,
        kind: String,
    },
    #[error("layer {layer}: state '{state}' speed parameter '{parameter}' is not a float")]
    SpeedParameterNotFloat {
        layer: usize,
        state: String,
        parameter: String,
    },
    #[error("layer {layer}: weight {weight} is outside [0, 1]")]
    WeightOutOfRange { layer: usize, weight: f32 },
    #[error("layer {layer}: transition from '{from}' has {field} {value} outside [0, 1]")]
    RatioOutOfRange {
        layer: usize,
        from: String,
        field: &'static str,
        value: f32,
    },
}
