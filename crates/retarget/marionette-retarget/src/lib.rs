//! Marionette retargeting: humanoid bone mapping and cross-skeleton pose transfer.

pub mod humanoid;
pub mod retargeter;

pub use humanoid::{map_humanoid, HumanoidBone, HumanoidMapping, HUMANOID_BONE_COUNT};
pub use retargeter::{RetargetBone, RetargetState, Retargeter};
