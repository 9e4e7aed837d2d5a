//! Per-instance pose buffers reused every tick.
//!
//! Allocated once when an animator is initialized with a skeleton; never shared
//! between instances.

use glam::Mat4;

use crate::math::Transform;
use crate::skeleton::{local_to_model, Skeleton};

#[derive(Debug, Default)]
pub struct Scratch {
    /// Rest pose, used to seed sampling and for clip-less states.
    pub rest_locals: Vec<Transform>,
    pub rest_model: Vec<Mat4>,
    /// Sampler output for the state being evaluated.
    pub locals: Vec<Transform>,
    /// Current state's model pose.
    pub pose_a: Vec<Mat4>,
    /// Outgoing state's model pose during a cross-fade.
    pub pose_b: Vec<Mat4>,
    /// Layer result after blending.
    pub layer_pose: Vec<Mat4>,
    /// Running composition across layers.
    pub working: Vec<Mat4>,
}

impl Scratch {
    pub fn new(skeleton: &Skeleton) -> Self {
        let n = skeleton.joint_count();
        let rest_locals = skeleton.rest_pose();
        let mut rest_model = vec![Mat4::IDENTITY; n];
        local_to_model(skeleton, &rest_locals, &mut rest_model);
        Self {
            locals: rest_locals.clone(),
            rest_locals,
            pose_a: rest_model.clone(),
            pose_b: rest_model.clone(),
            layer_pose: rest_model.clone(),
            working: rest_model.clone(),
            rest_model,
        }
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.rest_model.len()
    }
}
