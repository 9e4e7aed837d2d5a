//! Cross-skeleton retargeting through the canonical humanoid mapping.
//!
//! Setup precomputes, for every canonical bone present on both skeletons, the
//! rest-pose offsets that carry a source joint's parent-relative motion into
//! the destination joint's frame. Sampling then walks destination joints in
//! ascending order so each joint composes onto an already computed parent:
//! - matched joints: `dest_model[parent] * source_relative_parent * source_local * dest_relative`
//! - unmatched joints: `dest_model[parent] * dest_rest_local`

use std::sync::Arc;

use glam::Mat4;
use log::{debug, warn};
use marionette_anim_core::math::lerp_mat4;
use marionette_anim_core::{local_to_model, ClipSampler, Skeleton, Transform};

use crate::humanoid::{map_humanoid, HumanoidBone, HumanoidMapping};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RetargetState {
    #[default]
    Uninitialized,
    Valid,
}

/// Precomputed pairing of one canonical bone across both skeletons.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RetargetBone {
    pub bone: HumanoidBone,
    pub source_joint: usize,
    pub dest_joint: usize,
    /// `inverse(source_rest_world) * dest_rest_world`
    pub dest_relative: Mat4,
    /// `inverse(dest_parent_rest_world) * source_parent_rest_world`
    pub source_relative_parent: Mat4,
}

#[derive(Debug, Default)]
pub struct Retargeter {
    state: RetargetState,
    source: Option<Arc<Skeleton>>,
    source_mapping: HumanoidMapping,
    dest_mapping: HumanoidMapping,

    /// Sorted by destination joint.
    bones: Vec<RetargetBone>,
    /// Per destination joint: index into `bones`.
    dest_bone: Vec<Option<usize>>,
    dest_parents: Vec<Option<usize>>,
    dest_rest_local: Vec<Mat4>,

    source_rest_locals: Vec<Transform>,
    source_locals: Vec<Transform>,
    source_model: Vec<Mat4>,
    source_model_b: Vec<Mat4>,
}

impl Retargeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `source` with `dest` using caller-provided model-space rest
    /// matrices. On failure a warning is logged and the retargeter stays
    /// `Uninitialized`; sampling calls are then no-ops.
    pub fn setup(
        &mut self,
        source: Arc<Skeleton>,
        dest: &Skeleton,
        source_rest_model: &[Mat4],
        dest_rest_model: &[Mat4],
    ) -> RetargetState {
        *self = Self::default();

        if source_rest_model.len() < source.joint_count()
            || dest_rest_model.len() < dest.joint_count()
        {
            warn!(
                "retarget setup '{}' -> '{}': rest matrices shorter than joint count ({}/{} source, {}/{} dest)",
                source.name,
                dest.name,
                source_rest_model.len(),
                source.joint_count(),
                dest_rest_model.len(),
                dest.joint_count()
            );
            return self.state;
        }

        let source_mapping = map_humanoid(&source);
        if !source_mapping.is_valid_humanoid() {
            warn!(
                "retarget setup: source skeleton '{}' is not humanoid (missing {:?})",
                source.name,
                source_mapping.missing_required()
            );
            return self.state;
        }
        let dest_mapping = map_humanoid(dest);
        if !dest_mapping.is_valid_humanoid() {
            warn!(
                "retarget setup: destination skeleton '{}' is not humanoid (missing {:?})",
                dest.name,
                dest_mapping.missing_required()
            );
            return self.state;
        }

        let mut bones: Vec<RetargetBone> = source_mapping
            .iter()
            .filter_map(|(bone, source_joint)| {
                let dest_joint = dest_mapping.get(bone)?;
                let source_parent_world = source
                    .parent(source_joint)
                    .map_or(Mat4::IDENTITY, |p| source_rest_model[p]);
                let dest_parent_world = dest
                    .parent(dest_joint)
                    .map_or(Mat4::IDENTITY, |p| dest_rest_model[p]);
                Some(RetargetBone {
                    bone,
                    source_joint,
                    dest_joint,
                    dest_relative: source_rest_model[source_joint].inverse()
                        * dest_rest_model[dest_joint],
                    source_relative_parent: dest_parent_world.inverse() * source_parent_world,
                })
            })
            .collect();
        if bones.is_empty() {
            warn!(
                "retarget setup '{}' -> '{}': no canonical bone present on both skeletons",
                source.name, dest.name
            );
            return self.state;
        }
        bones.sort_by_key(|b| b.dest_joint);

        let n = dest.joint_count();
        let mut dest_bone = vec![None; n];
        for (i, b) in bones.iter().enumerate() {
            dest_bone[b.dest_joint] = Some(i);
        }
        self.dest_parents = dest.joints.iter().map(|j| j.parent).collect();
        self.dest_rest_local = (0..n)
            .map(|i| match dest.parent(i) {
                Some(p) => dest_rest_model[p].inverse() * dest_rest_model[i],
                None => dest_rest_model[i],
            })
            .collect();
        self.dest_bone = dest_bone;

        let m = source.joint_count();
        self.source_rest_locals = source.rest_pose();
        self.source_locals = self.source_rest_locals.clone();
        self.source_model = vec![Mat4::IDENTITY; m];
        self.source_model_b = vec![Mat4::IDENTITY; m];

        debug!(
            "retarget setup '{}' -> '{}': {} bones matched, {} destination joints follow rest pose",
            source.name,
            dest.name,
            bones.len(),
            n - bones.len()
        );
        self.bones = bones;
        self.source_mapping = source_mapping;
        self.dest_mapping = dest_mapping;
        self.source = Some(source);
        self.state = RetargetState::Valid;
        self.state
    }

    /// `setup` with rest matrices derived from each skeleton's own rest pose.
    pub fn setup_from_rest_pose(&mut self, source: Arc<Skeleton>, dest: &Skeleton) -> RetargetState {
        let source_rest = source.rest_model_matrices();
        let dest_rest = dest.rest_model_matrices();
        self.setup(source, dest, &source_rest, &dest_rest)
    }

    #[inline]
    pub fn state(&self) -> RetargetState {
        self.state
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.state == RetargetState::Valid
    }

    #[inline]
    pub fn bone_entries(&self) -> &[RetargetBone] {
        &self.bones
    }

    #[inline]
    pub fn dest_joint_count(&self) -> usize {
        self.dest_parents.len()
    }

    pub fn source_mapping(&self) -> &HumanoidMapping {
        &self.source_mapping
    }

    pub fn dest_mapping(&self) -> &HumanoidMapping {
        &self.dest_mapping
    }

    /// Sample `clip` on the source skeleton at `normalized_time` and write the
    /// destination model-space pose into `dest_out`.
    pub fn sample_and_retarget(
        &mut self,
        clip: &dyn ClipSampler,
        normalized_time: f32,
        dest_out: &mut [Mat4],
    ) {
        let Some(source) = self.source.clone() else {
            return;
        };
        sample_model(
            &source,
            clip,
            normalized_time,
            &self.source_rest_locals,
            &mut self.source_locals,
            &mut self.source_model,
        );
        self.retarget_pass(&source, dest_out);
    }

    /// Sample two clips at independent times, blend their source model poses
    /// by `weight` (0 = `clip_a`), then retarget once.
    pub fn sample_blended_and_retarget(
        &mut self,
        clip_a: &dyn ClipSampler,
        time_a: f32,
        clip_b: &dyn ClipSampler,
        time_b: f32,
        weight: f32,
        dest_out: &mut [Mat4],
    ) {
        let Some(source) = self.source.clone() else {
            return;
        };
        sample_model(
            &source,
            clip_a,
            time_a,
            &self.source_rest_locals,
            &mut self.source_locals,
            &mut self.source_model,
        );
        sample_model(
            &source,
            clip_b,
            time_b,
            &self.source_rest_locals,
            &mut self.source_locals,
            &mut self.source_model_b,
        );
        let w = weight.clamp(0.0, 1.0);
        for (a, b) in self.source_model.iter_mut().zip(&self.source_model_b) {
            *a = lerp_mat4(a, b, w);
        }
        self.retarget_pass(&source, dest_out);
    }

    fn retarget_pass(&self, source: &Skeleton, dest_out: &mut [Mat4]) {
        let n = dest_out.len().min(self.dest_parents.len());
        for i in 0..n {
            let parent_model = match self.dest_parents[i] {
                Some(p) if p < i => dest_out[p],
                _ => Mat4::IDENTITY,
            };
            dest_out[i] = match self.dest_bone[i] {
                Some(b) => {
                    let bone = &self.bones[b];
                    let s = bone.source_joint;
                    let source_parent = source
                        .parent(s)
                        .map_or(Mat4::IDENTITY, |p| self.source_model[p]);
                    let source_local = source_parent.inverse() * self.source_model[s];
                    parent_model * bone.source_relative_parent * source_local * bone.dest_relative
                }
                None => parent_model * self.dest_rest_local[i],
            };
        }
    }
}

fn sample_model(
    skeleton: &Skeleton,
    clip: &dyn ClipSampler,
    normalized_time: f32,
    rest_locals: &[Transform],
    locals: &mut [Transform],
    out: &mut [Mat4],
) {
    locals.copy_from_slice(rest_locals);
    clip.sample(normalized_time.clamp(0.0, 1.0), locals);
    local_to_model(skeleton, locals, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_anim_core::{AnimationClip, Joint};

    fn tiny(names: &[&str]) -> Skeleton {
        Skeleton::new(
            "tiny",
            names
                .iter()
                .enumerate()
                .map(|(i, &n)| Joint::new(n, i.checked_sub(1), Transform::IDENTITY))
                .collect(),
        )
    }

    #[test]
    fn non_humanoid_stays_uninitialized() {
        let skel = Arc::new(tiny(&["Hips", "Spine", "Head"]));
        let mut rt = Retargeter::new();
        assert_eq!(rt.setup_from_rest_pose(skel.clone(), &skel), RetargetState::Uninitialized);
        assert!(!rt.is_valid());
        assert!(rt.bone_entries().is_empty());
    }

    #[test]
    fn uninitialized_sampling_leaves_output_untouched() {
        let mut rt = Retargeter::new();
        let clip = AnimationClip::new("empty", 1.0);
        let marker = Mat4::from_scale(glam::Vec3::splat(3.0));
        let mut out = vec![marker; 4];
        rt.sample_and_retarget(&clip, 0.5, &mut out);
        rt.sample_blended_and_retarget(&clip, 0.1, &clip, 0.9, 0.5, &mut out);
        assert!(out.iter().all(|m| *m == marker));
    }

    #[test]
    fn short_rest_matrices_fail_setup() {
        let skel = Arc::new(tiny(&["Hips"]));
        let mut rt = Retargeter::new();
        assert_eq!(rt.setup(skel.clone(), &skel, &[], &[]), RetargetState::Uninitialized);
        assert_eq!(rt.dest_joint_count(), 0);
    }
}
