//! Joint hierarchy and local-to-model composition.

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::error::SkeletonError;
use crate::math::Transform;

/// A node of the joint hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub name: String,
    /// `None` for roots. Always smaller than this joint's own index.
    #[serde(default)]
    pub parent: Option<usize>,
    /// Rest (bind) pose relative to the parent.
    #[serde(default)]
    pub rest: Transform,
}

impl Joint {
    pub fn new(name: impl Into<String>, parent: Option<usize>, rest: Transform) -> Self {
        Self {
            name: name.into(),
            parent,
            rest,
        }
    }
}

/// Ordered joint hierarchy; parents are stored before their children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    #[serde(default)]
    pub name: String,
    pub joints: Vec<Joint>,
}

impl Skeleton {
    pub fn new(name: impl Into<String>, joints: Vec<Joint>) -> Self {
        Self {
            name: name.into(),
            joints,
        }
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn parent(&self, joint: usize) -> Option<usize> {
        self.joints.get(joint).and_then(|j| j.parent)
    }

    /// Exact (case-sensitive) name lookup.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Check the parent-before-child invariant and rest pose sanity.
    pub fn validate(&self) -> Result<(), SkeletonError> {
        if self.joints.is_empty() {
            return Err(SkeletonError::Empty);
        }
        for (idx, joint) in self.joints.iter().enumerate() {
            if let Some(parent) = joint.parent {
                if parent >= idx {
                    return Err(SkeletonError::ParentNotBeforeChild { joint: idx, parent });
                }
            }
            if !joint.rest.is_finite() {
                return Err(SkeletonError::NonFiniteRest { joint: idx });
            }
        }
        Ok(())
    }

    /// Write the rest pose into `out` (up to the shorter length).
    pub fn fill_rest_pose(&self, out: &mut [Transform]) {
        for (o, joint) in out.iter_mut().zip(&self.joints) {
            *o = joint.rest;
        }
    }

    pub fn rest_pose(&self) -> Vec<Transform> {
        self.joints.iter().map(|j| j.rest).collect()
    }

    /// Model-space rest matrices, one per joint.
    pub fn rest_model_matrices(&self) -> Vec<Mat4> {
        let locals = self.rest_pose();
        let mut out = vec![Mat4::IDENTITY; locals.len()];
        local_to_model(self, &locals, &mut out);
        out
    }
}

/// Compose local transforms into model space following the skeleton hierarchy.
///
/// Processes `min(joints, locals, out)` entries. A parent index that does not
/// precede its child is treated as a root rather than read uninitialized.
pub fn local_to_model(skeleton: &Skeleton, locals: &[Transform], out: &mut [Mat4]) {
    let n = skeleton.joints.len().min(locals.len()).min(out.len());
    for i in 0..n {
        let local = locals[i].to_matrix();
        out[i] = match skeleton.joints[i].parent {
            Some(p) if p < i => out[p] * local,
            _ => local,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};
    use std::f32::consts::FRAC_PI_2;

    fn chain() -> Skeleton {
        Skeleton::new(
            "chain",
            vec![
                Joint::new("root", None, Transform::from_translation(Vec3::Y)),
                Joint::new(
                    "mid",
                    Some(0),
                    Transform::new(Vec3::X, Quat::from_rotation_z(FRAC_PI_2), Vec3::ONE),
                ),
                Joint::new("tip", Some(1), Transform::from_translation(Vec3::X)),
            ],
        )
    }

    #[test]
    fn validate_accepts_ordered_hierarchy() {
        assert_eq!(chain().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_forward_parent() {
        let mut s = chain();
        s.joints[1].parent = Some(2);
        assert_eq!(
            s.validate(),
            Err(SkeletonError::ParentNotBeforeChild { joint: 1, parent: 2 })
        );
        assert_eq!(Skeleton::default().validate(), Err(SkeletonError::Empty));
    }

    #[test]
    fn rest_model_composes_parent_first() {
        let model = chain().rest_model_matrices();
        // tip = root(+Y) * mid(+X, rotZ 90) * tip(+X) => (1, 2, 0)
        let tip = model[2].w_axis.truncate();
        assert_relative_eq!(tip, Vec3::new(1.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn find_is_exact() {
        let s = chain();
        assert_eq!(s.find("mid"), Some(1));
        assert_eq!(s.find("MID"), None);
        assert_eq!(s.parent(2), Some(1));
        assert_eq!(s.parent(0), None);
    }
}
