//! Transform type and matrix blending helpers.
//!
//! Matrices follow glam's column-vector convention: a joint's model matrix is
//! `parent_model * local`.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_rotation() -> Quat {
    Quat::IDENTITY
}

/// Translation / rotation / scale of a joint relative to its parent.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default = "default_rotation")]
    pub rotation: Quat,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// TRS interpolation: lerp for translation and scale, shortest-arc slerp for rotation.
    pub fn lerp(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t).normalize(),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

/// Element-wise matrix interpolation `a + (b - a) * t`.
#[inline]
pub fn lerp_mat4(a: &Mat4, b: &Mat4, t: f32) -> Mat4 {
    *a + (*b - *a) * t
}

/// Matrix-space additive blend: `base + (layer - I) * weight`.
///
/// This is not a TRS-decomposed additive; it is kept in matrix form so layered
/// output stays bit-for-bit stable across hosts.
#[inline]
pub fn add_scaled_delta(base: &Mat4, layer: &Mat4, weight: f32) -> Mat4 {
    *base + (*layer - Mat4::IDENTITY) * weight
}

/// Lerp `out[i]` toward `target[i]` for every pair.
pub fn lerp_poses_into(out: &mut [Mat4], from: &[Mat4], to: &[Mat4], t: f32) {
    for ((o, a), b) in out.iter_mut().zip(from).zip(to) {
        *o = lerp_mat4(a, b, t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn lerp_mat4_endpoints() {
        let a = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let b = Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(lerp_mat4(&a, &b, 0.0), a);
        assert_eq!(lerp_mat4(&a, &b, 1.0), b);
        let mid = lerp_mat4(&a, &b, 0.5);
        assert_relative_eq!(mid.w_axis.x, 2.0);
    }

    #[test]
    fn additive_identity_layer_is_noop() {
        let base = Mat4::from_rotation_y(0.3) * Mat4::from_translation(Vec3::Y);
        let out = add_scaled_delta(&base, &Mat4::IDENTITY, 0.7);
        assert_eq!(out, base);
    }

    #[test]
    fn additive_adds_translation_delta() {
        let base = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let layer = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        let out = add_scaled_delta(&base, &layer, 0.5);
        assert_relative_eq!(out.w_axis.x, 1.0);
        assert_relative_eq!(out.w_axis.y, 1.0);
    }

    #[test]
    fn transform_matrix_round_trip() {
        let t = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(FRAC_PI_2),
            Vec3::splat(2.0),
        );
        let back = Transform::from_matrix(&t.to_matrix());
        assert_relative_eq!(back.translation, t.translation, epsilon = 1e-5);
        assert_relative_eq!(back.scale, t.scale, epsilon = 1e-5);
        assert!(back.rotation.dot(t.rotation).abs() > 0.9999);
    }

    #[test]
    fn transform_lerp_halfway_rotation() {
        let a = Transform::IDENTITY;
        let b = Transform::from_rotation(Quat::from_rotation_x(FRAC_PI_2));
        let mid = a.lerp(&b, 0.5);
        let expected = Quat::from_rotation_x(FRAC_PI_2 * 0.5);
        assert!(mid.rotation.dot(expected).abs() > 0.9999);
    }
}
