use std::sync::Arc;

use approx::assert_abs_diff_eq;
use glam::{Mat4, Vec3};
use marionette_anim_core::{
    AnimationClip, Animator, AnimatorConfig, AnimatorController, AnimatorLayer, AnimatorState,
    BlendMode, BoneMask, EasingCurve, Joint, JointTrack, MeshBinding, ParameterTable, Skeleton,
    Transform,
};

/// root -> spine -> arm, each joint one unit above its parent.
fn column() -> Arc<Skeleton> {
    Arc::new(Skeleton::new(
        "column",
        vec![
            Joint::new("root", None, Transform::IDENTITY),
            Joint::new("spine", Some(0), Transform::from_translation(Vec3::Y)),
            Joint::new("arm", Some(1), Transform::from_translation(Vec3::Y)),
        ],
    ))
}

fn shift(joint: usize, offset: Vec3) -> Arc<AnimationClip> {
    Arc::new(
        AnimationClip::new("shift", 1.0).with_track(JointTrack::new(joint).with_translation(0.0, offset)),
    )
}

fn translation(m: &Mat4) -> Vec3 {
    m.w_axis.truncate()
}

fn build(layers: Vec<AnimatorLayer>, cfg: AnimatorConfig) -> Animator {
    let mut controller = AnimatorController::new(ParameterTable::new());
    for layer in layers {
        controller = controller.with_layer(layer);
    }
    let mut anim = Animator::new(Arc::new(controller), cfg);
    let skeleton = column();
    let binding = MeshBinding::from_rest_pose(&skeleton);
    anim.initialize(skeleton, binding);
    anim
}

fn base_with(clip: Option<Arc<AnimationClip>>) -> AnimatorLayer {
    let mut layer = AnimatorLayer::new("base");
    let mut state = AnimatorState::new("pose");
    if let Some(clip) = clip {
        state = state.with_clip(clip);
    }
    layer.add_state(state);
    layer
}

#[test]
fn rest_pose_yields_identity_skinning() {
    let anim = build(vec![base_with(None)], AnimatorConfig::default());
    assert!(anim.is_initialized());
    assert_eq!(anim.bone_count(), 3);
    for m in anim.bone_matrices() {
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }
}

#[test]
fn sampled_clip_moves_children_with_parent() {
    let mut anim = build(vec![base_with(Some(shift(0, Vec3::X)))], AnimatorConfig::default());
    anim.tick(0.1);
    let pose = anim.model_pose();
    assert!(translation(&pose[0]).abs_diff_eq(Vec3::X, 1e-6));
    assert!(translation(&pose[2]).abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6));
    // Rest-relative skinning: every bone carries the same root offset.
    for m in anim.bone_matrices() {
        assert!(m.abs_diff_eq(Mat4::from_translation(Vec3::X), 1e-6));
    }
}

#[test]
fn node_transform_is_applied_last() {
    let mut controller = AnimatorController::new(ParameterTable::new());
    controller = controller.with_layer(base_with(None));
    let mut anim = Animator::new(Arc::new(controller), AnimatorConfig::default());
    let skeleton = column();
    let mut binding = MeshBinding::from_rest_pose(&skeleton);
    binding.node_transform = Mat4::from_scale(Vec3::splat(2.0));
    anim.initialize(skeleton, binding);
    for m in anim.bone_matrices() {
        assert!(m.abs_diff_eq(Mat4::from_scale(Vec3::splat(2.0)), 1e-6));
    }
}

#[test]
fn missing_inverse_bind_entries_are_identity() {
    let mut controller = AnimatorController::new(ParameterTable::new());
    controller = controller.with_layer(base_with(None));
    let mut anim = Animator::new(Arc::new(controller), AnimatorConfig::default());
    anim.initialize(column(), MeshBinding::default());
    let expected = anim.model_pose()[2];
    assert!(anim.bone_matrices()[2].abs_diff_eq(expected, 1e-6));
}

#[test]
fn bone_count_is_truncated_to_max_bones() {
    let cfg = AnimatorConfig {
        max_bones: 2,
        ..AnimatorConfig::default()
    };
    let anim = build(vec![base_with(None)], cfg);
    assert_eq!(anim.bone_count(), 2);
    assert_eq!(anim.bone_matrices().len(), 2);
}

#[test]
fn cross_fade_lerps_between_states() {
    let mut layer = AnimatorLayer::new("base");
    let a = layer.add_state(AnimatorState::new("a").with_clip(shift(0, Vec3::ZERO)));
    let b = layer.add_state(AnimatorState::new("b").with_clip(shift(0, Vec3::new(2.0, 0.0, 0.0))));
    let mut anim = build(vec![layer], AnimatorConfig::default());
    anim.play(a, 0);
    anim.cross_fade(b, 1.0, 0, EasingCurve::Linear);
    anim.tick(0.5);
    assert_abs_diff_eq!(translation(&anim.model_pose()[0]).x, 1.0, epsilon = 1e-5);

    // Eased curve bends the same point in time.
    anim.play(a, 0);
    anim.cross_fade(b, 1.0, 0, EasingCurve::EaseInCubic);
    anim.tick(0.5);
    assert_abs_diff_eq!(translation(&anim.model_pose()[0]).x, 2.0 * 0.125, epsilon = 1e-5);

    anim.tick(0.6);
    assert_abs_diff_eq!(translation(&anim.model_pose()[0]).x, 2.0, epsilon = 1e-5);
}

#[test]
fn override_layer_respects_weight_and_mask() {
    let base = base_with(None);
    let mut upper = AnimatorLayer::new("upper").with_weight(0.5);
    upper.add_state(AnimatorState::new("raise").with_clip(shift(2, Vec3::new(0.0, 3.0, 0.0))));
    let mut mask = BoneMask::empty(3);
    mask.set(2, 1.0);
    let upper = upper.with_bone_mask(mask);

    let mut anim = build(vec![base, upper], AnimatorConfig::default());
    anim.tick(0.1);
    let pose = anim.model_pose();
    assert!(translation(&pose[1]).abs_diff_eq(Vec3::Y, 1e-6));
    // arm: rest y=2, layer y=1+3=4, half weight -> 3
    assert_abs_diff_eq!(translation(&pose[2]).y, 3.0, epsilon = 1e-5);

    anim.set_layer_weight(1, 0.0);
    anim.tick(0.1);
    assert_abs_diff_eq!(translation(&anim.model_pose()[2]).y, 2.0, epsilon = 1e-5);
}

#[test]
fn additive_layer_adds_scaled_delta() {
    let base = base_with(None);
    let mut add = AnimatorLayer::new("lean")
        .with_blend_mode(BlendMode::Additive)
        .with_weight(0.5);
    add.add_state(AnimatorState::new("lean").with_clip(shift(0, Vec3::X)));

    let mut anim = build(vec![base, add], AnimatorConfig::default());
    anim.tick(0.1);
    assert!(translation(&anim.model_pose()[0]).abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-6));
}

#[test]
fn base_layer_ignores_weight() {
    let base = base_with(Some(shift(0, Vec3::Z))).with_weight(0.0);
    let mut anim = build(vec![base], AnimatorConfig::default());
    assert_eq!(anim.layer_weight(0), Some(1.0));
    anim.set_layer_weight(0, 0.25);
    anim.tick(0.1);
    assert!(translation(&anim.model_pose()[0]).abs_diff_eq(Vec3::Z, 1e-6));
}

#[test]
fn layer_weight_is_clamped() {
    let mut anim = build(vec![base_with(None), base_with(None)], AnimatorConfig::default());
    anim.set_layer_weight(1, 4.0);
    assert_eq!(anim.layer_weight(1), Some(1.0));
    anim.set_layer_weight(1, -1.0);
    assert_eq!(anim.layer_weight(1), Some(0.0));
}

#[test]
fn non_finite_layer_weight_disables_the_layer() {
    let mut upper = AnimatorLayer::new("upper");
    upper.add_state(AnimatorState::new("shift").with_clip(shift(0, Vec3::X)));
    let mut anim = build(vec![base_with(None), upper], AnimatorConfig::default());
    for weight in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
        anim.set_layer_weight(1, weight);
        assert_eq!(anim.layer_weight(1), Some(0.0));
        anim.tick(0.1);
        assert!(anim.bone_matrices().iter().all(|m| m.is_finite()));
        assert!(translation(&anim.model_pose()[0]).abs_diff_eq(Vec3::ZERO, 1e-6));
    }
}

#[test]
fn layers_past_the_cap_are_not_evaluated() {
    let cfg = AnimatorConfig {
        max_layers: 1,
        ..AnimatorConfig::default()
    };
    let mut upper = AnimatorLayer::new("upper");
    upper.add_state(AnimatorState::new("shift").with_clip(shift(0, Vec3::X)));
    let mut anim = build(vec![base_with(None), upper], cfg);
    anim.tick(0.1);
    assert!(translation(&anim.model_pose()[0]).abs_diff_eq(Vec3::ZERO, 1e-6));
    assert_eq!(anim.state_time(1), 0.0);
}

#[test]
fn empty_upper_layer_contributes_nothing() {
    let upper = AnimatorLayer::new("empty");
    let mut anim = build(vec![base_with(Some(shift(0, Vec3::X))), upper], AnimatorConfig::default());
    anim.tick(0.1);
    assert_eq!(anim.current_state(1), None);
    assert!(translation(&anim.model_pose()[0]).abs_diff_eq(Vec3::X, 1e-6));
}
