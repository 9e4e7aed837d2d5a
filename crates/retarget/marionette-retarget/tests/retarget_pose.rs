use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Mat4, Quat};
use marionette_anim_core::{local_to_model, AnimationClip, ClipSampler, JointTrack, Skeleton};
use marionette_retarget::{RetargetState, Retargeter};
use marionette_test_fixtures as fixtures;

fn skeleton(name: &str) -> Arc<Skeleton> {
    Arc::new(fixtures::skeletons::load(name).expect("skeleton fixture"))
}

fn clip(name: &str) -> AnimationClip {
    fixtures::clips::load(name).expect("clip fixture")
}

fn sample_model(skel: &Skeleton, clip: &dyn ClipSampler, t: f32) -> Vec<Mat4> {
    let mut locals = skel.rest_pose();
    clip.sample(t, &mut locals);
    let mut out = vec![Mat4::IDENTITY; skel.joint_count()];
    local_to_model(skel, &locals, &mut out);
    out
}

fn assert_poses_eq(a: &[Mat4], b: &[Mat4], eps: f32) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!(x.abs_diff_eq(*y, eps), "joint {i}: {x:?} != {y:?}");
    }
}

#[test]
fn identical_skeleton_reproduces_source_pose() {
    let skel = skeleton("humanoid-unity");
    let walk = clip("walk");
    let mut rt = Retargeter::new();
    assert_eq!(rt.setup_from_rest_pose(skel.clone(), &skel), RetargetState::Valid);
    assert_eq!(rt.bone_entries().len(), skel.joint_count());

    let mut out = vec![Mat4::IDENTITY; skel.joint_count()];
    for t in [0.0, 0.13, 0.5, 0.87, 1.0] {
        rt.sample_and_retarget(&walk, t, &mut out);
        assert_poses_eq(&out, &sample_model(&skel, &walk, t), 1e-4);
    }
}

#[test]
fn rest_pose_maps_onto_destination_rest_pose() {
    let source = skeleton("humanoid-mixamo");
    let dest = skeleton("humanoid-unreal");
    let mut rt = Retargeter::new();
    rt.setup_from_rest_pose(source, &dest);
    assert!(rt.is_valid());

    let still = AnimationClip::new("still", 1.0);
    let mut out = vec![Mat4::IDENTITY; dest.joint_count()];
    rt.sample_and_retarget(&still, 0.5, &mut out);
    assert_poses_eq(&out, &dest.rest_model_matrices(), 1e-4);
}

#[test]
fn unmatched_child_follows_matched_parent() {
    let source = skeleton("humanoid-unity");
    let dest = skeleton("humanoid-unreal");
    let walk = clip("walk");
    let mut rt = Retargeter::new();
    rt.setup_from_rest_pose(source, &dest);

    let mut out = vec![Mat4::IDENTITY; dest.joint_count()];
    rt.sample_and_retarget(&walk, 0.3, &mut out);

    let hand = dest.find("hand_r").unwrap();
    let weapon = dest.find("hand_r_weapon").unwrap();
    let rest_local = dest.joints[weapon].rest.to_matrix();
    assert!(out[weapon].abs_diff_eq(out[hand] * rest_local, 1e-4));

    // Unmatched root stays at its rest transform.
    let root = dest.find("root").unwrap();
    assert!(out[root].abs_diff_eq(dest.joints[root].rest.to_matrix(), 1e-6));
}

#[test]
fn unmatched_child_is_carried_by_rotated_parent() {
    let source = skeleton("humanoid-unity");
    let dest = skeleton("humanoid-unreal");
    let src_hand = source.find("RightHand").unwrap();
    let twist = AnimationClip::new("twist", 1.0)
        .with_track(JointTrack::new(src_hand).with_rotation(0.0, Quat::from_rotation_z(FRAC_PI_2)));
    let mut rt = Retargeter::new();
    assert_eq!(rt.setup_from_rest_pose(source, &dest), RetargetState::Valid);

    let mut out = vec![Mat4::IDENTITY; dest.joint_count()];
    rt.sample_and_retarget(&twist, 0.5, &mut out);

    let rest = dest.rest_model_matrices();
    let hand = dest.find("hand_r").unwrap();
    let weapon = dest.find("hand_r_weapon").unwrap();
    assert!(!out[hand].abs_diff_eq(rest[hand], 1e-3));
    assert!(!out[weapon].abs_diff_eq(rest[weapon], 1e-3));
    let rest_local = dest.joints[weapon].rest.to_matrix();
    assert!(out[weapon].abs_diff_eq(out[hand] * rest_local, 1e-4));
}

#[test]
fn motion_transfers_between_conventions() {
    let source = skeleton("humanoid-mixamo");
    let dest = skeleton("humanoid-unreal");
    let run = clip("mixamo-run");
    let mut rt = Retargeter::new();
    rt.setup_from_rest_pose(source, &dest);

    let entries = rt.bone_entries();
    assert_eq!(entries.len(), 52);
    assert!(entries.windows(2).all(|w| w[0].dest_joint < w[1].dest_joint));

    let mut out = vec![Mat4::IDENTITY; dest.joint_count()];
    rt.sample_and_retarget(&run, 0.25, &mut out);
    assert!(out.iter().all(|m| m.is_finite()));
    let thigh = dest.find("thigh_l").unwrap();
    let rest = dest.rest_model_matrices();
    assert!(!out[thigh].abs_diff_eq(rest[thigh], 1e-3));
}

#[test]
fn blended_sampling_matches_endpoints() {
    let source = skeleton("humanoid-unity");
    let dest = skeleton("humanoid-mixamo");
    let walk = clip("walk");
    let wave = clip("wave");
    let mut rt = Retargeter::new();
    rt.setup_from_rest_pose(source, &dest);

    let n = dest.joint_count();
    let mut single = vec![Mat4::IDENTITY; n];
    let mut blended = vec![Mat4::IDENTITY; n];

    rt.sample_and_retarget(&walk, 0.4, &mut single);
    rt.sample_blended_and_retarget(&walk, 0.4, &wave, 0.8, 0.0, &mut blended);
    assert_poses_eq(&blended, &single, 1e-4);

    rt.sample_and_retarget(&wave, 0.8, &mut single);
    rt.sample_blended_and_retarget(&walk, 0.4, &wave, 0.8, 1.0, &mut blended);
    assert_poses_eq(&blended, &single, 1e-4);
}

#[test]
fn invalid_setup_resets_a_valid_retargeter() {
    let human = skeleton("humanoid-unity");
    let beast = skeleton("creature-quadruped");
    let mut rt = Retargeter::new();
    assert_eq!(rt.setup_from_rest_pose(human.clone(), &human), RetargetState::Valid);
    assert_eq!(rt.setup_from_rest_pose(beast, &human), RetargetState::Uninitialized);
    assert!(rt.bone_entries().is_empty());

    let marker = Mat4::from_translation(glam::Vec3::splat(7.0));
    let mut out = vec![marker; human.joint_count()];
    rt.sample_and_retarget(&clip("walk"), 0.5, &mut out);
    assert!(out.iter().all(|m| *m == marker));
}

#[test]
fn short_output_buffer_is_filled_partially() {
    let skel = skeleton("humanoid-unity");
    let mut rt = Retargeter::new();
    rt.setup_from_rest_pose(skel.clone(), &skel);
    let mut out = vec![Mat4::ZERO; 4];
    rt.sample_and_retarget(&clip("walk"), 0.5, &mut out);
    assert_poses_eq(&out, &sample_model(&skel, &clip("walk"), 0.5)[..4], 1e-4);
}
