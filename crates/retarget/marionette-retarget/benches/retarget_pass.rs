use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use glam::Mat4;
use marionette_anim_core::{AnimationClip, Skeleton};
use marionette_retarget::Retargeter;
use marionette_test_fixtures as fixtures;

fn bench_retarget(c: &mut Criterion) {
    let source: Arc<Skeleton> =
        Arc::new(fixtures::skeletons::load("humanoid-mixamo").expect("source skeleton"));
    let dest: Skeleton = fixtures::skeletons::load("humanoid-unreal").expect("dest skeleton");
    let run: AnimationClip = fixtures::clips::load("mixamo-run").expect("run clip");

    let mut retargeter = Retargeter::new();
    retargeter.setup_from_rest_pose(source, &dest);
    assert!(retargeter.is_valid());
    let mut out = vec![Mat4::IDENTITY; dest.joint_count()];

    c.bench_function("retarget_single", |b| {
        let mut t = 0.0f32;
        b.iter(|| {
            t = (t + 0.01) % 1.0;
            retargeter.sample_and_retarget(&run, black_box(t), &mut out);
            black_box(out[0]);
        })
    });

    c.bench_function("retarget_blended", |b| {
        b.iter(|| {
            retargeter.sample_blended_and_retarget(&run, 0.2, &run, 0.7, black_box(0.4), &mut out);
            black_box(out[0]);
        })
    });
}

criterion_group!(benches, bench_retarget);
criterion_main!(benches);
