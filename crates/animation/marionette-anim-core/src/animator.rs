//! Animator: per-character runtime over a shared blueprint.
//!
//! Tick order per layer (layers bounded by `AnimatorConfig::max_layers`):
//! 1. any-state transitions
//! 2. interruption of an in-flight blend by the current state's transitions
//! 3. time advance (current state, outgoing state, blend clock)
//! 4. current state's transitions, cascading through instant cuts
//!
//! After all layers are updated the pose is sampled, cross-faded, composed
//! across layers and multiplied into skinning matrices.

use std::sync::Arc;

use glam::Mat4;
use log::{debug, trace};

use crate::blueprint::{AnimatorController, AnimatorLayer, AnimatorState, AnimatorTransition, BlendMode};
use crate::config::AnimatorConfig;
use crate::easing::EasingCurve;
use crate::events::{AnimatorEvent, Outputs};
use crate::ids::StateId;
use crate::math::{add_scaled_delta, lerp_mat4, lerp_poses_into, Transform};
use crate::params::{ParamKind, ParameterTable};
use crate::playback::{self, Cursor};
use crate::scratch::Scratch;
use crate::skeleton::{local_to_model, Skeleton};

/// Mesh data used only when composing final skinning matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshBinding {
    /// Per joint; missing entries are treated as identity.
    pub inverse_bind_matrices: Vec<Mat4>,
    pub node_transform: Mat4,
}

impl Default for MeshBinding {
    fn default() -> Self {
        Self {
            inverse_bind_matrices: Vec::new(),
            node_transform: Mat4::IDENTITY,
        }
    }
}

impl MeshBinding {
    pub fn new(inverse_bind_matrices: Vec<Mat4>, node_transform: Mat4) -> Self {
        Self {
            inverse_bind_matrices,
            node_transform,
        }
    }

    /// Binding whose inverse bind matrices undo the skeleton's rest pose, so a
    /// character at rest produces identity skinning matrices.
    pub fn from_rest_pose(skeleton: &Skeleton) -> Self {
        Self {
            inverse_bind_matrices: skeleton
                .rest_model_matrices()
                .iter()
                .map(Mat4::inverse)
                .collect(),
            node_transform: Mat4::IDENTITY,
        }
    }
}

/// Blend parameters of the transition currently in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveTransition {
    pub duration: f32,
    pub curve: EasingCurve,
    pub can_interrupt_source: bool,
}

impl ActiveTransition {
    fn cut() -> Self {
        Self {
            duration: 0.0,
            curve: EasingCurve::Linear,
            can_interrupt_source: false,
        }
    }

    fn from_transition(t: &AnimatorTransition) -> Self {
        Self {
            duration: t.duration,
            curve: t.curve,
            can_interrupt_source: t.can_interrupt_source,
        }
    }
}

/// Playback cursor of one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerState {
    pub current_state: Option<StateId>,
    pub previous_state: Option<StateId>,
    pub active_transition: Option<ActiveTransition>,
    pub state_time: f32,
    pub previous_state_time: f32,
    pub normalized_time: f32,
    pub previous_normalized_time: f32,
    pub is_transitioning: bool,
    pub transition_time: f32,
    pub transition_duration: f32,
    pub playback_direction: f32,
    pub previous_playback_direction: f32,
    pub has_completed: bool,
    /// Current state's cursor wrapped or reflected during this tick's advance.
    pub cycle_wrapped: bool,
    pub transitions_this_frame: u32,
    pub weight: f32,
}

impl LayerState {
    fn new(current_state: Option<StateId>, weight: f32) -> Self {
        Self {
            current_state,
            previous_state: None,
            active_transition: None,
            state_time: 0.0,
            previous_state_time: 0.0,
            normalized_time: 0.0,
            previous_normalized_time: 0.0,
            is_transitioning: false,
            transition_time: 0.0,
            transition_duration: 0.0,
            playback_direction: 1.0,
            previous_playback_direction: 1.0,
            has_completed: false,
            cycle_wrapped: false,
            transitions_this_frame: 0,
            weight,
        }
    }

    fn cursor(&self) -> Cursor {
        Cursor {
            time: self.state_time,
            direction: self.playback_direction,
            completed: self.has_completed,
        }
    }

    fn previous_cursor(&self) -> Cursor {
        Cursor {
            time: self.previous_state_time,
            direction: self.previous_playback_direction,
            completed: false,
        }
    }

    fn clear_transition(&mut self) {
        self.previous_state = None;
        self.active_transition = None;
        self.is_transitioning = false;
        self.transition_time = 0.0;
        self.transition_duration = 0.0;
    }
}

/// Runtime instance driving one character.
#[derive(Debug)]
pub struct Animator {
    controller: Arc<AnimatorController>,
    cfg: AnimatorConfig,
    params: ParameterTable,
    layers: Vec<LayerState>,

    skeleton: Option<Arc<Skeleton>>,
    binding: MeshBinding,
    bone_count: usize,
    bone_matrices: Vec<Mat4>,
    scratch: Scratch,

    // Events raised outside tick() wait here for the next tick.
    pending: Vec<AnimatorEvent>,
    outputs: Outputs,
    in_tick: bool,
}

impl Animator {
    /// Create an animator over a shared controller. The parameter table is
    /// cloned; every layer starts in its default state.
    pub fn new(controller: Arc<AnimatorController>, cfg: AnimatorConfig) -> Self {
        let layers = controller
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                let default = layer
                    .state(layer.default_state)
                    .map(|_| layer.default_state);
                let weight = if i == 0 {
                    1.0
                } else {
                    layer.weight.clamp(0.0, 1.0)
                };
                LayerState::new(default, weight)
            })
            .collect();
        Self {
            params: controller.parameters.clone(),
            controller,
            cfg,
            layers,
            skeleton: None,
            binding: MeshBinding::default(),
            bone_count: 0,
            bone_matrices: Vec::new(),
            scratch: Scratch::default(),
            pending: Vec::new(),
            outputs: Outputs::default(),
            in_tick: false,
        }
    }

    /// Allocate bone-matrix and scratch buffers for `skeleton` and compute the
    /// initial pose. Bones past `max_bones` are dropped.
    pub fn initialize(&mut self, skeleton: Arc<Skeleton>, binding: MeshBinding) {
        self.bone_count = skeleton.joint_count().min(self.cfg.max_bones);
        self.bone_matrices = vec![Mat4::IDENTITY; self.bone_count];
        self.scratch = Scratch::new(&skeleton);
        self.skeleton = Some(skeleton);
        self.binding = binding;
        self.evaluate_pose();
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.skeleton.is_some()
    }

    /// Advance every layer by `dt` seconds and refresh the bone matrices.
    pub fn tick(&mut self, dt: f32) -> &Outputs {
        self.outputs.clear();
        self.outputs.events.append(&mut self.pending);
        self.in_tick = true;

        let controller = Arc::clone(&self.controller);
        let count = self.active_layer_count();
        for (li, layer) in controller.layers.iter().enumerate().take(count) {
            self.update_layer(li, layer, dt);
        }

        self.in_tick = false;
        self.evaluate_pose();
        &self.outputs
    }

    fn active_layer_count(&self) -> usize {
        self.controller
            .layers
            .len()
            .min(self.layers.len())
            .min(self.cfg.max_layers)
    }

    fn emit(&mut self, event: AnimatorEvent) {
        if self.in_tick {
            self.outputs.push_event(event);
        } else {
            self.pending.push(event);
        }
    }

    fn update_layer(&mut self, li: usize, layer: &AnimatorLayer, dt: f32) {
        self.layers[li].transitions_this_frame = 0;
        self.layers[li].cycle_wrapped = false;

        if let Some(t) = self.pick_transition(li, layer, &layer.any_state_transitions, true) {
            self.take_transition(li, layer, t);
        }

        let ls = &self.layers[li];
        let interruptible = ls.is_transitioning
            && ls
                .active_transition
                .is_some_and(|active| active.can_interrupt_source);
        if interruptible {
            if let Some(state) = ls.current_state.and_then(|id| layer.state(id)) {
                if let Some(t) = self.pick_transition(li, layer, &state.transitions, true) {
                    self.take_transition(li, layer, t);
                }
            }
        }

        self.advance_layer(li, layer, dt);

        // Instant transitions complete immediately, so keep evaluating until a
        // timed blend starts, nothing fires, or the budget is spent.
        loop {
            let ls = &self.layers[li];
            if ls.is_transitioning {
                break;
            }
            let Some(state) = ls.current_state.and_then(|id| layer.state(id)) else {
                break;
            };
            let Some(t) = self.pick_transition(li, layer, &state.transitions, false) else {
                break;
            };
            self.take_transition(li, layer, t);
        }

        let ls = &self.layers[li];
        trace!(
            "layer {li}: state {:?} t={:.3} n={:.3} blending={}",
            ls.current_state,
            ls.state_time,
            ls.normalized_time,
            ls.is_transitioning
        );
    }

    /// First transition in `list` whose gate and conditions pass, unless the
    /// layer's budget for this tick is spent.
    fn pick_transition<'a>(
        &self,
        li: usize,
        layer: &AnimatorLayer,
        list: &'a [AnimatorTransition],
        skip_current: bool,
    ) -> Option<&'a AnimatorTransition> {
        let ls = &self.layers[li];
        if list.is_empty() || ls.transitions_this_frame >= self.cfg.max_transitions_per_frame {
            return None;
        }
        list.iter().find(|t| {
            t.destination.index() < layer.states.len()
                && !(skip_current && ls.current_state == Some(t.destination))
                && t.exit_gate_passes(ls.normalized_time, ls.cycle_wrapped)
                && t.conditions_hold(&self.params, self.cfg.epsilon)
        })
    }

    fn take_transition(&mut self, li: usize, layer: &AnimatorLayer, t: &AnimatorTransition) {
        self.layers[li].transitions_this_frame += 1;
        for c in &t.conditions {
            if self.params.kind(&c.parameter) == Some(ParamKind::Trigger) {
                self.params.reset_trigger(&c.parameter);
            }
        }
        let Some(dest) = layer.state(t.destination) else {
            return;
        };
        let dest_duration = dest.duration();
        let start = if dest_duration > 0.0 {
            t.offset.clamp(0.0, 1.0) * dest_duration
        } else {
            0.0
        };
        debug!(
            "layer {li}: transition {:?} -> '{}' ({:.3}s)",
            self.layers[li]
                .current_state
                .and_then(|id| layer.state(id))
                .map(|s| s.name.as_str()),
            dest.name,
            t.duration
        );
        self.enter_state(li, layer, t.destination, start, ActiveTransition::from_transition(t));
        if self.layers[li].transitions_this_frame >= self.cfg.max_transitions_per_frame {
            debug!("layer {li}: transition budget exhausted for this tick");
        }
    }

    /// Make `dest` current. A positive blend duration keeps the outgoing state
    /// as `previous_state` for the cross-fade; otherwise this is a hard cut.
    fn enter_state(
        &mut self,
        li: usize,
        layer: &AnimatorLayer,
        dest: StateId,
        start_time: f32,
        blend: ActiveTransition,
    ) {
        let dest_duration = layer.state(dest).map_or(0.0, AnimatorState::duration);
        let ls = &mut self.layers[li];
        if blend.duration > 0.0 && ls.current_state.is_some() {
            ls.previous_state = ls.current_state;
            ls.previous_state_time = ls.state_time;
            ls.previous_normalized_time = ls.normalized_time;
            ls.previous_playback_direction = ls.playback_direction;
            ls.is_transitioning = true;
            ls.transition_time = 0.0;
            ls.transition_duration = blend.duration;
            ls.active_transition = Some(blend);
        } else {
            ls.clear_transition();
        }
        ls.current_state = Some(dest);
        ls.state_time = start_time;
        ls.normalized_time = if dest_duration > 0.0 {
            start_time / dest_duration
        } else {
            0.0
        };
        ls.playback_direction = 1.0;
        ls.has_completed = false;
        ls.cycle_wrapped = false;
        self.emit(AnimatorEvent::StateStarted {
            layer: li,
            state: dest,
        });
    }

    fn effective_speed(&self, state: &AnimatorState) -> f32 {
        let modulation = state
            .speed_parameter
            .as_deref()
            .and_then(|p| self.params.get_float(p))
            .unwrap_or(1.0);
        state.speed * modulation
    }

    fn advance_layer(&mut self, li: usize, layer: &AnimatorLayer, dt: f32) {
        let ls = &self.layers[li];
        if let Some((id, state)) = ls
            .current_state
            .and_then(|id| layer.state(id).map(|s| (id, s)))
        {
            let duration = state.duration();
            let delta = dt * self.effective_speed(state) * ls.playback_direction;
            let step = playback::advance(ls.cursor(), delta, duration, state.loop_mode);
            let ls = &mut self.layers[li];
            ls.state_time = step.cursor.time;
            ls.playback_direction = step.cursor.direction;
            ls.has_completed = step.cursor.completed;
            ls.cycle_wrapped = step.wrapped;
            if duration > 0.0 {
                ls.normalized_time = ls.state_time / duration;
            }
            if step.completed_now {
                self.emit(AnimatorEvent::StateCompleted {
                    layer: li,
                    state: id,
                });
            }
        }

        if !self.layers[li].is_transitioning {
            return;
        }
        let ls = &self.layers[li];
        if let Some(prev) = ls.previous_state.and_then(|id| layer.state(id)) {
            let duration = prev.duration();
            let delta = dt * self.effective_speed(prev) * ls.previous_playback_direction;
            let step = playback::advance(ls.previous_cursor(), delta, duration, prev.loop_mode);
            let ls = &mut self.layers[li];
            ls.previous_state_time = step.cursor.time;
            ls.previous_playback_direction = step.cursor.direction;
            if duration > 0.0 {
                ls.previous_normalized_time = ls.previous_state_time / duration;
            }
        }
        let ls = &mut self.layers[li];
        ls.transition_time += dt.max(0.0);
        if ls.transition_time >= ls.transition_duration {
            ls.clear_transition();
        }
    }

    fn evaluate_pose(&mut self) {
        let Some(skeleton) = self.skeleton.clone() else {
            return;
        };
        let controller = Arc::clone(&self.controller);
        let count = self.active_layer_count();

        let s = &mut self.scratch;
        s.working.copy_from_slice(&s.rest_model);

        for (li, layer) in controller.layers.iter().enumerate().take(count) {
            let ls = &self.layers[li];
            if li > 0 && ls.weight <= 0.0 {
                continue;
            }
            if !sample_layer(&skeleton, layer, ls, &mut self.scratch) {
                continue;
            }
            let s = &mut self.scratch;
            if li == 0 {
                s.working.copy_from_slice(&s.layer_pose);
            } else {
                compose_layer(layer, ls.weight, &mut s.working, &s.layer_pose);
            }
        }

        let working = &self.scratch.working;
        for (i, out) in self.bone_matrices.iter_mut().enumerate() {
            let inverse_bind = self
                .binding
                .inverse_bind_matrices
                .get(i)
                .copied()
                .unwrap_or(Mat4::IDENTITY);
            let pose = working.get(i).copied().unwrap_or(Mat4::IDENTITY);
            *out = self.binding.node_transform * pose * inverse_bind;
        }
    }
}

fn sample_state(
    skeleton: &Skeleton,
    state: &AnimatorState,
    ratio: f32,
    rest_locals: &[Transform],
    rest_model: &[Mat4],
    locals: &mut [Transform],
    out: &mut [Mat4],
) {
    match &state.clip {
        Some(clip) => {
            locals.copy_from_slice(rest_locals);
            clip.sample(ratio.clamp(0.0, 1.0), locals);
            local_to_model(skeleton, locals, out);
        }
        None => out.copy_from_slice(rest_model),
    }
}

/// Sample a layer into `s.layer_pose`. Returns false if the layer has no
/// current state.
fn sample_layer(skeleton: &Skeleton, layer: &AnimatorLayer, ls: &LayerState, s: &mut Scratch) -> bool {
    let Some(current) = ls.current_state.and_then(|id| layer.state(id)) else {
        return false;
    };
    sample_state(
        skeleton,
        current,
        ls.normalized_time,
        &s.rest_locals,
        &s.rest_model,
        &mut s.locals,
        &mut s.pose_a,
    );
    let previous = if ls.is_transitioning && ls.transition_duration > 0.0 {
        ls.previous_state.and_then(|id| layer.state(id))
    } else {
        None
    };
    match previous {
        Some(prev) => {
            sample_state(
                skeleton,
                prev,
                ls.previous_normalized_time,
                &s.rest_locals,
                &s.rest_model,
                &mut s.locals,
                &mut s.pose_b,
            );
            let curve = ls.active_transition.map_or(EasingCurve::Linear, |a| a.curve);
            let weight = curve.evaluate(ls.transition_time / ls.transition_duration);
            lerp_poses_into(&mut s.layer_pose, &s.pose_b, &s.pose_a, weight);
        }
        None => s.layer_pose.copy_from_slice(&s.pose_a),
    }
    true
}

fn compose_layer(layer: &AnimatorLayer, weight: f32, working: &mut [Mat4], layer_pose: &[Mat4]) {
    for (i, (out, pose)) in working.iter_mut().zip(layer_pose).enumerate() {
        let w = weight * layer.bone_mask.as_ref().map_or(1.0, |m| m.weight(i));
        if w <= 0.0 {
            continue;
        }
        *out = match layer.blend_mode {
            BlendMode::Override => lerp_mat4(out, pose, w),
            BlendMode::Additive => add_scaled_delta(out, pose, w),
        };
    }
}

// Playback control and parameter access. Invalid layer or state indices are
// ignored; effects become visible on the next tick.
impl Animator {
    pub fn set_float(&mut self, name: &str, value: f32) {
        self.params.set_float(name, value);
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.params.set_int(name, value);
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.params.set_bool(name, value);
    }

    pub fn set_trigger(&mut self, name: &str) {
        self.params.set_trigger(name);
    }

    pub fn reset_trigger(&mut self, name: &str) {
        self.params.reset_trigger(name);
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.params.get_float(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.params.get_int(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.params.get_bool(name)
    }

    #[inline]
    pub fn parameters(&self) -> &ParameterTable {
        &self.params
    }

    /// Hard cut to `state`: resets time and drops any blend.
    pub fn play(&mut self, state: StateId, layer: usize) {
        let controller = Arc::clone(&self.controller);
        let Some(l) = controller.layer(layer) else {
            return;
        };
        if layer >= self.layers.len() || l.state(state).is_none() {
            return;
        }
        debug!("layer {layer}: play {:?}", state);
        self.enter_state(layer, l, state, 0.0, ActiveTransition::cut());
    }

    /// Start a timed blend from the current state to `state`.
    pub fn cross_fade(&mut self, state: StateId, duration: f32, layer: usize, curve: EasingCurve) {
        let controller = Arc::clone(&self.controller);
        let Some(l) = controller.layer(layer) else {
            return;
        };
        if layer >= self.layers.len() || l.state(state).is_none() {
            return;
        }
        debug!("layer {layer}: cross-fade to {:?} over {duration:.3}s", state);
        self.enter_state(
            layer,
            l,
            state,
            0.0,
            ActiveTransition {
                duration,
                curve,
                can_interrupt_source: false,
            },
        );
    }

    pub fn set_layer_weight(&mut self, layer: usize, weight: f32) {
        if let Some(ls) = self.layers.get_mut(layer) {
            ls.weight = if weight.is_finite() {
                weight.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
    }

    pub fn layer_weight(&self, layer: usize) -> Option<f32> {
        self.layers.get(layer).map(|ls| ls.weight)
    }

    #[inline]
    pub fn layer_state(&self, layer: usize) -> Option<&LayerState> {
        self.layers.get(layer)
    }

    pub fn state_id(&self, layer: usize, name: &str) -> Option<StateId> {
        self.controller.layer(layer)?.state_id(name)
    }

    pub fn current_state(&self, layer: usize) -> Option<StateId> {
        self.layers.get(layer)?.current_state
    }

    pub fn current_state_name(&self, layer: usize) -> Option<&str> {
        let id = self.current_state(layer)?;
        self.controller
            .layer(layer)?
            .state(id)
            .map(|s| s.name.as_str())
    }

    pub fn state_time(&self, layer: usize) -> f32 {
        self.layers.get(layer).map_or(0.0, |ls| ls.state_time)
    }

    pub fn normalized_time(&self, layer: usize) -> f32 {
        self.layers.get(layer).map_or(0.0, |ls| ls.normalized_time)
    }

    pub fn is_in_transition(&self, layer: usize) -> bool {
        self.layers.get(layer).is_some_and(|ls| ls.is_transitioning)
    }

    pub fn has_state_completed(&self, layer: usize) -> bool {
        self.layers.get(layer).is_some_and(|ls| ls.has_completed)
    }

    /// Skinning matrices, one per active bone.
    #[inline]
    pub fn bone_matrices(&self) -> &[Mat4] {
        &self.bone_matrices
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bone_count
    }

    /// Model-space pose of the last evaluation (all joints, before skinning).
    #[inline]
    pub fn model_pose(&self) -> &[Mat4] {
        &self.scratch.working
    }

    #[inline]
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    #[inline]
    pub fn controller(&self) -> &Arc<AnimatorController> {
        &self.controller
    }

    #[inline]
    pub fn config(&self) -> &AnimatorConfig {
        &self.cfg
    }
}
