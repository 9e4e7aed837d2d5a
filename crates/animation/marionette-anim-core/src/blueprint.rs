//! Authored animation graph: controller, layers, states, transitions.
//!
//! A blueprint is built once at load time and shared by every animator through
//! `Arc`; nothing in here is mutated while animators tick.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clip::ClipSampler;
use crate::easing::EasingCurve;
use crate::error::BlueprintError;
use crate::ids::StateId;
use crate::params::{Comparator, Condition, ParamKind, ParameterTable};
use crate::playback::LoopMode;
use crate::skeleton::Skeleton;

pub const DEFAULT_TRANSITION_DURATION: f32 = 0.25;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Override,
    Additive,
}

/// Per-joint layer weights in [0,1]. Joints past the end weigh 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneMask {
    weights: Vec<f32>,
}

impl BoneMask {
    pub fn empty(joint_count: usize) -> Self {
        Self {
            weights: vec![0.0; joint_count],
        }
    }

    pub fn from_weights(weights: Vec<f32>) -> Self {
        Self {
            weights: weights.into_iter().map(|w| w.clamp(0.0, 1.0)).collect(),
        }
    }

    /// Mask covering `root` and all of its descendants (e.g. an upper-body mask
    /// rooted at the spine).
    pub fn from_subtree(skeleton: &Skeleton, root: usize) -> Self {
        let mut weights = vec![0.0; skeleton.joint_count()];
        for (idx, joint) in skeleton.joints.iter().enumerate() {
            let inside = idx == root
                || joint
                    .parent
                    .is_some_and(|p| p < idx && weights[p] > 0.0);
            if inside {
                weights[idx] = 1.0;
            }
        }
        Self { weights }
    }

    pub fn set(&mut self, joint: usize, weight: f32) {
        if joint >= self.weights.len() {
            self.weights.resize(joint + 1, 0.0);
        }
        self.weights[joint] = weight.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn weight(&self, joint: usize) -> f32 {
        self.weights.get(joint).copied().unwrap_or(0.0)
    }
}

/// Guarded edge towards another state of the same layer.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatorTransition {
    pub destination: StateId,
    /// Logical AND of all conditions; empty means always.
    pub conditions: Vec<Condition>,
    /// Cross-fade length in seconds; `<= 0` is an instant cut.
    pub duration: f32,
    pub has_exit_time: bool,
    /// Normalized time of the source state at which the transition may fire.
    pub exit_time: f32,
    /// Normalized start time of the destination state.
    pub offset: f32,
    pub curve: EasingCurve,
    /// Whether the source state's transitions may redirect this blend mid-flight.
    pub can_interrupt_source: bool,
    /// Higher fires first; equal priorities keep authored order.
    pub priority: i32,
}

impl AnimatorTransition {
    pub fn to(destination: StateId) -> Self {
        Self {
            destination,
            conditions: Vec::new(),
            duration: DEFAULT_TRANSITION_DURATION,
            has_exit_time: false,
            exit_time: 1.0,
            offset: 0.0,
            curve: EasingCurve::Linear,
            can_interrupt_source: false,
            priority: 0,
        }
    }

    pub fn when(mut self, parameter: &str, comparator: Comparator, threshold: f32) -> Self {
        self.conditions
            .push(Condition::new(parameter, comparator, threshold));
        self
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_exit_time(mut self, normalized: f32) -> Self {
        self.has_exit_time = true;
        self.exit_time = normalized;
        self
    }

    pub fn with_offset(mut self, normalized: f32) -> Self {
        self.offset = normalized;
        self
    }

    pub fn with_curve(mut self, curve: EasingCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn interruptible(mut self) -> Self {
        self.can_interrupt_source = true;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// `wrapped` reports that the cursor ran through the end of its cycle
    /// during the last advance, which satisfies any gate up to 1.0.
    #[inline]
    pub fn exit_gate_passes(&self, normalized_time: f32, wrapped: bool) -> bool {
        !self.has_exit_time
            || normalized_time >= self.exit_time
            || (wrapped && self.exit_time <= 1.0)
    }

    #[inline]
    pub fn conditions_hold(&self, params: &ParameterTable, epsilon: f32) -> bool {
        self.conditions.iter().all(|c| c.evaluate(params, epsilon))
    }
}

/// Insert keeping descending priority; ties land after existing entries.
fn insert_by_priority(list: &mut Vec<AnimatorTransition>, transition: AnimatorTransition) {
    let pos = list
        .iter()
        .position(|t| t.priority < transition.priority)
        .unwrap_or(list.len());
    list.insert(pos, transition);
}

#[derive(Clone, Debug)]
pub struct AnimatorState {
    pub name: String,
    /// `None` is a valid idle placeholder.
    pub clip: Option<Arc<dyn ClipSampler>>,
    pub speed: f32,
    /// Float parameter multiplied into `speed` every tick.
    pub speed_parameter: Option<String>,
    pub loop_mode: LoopMode,
    pub transitions: Vec<AnimatorTransition>,
}

impl AnimatorState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clip: None,
            speed: 1.0,
            speed_parameter: None,
            loop_mode: LoopMode::Loop,
            transitions: Vec::new(),
        }
    }

    pub fn with_clip(mut self, clip: Arc<dyn ClipSampler>) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_speed_parameter(mut self, parameter: &str) -> Self {
        self.speed_parameter = Some(parameter.to_string());
        self
    }

    pub fn with_loop_mode(mut self, mode: LoopMode) -> Self {
        self.loop_mode = mode;
        self
    }

    /// Clip duration, or 0 when there is no clip.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.clip.as_ref().map_or(0.0, |c| c.duration())
    }
}

#[derive(Clone, Debug)]
pub struct AnimatorLayer {
    pub name: String,
    pub states: Vec<AnimatorState>,
    pub default_state: StateId,
    /// Evaluated from every state before the current state's own transitions.
    pub any_state_transitions: Vec<AnimatorTransition>,
    pub weight: f32,
    pub blend_mode: BlendMode,
    pub bone_mask: Option<BoneMask>,
}

impl AnimatorLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            default_state: StateId(0),
            any_state_transitions: Vec::new(),
            weight: 1.0,
            blend_mode: BlendMode::Override,
            bone_mask: None,
        }
    }

    pub fn add_state(&mut self, state: AnimatorState) -> StateId {
        self.states.push(state);
        StateId::from(self.states.len() - 1)
    }

    /// Add an ordinary transition leaving `from`. Returns false if `from` is unknown.
    pub fn add_transition(&mut self, from: StateId, transition: AnimatorTransition) -> bool {
        match self.states.get_mut(from.index()) {
            Some(state) => {
                insert_by_priority(&mut state.transitions, transition);
                true
            }
            None => false,
        }
    }

    pub fn add_any_state_transition(&mut self, transition: AnimatorTransition) {
        insert_by_priority(&mut self.any_state_transitions, transition);
    }

    pub fn with_default_state(mut self, state: StateId) -> Self {
        self.default_state = state;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    pub fn with_bone_mask(mut self, mask: BoneMask) -> Self {
        self.bone_mask = Some(mask);
        self
    }

    #[inline]
    pub fn state(&self, id: StateId) -> Option<&AnimatorState> {
        self.states.get(id.index())
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .position(|s| s.name == name)
            .map(StateId::from)
    }
}

/// Ordered layers plus the parameter schema every animator clones.
#[derive(Clone, Debug, Default)]
pub struct AnimatorController {
    pub layers: Vec<AnimatorLayer>,
    pub parameters: ParameterTable,
}

impl AnimatorController {
    pub fn new(parameters: ParameterTable) -> Self {
        Self {
            layers: Vec::new(),
            parameters,
        }
    }

    pub fn with_layer(mut self, layer: AnimatorLayer) -> Self {
        self.layers.push(layer);
        self
    }

    #[inline]
    pub fn layer(&self, index: usize) -> Option<&AnimatorLayer> {
        self.layers.get(index)
    }

    /// Reject dangling references and mistyped conditions. Optional: the
    /// runtime treats the same problems as silent no-ops.
    pub fn validate(&self) -> Result<(), BlueprintError> {
        if self.layers.is_empty() {
            return Err(BlueprintError::NoLayers);
        }
        for (li, layer) in self.layers.iter().enumerate() {
            if !(0.0..=1.0).contains(&layer.weight) {
                return Err(BlueprintError::WeightOutOfRange {
                    layer: li,
                    weight: layer.weight,
                });
            }
            if layer.states.is_empty() {
                continue;
            }
            if layer.default_state.index() >= layer.states.len() {
                return Err(BlueprintError::DefaultStateOutOfRange {
                    layer: li,
                    state: layer.default_state.0,
                });
            }
            for state in &layer.states {
                if let Some(param) = &state.speed_parameter {
                    if self.parameters.kind(param) != Some(ParamKind::Float) {
                        return Err(BlueprintError::SpeedParameterNotFloat {
                            layer: li,
                            state: state.name.clone(),
                            parameter: param.clone(),
                        });
                    }
                }
                for t in &state.transitions {
                    self.validate_transition(li, layer, &state.name, t)?;
                }
            }
            for t in &layer.any_state_transitions {
                self.validate_transition(li, layer, "<any>", t)?;
            }
        }
        Ok(())
    }

    fn validate_transition(
        &self,
        li: usize,
        layer: &AnimatorLayer,
        from: &str,
        t: &AnimatorTransition,
    ) -> Result<(), BlueprintError> {
        if t.destination.index() >= layer.states.len() {
            return Err(BlueprintError::DanglingTransition {
                layer: li,
                from: from.to_string(),
                destination: t.destination.0,
            });
        }
        for (field, value) in [("exit_time", t.exit_time), ("offset", t.offset)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BlueprintError::RatioOutOfRange {
                    layer: li,
                    from: from.to_string(),
                    field,
                    value,
                });
            }
        }
        for c in &t.conditions {
            let Some(kind) = self.parameters.kind(&c.parameter) else {
                return Err(BlueprintError::UnknownParameter {
                    layer: li,
                    parameter: c.parameter.clone(),
                });
            };
            if !c.comparator.applies_to(kind) {
                return Err(BlueprintError::ComparatorMismatch {
                    layer: li,
                    parameter: c.parameter.clone(),
                    comparator: format!("{:?}", c.comparator),
                    kind: format!("{kind:?}"),
                });
            }
        }
        Ok(())
    }
}
