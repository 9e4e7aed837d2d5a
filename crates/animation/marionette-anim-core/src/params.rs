//! Named, typed parameters driving transition guards and state speed.
//!
//! A controller owns the schema; every [`Animator`](crate::animator::Animator)
//! clones it so runtime values stay per-character.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    Float,
    Int,
    Bool,
    /// Edge-latched bool, cleared when a transition consumes it.
    Trigger,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ParamValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Trigger(bool),
}

impl ParamValue {
    #[inline]
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Trigger(_) => ParamKind::Trigger,
        }
    }

    /// Zero value for a kind.
    pub fn default_for(kind: ParamKind) -> Self {
        match kind {
            ParamKind::Float => ParamValue::Float(0.0),
            ParamKind::Int => ParamValue::Int(0),
            ParamKind::Bool => ParamValue::Bool(false),
            ParamKind::Trigger => ParamValue::Trigger(false),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParamValue,
}

/// Name-indexed parameter store with O(1) lookup.
#[derive(Clone, Debug, Default)]
pub struct ParameterTable {
    index: HashMap<String, usize>,
    slots: Vec<Parameter>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter. Re-declaring a name replaces its kind and value.
    pub fn declare(&mut self, name: &str, value: ParamValue) {
        if let Some(&idx) = self.index.get(name) {
            self.slots[idx].value = value;
            return;
        }
        self.index.insert(name.to_string(), self.slots.len());
        self.slots.push(Parameter {
            name: name.to_string(),
            value,
        });
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.declare(name, value);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.index.get(name).map(|&i| &self.slots[i].value)
    }

    pub fn kind(&self, name: &str) -> Option<ParamKind> {
        self.get(name).map(ParamValue::kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.slots.iter()
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut ParamValue> {
        let idx = *self.index.get(name)?;
        Some(&mut self.slots[idx].value)
    }

    /// Returns false (and changes nothing) when the name is unknown or not a float.
    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        match self.slot_mut(name) {
            Some(ParamValue::Float(v)) => {
                *v = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        match self.slot_mut(name) {
            Some(ParamValue::Int(v)) => {
                *v = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> bool {
        match self.slot_mut(name) {
            Some(ParamValue::Bool(v)) => {
                *v = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_trigger(&mut self, name: &str) -> bool {
        match self.slot_mut(name) {
            Some(ParamValue::Trigger(v)) => {
                *v = true;
                true
            }
            _ => false,
        }
    }

    pub fn reset_trigger(&mut self, name: &str) -> bool {
        match self.slot_mut(name) {
            Some(ParamValue::Trigger(v)) => {
                *v = false;
                true
            }
            _ => false,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Bool value; triggers read as their latched state.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ParamValue::Bool(v) | ParamValue::Trigger(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// Bool or trigger is set.
    If,
    /// Bool or trigger is clear.
    IfNot,
    Greater,
    Less,
    Equals,
    NotEqual,
}

impl Comparator {
    /// Whether this comparator is meaningful for a parameter kind.
    pub fn applies_to(self, kind: ParamKind) -> bool {
        match self {
            Comparator::If | Comparator::IfNot => {
                matches!(kind, ParamKind::Bool | ParamKind::Trigger)
            }
            Comparator::Greater | Comparator::Less => {
                matches!(kind, ParamKind::Float | ParamKind::Int)
            }
            Comparator::Equals | Comparator::NotEqual => {
                matches!(kind, ParamKind::Float | ParamKind::Int)
            }
        }
    }
}

/// `(parameter, comparator, threshold)` guard of a transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub parameter: String,
    pub comparator: Comparator,
    #[serde(default)]
    pub threshold: f32,
}

impl Condition {
    pub fn new(parameter: impl Into<String>, comparator: Comparator, threshold: f32) -> Self {
        Self {
            parameter: parameter.into(),
            comparator,
            threshold,
        }
    }

    /// Evaluate against a table. Unknown parameters and kind mismatches are false.
    /// Int parameters compare against the threshold rounded to the nearest integer.
    pub fn evaluate(&self, params: &ParameterTable, epsilon: f32) -> bool {
        let Some(value) = params.get(&self.parameter) else {
            return false;
        };
        match (*value, self.comparator) {
            (ParamValue::Bool(b) | ParamValue::Trigger(b), Comparator::If) => b,
            (ParamValue::Bool(b) | ParamValue::Trigger(b), Comparator::IfNot) => !b,
            (ParamValue::Float(v), Comparator::Greater) => v > self.threshold,
            (ParamValue::Float(v), Comparator::Less) => v < self.threshold,
            (ParamValue::Float(v), Comparator::Equals) => (v - self.threshold).abs() <= epsilon,
            (ParamValue::Float(v), Comparator::NotEqual) => (v - self.threshold).abs() > epsilon,
            (ParamValue::Int(v), cmp) => {
                let th = self.threshold.round() as i32;
                match cmp {
                    Comparator::Greater => v > th,
                    Comparator::Less => v < th,
                    Comparator::Equals => v == th,
                    Comparator::NotEqual => v != th,
                    Comparator::If | Comparator::IfNot => false,
                }
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ParameterTable {
        ParameterTable::new()
            .with("speed", ParamValue::Float(0.0))
            .with("combo", ParamValue::Int(0))
            .with("grounded", ParamValue::Bool(true))
            .with("jump", ParamValue::Trigger(false))
    }

    #[test]
    fn setters_respect_kind() {
        let mut p = table();
        assert!(p.set_float("speed", 2.5));
        assert!(!p.set_float("combo", 1.0));
        assert!(!p.set_int("missing", 1));
        assert_eq!(p.get_float("speed"), Some(2.5));
        assert_eq!(p.get_int("combo"), Some(0));
        assert_eq!(p.get_float("combo"), None);
    }

    #[test]
    fn trigger_latches_until_reset() {
        let mut p = table();
        assert_eq!(p.get_bool("jump"), Some(false));
        p.set_trigger("jump");
        assert_eq!(p.get_bool("jump"), Some(true));
        p.reset_trigger("jump");
        assert_eq!(p.get_bool("jump"), Some(false));
    }

    #[test]
    fn conditions_cover_each_kind() {
        let mut p = table();
        p.set_float("speed", 1.5);
        p.set_int("combo", 3);
        let eps = 1e-5;
        assert!(Condition::new("speed", Comparator::Greater, 1.0).evaluate(&p, eps));
        assert!(!Condition::new("speed", Comparator::Less, 1.0).evaluate(&p, eps));
        assert!(Condition::new("speed", Comparator::Equals, 1.5).evaluate(&p, eps));
        assert!(Condition::new("combo", Comparator::Equals, 3.0).evaluate(&p, eps));
        assert!(Condition::new("combo", Comparator::NotEqual, 2.0).evaluate(&p, eps));
        assert!(Condition::new("grounded", Comparator::If, 0.0).evaluate(&p, eps));
        assert!(!Condition::new("jump", Comparator::If, 0.0).evaluate(&p, eps));
        assert!(Condition::new("jump", Comparator::IfNot, 0.0).evaluate(&p, eps));
        assert!(!Condition::new("nope", Comparator::IfNot, 0.0).evaluate(&p, eps));
        assert!(!Condition::new("speed", Comparator::If, 0.0).evaluate(&p, eps));
    }

    #[test]
    fn clones_are_independent() {
        let shared = table();
        let mut a = shared.clone();
        let b = shared.clone();
        a.set_bool("grounded", false);
        assert_eq!(a.get_bool("grounded"), Some(false));
        assert_eq!(b.get_bool("grounded"), Some(true));
    }

    #[test]
    fn redeclare_replaces_value() {
        let mut p = table();
        p.declare("speed", ParamValue::Int(4));
        assert_eq!(p.len(), 4);
        assert_eq!(p.kind("speed"), Some(ParamKind::Int));
    }
}
