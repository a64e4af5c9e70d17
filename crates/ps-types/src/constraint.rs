//! Constraint definitions for ranking task executions.
//!
//! A constraint is a real-valued robustness function over the task's input
//! and output: a positive value means the constraint is satisfied. Its
//! enums describe what happens to the scoring objective, what a failure
//! means, and whether success retires the constraint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::controller::RobustnessController;

/// What happens to a constraint once it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SuccessAction {
    /// Mark succeeded but keep the constraint active.
    #[default]
    None,
    /// Deactivate the whole group the constraint belongs to.
    Deactivate,
}

/// The severity of a negative robustness value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailureKind {
    /// Negative robustness is tolerated and not recorded as a failure.
    #[default]
    None,
    /// Recorded as a soft failure: undesirable but not disqualifying.
    Soft,
    /// Recorded as a hard failure: disqualifying, deactivates the group.
    Hard,
}

/// How the robustness value contributes to the scoring objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectiveImpact {
    /// No contribution.
    #[default]
    None,
    /// Contributes the signed robustness.
    Signed,
    /// Contributes the absolute robustness.
    Unsigned,
}

impl fmt::Display for SuccessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Deactivate => write!(f, "DEACTIVATE"),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Soft => write!(f, "SOFT"),
            Self::Hard => write!(f, "HARD"),
        }
    }
}

impl fmt::Display for ObjectiveImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Signed => write!(f, "SIGNED"),
            Self::Unsigned => write!(f, "UNSIGNED"),
        }
    }
}

/// A constraint on the input and output of a task, expressed as
/// `f(input, output) > 0`.
///
/// Immutable after construction except for its robustness controller,
/// which is advanced once per iteration on the chosen best trajectory.
pub struct Constraint<I, O> {
    name: String,
    group_id: u64,
    success_action: SuccessAction,
    failure_kind: FailureKind,
    objective_impact: ObjectiveImpact,
    func: Arc<dyn Fn(&I, &O) -> f64 + Send + Sync>,
    controller: RobustnessController<I, O>,
}

impl<I, O> Constraint<I, O> {
    /// Start building a constraint around its robustness function.
    pub fn builder(
        func: impl Fn(&I, &O) -> f64 + Send + Sync + 'static,
    ) -> ConstraintBuilder<I, O> {
        ConstraintBuilder {
            name: String::new(),
            group_id: 0,
            success_action: SuccessAction::default(),
            failure_kind: FailureKind::default(),
            objective_impact: ObjectiveImpact::default(),
            func: Arc::new(func),
            controller: RobustnessController::Identity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    pub fn success_action(&self) -> SuccessAction {
        self.success_action
    }

    pub fn failure_kind(&self) -> FailureKind {
        self.failure_kind
    }

    pub fn objective_impact(&self) -> ObjectiveImpact {
        self.objective_impact
    }

    /// The degree of satisfaction given `input` and `output`, with the
    /// controller previewed (no state change).
    pub fn robustness(&self, input: &I, output: &O) -> f64 {
        let raw = (self.func)(input, output);
        self.controller.preview(raw, input, output)
    }

    /// The degree of satisfaction with the controller advanced.
    pub fn robustness_updating(&mut self, input: &I, output: &O) -> f64 {
        let raw = (self.func)(input, output);
        self.controller.advance(raw, input, output)
    }
}

impl<I, O> Clone for Constraint<I, O> {
    /// The robustness function is shared; the controller clone starts a
    /// fresh trajectory.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            group_id: self.group_id,
            success_action: self.success_action,
            failure_kind: self.failure_kind,
            objective_impact: self.objective_impact,
            func: Arc::clone(&self.func),
            controller: self.controller.clone(),
        }
    }
}

impl<I, O> fmt::Debug for Constraint<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("group_id", &self.group_id)
            .field("success_action", &self.success_action)
            .field("failure_kind", &self.failure_kind)
            .field("objective_impact", &self.objective_impact)
            .field("controller", &self.controller)
            .finish()
    }
}

impl<I, O> fmt::Display for Constraint<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{'{}', group {}, {}/{}/{}}}",
            self.name, self.group_id, self.success_action, self.failure_kind, self.objective_impact
        )
    }
}

/// Builder for [`Constraint`]; every option has a default except the
/// robustness function itself.
pub struct ConstraintBuilder<I, O> {
    name: String,
    group_id: u64,
    success_action: SuccessAction,
    failure_kind: FailureKind,
    objective_impact: ObjectiveImpact,
    func: Arc<dyn Fn(&I, &O) -> f64 + Send + Sync>,
    controller: RobustnessController<I, O>,
}

impl<I, O> ConstraintBuilder<I, O> {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn group_id(mut self, group_id: u64) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn success_action(mut self, action: SuccessAction) -> Self {
        self.success_action = action;
        self
    }

    pub fn failure_kind(mut self, kind: FailureKind) -> Self {
        self.failure_kind = kind;
        self
    }

    pub fn objective_impact(mut self, impact: ObjectiveImpact) -> Self {
        self.objective_impact = impact;
        self
    }

    pub fn controller(mut self, controller: impl Into<RobustnessController<I, O>>) -> Self {
        self.controller = controller.into();
        self
    }

    pub fn build(self) -> Constraint<I, O> {
        Constraint {
            name: self.name,
            group_id: self.group_id,
            success_action: self.success_action,
            failure_kind: self.failure_kind,
            objective_impact: self.objective_impact,
            func: self.func,
            controller: self.controller,
        }
    }
}
