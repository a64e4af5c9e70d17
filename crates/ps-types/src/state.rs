//! Constraint life-state tracking across iterations.

use std::collections::BTreeSet;
use std::fmt;

use crate::constraint::{Constraint, FailureKind, ObjectiveImpact, SuccessAction};
use crate::errors::{ConstraintSnapshot, EngineError, EngineResult};
use crate::score::Score;

/// A constraint together with its life-state for the current evaluation
/// stream.
///
/// A state is never both succeeded and failed; once deactivated it stays
/// inactive for the remainder of the stream. The wrapped constraint
/// remains readable regardless of activity.
#[derive(Debug, Clone)]
pub struct ConstraintState<I, O> {
    constraint: Constraint<I, O>,
    active: bool,
    succeeded: bool,
    failed: bool,
}

impl<I, O> ConstraintState<I, O> {
    fn new(constraint: Constraint<I, O>) -> Self {
        Self {
            constraint,
            active: true,
            succeeded: false,
            failed: false,
        }
    }

    pub fn constraint(&self) -> &Constraint<I, O> {
        &self.constraint
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    fn set_success(&mut self) {
        debug_assert!(!self.failed, "a constraint cannot succeed after failing");
        self.succeeded = true;
    }

    fn set_failure(&mut self) {
        debug_assert!(!self.succeeded, "a constraint cannot fail after succeeding");
        self.failed = true;
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    /// Whether this state still participates in evaluation.
    fn is_pending(&self) -> bool {
        self.active && !self.succeeded && !self.failed
    }

    pub fn snapshot(&self) -> ConstraintSnapshot {
        ConstraintSnapshot {
            name: self.constraint.name().to_string(),
            group_id: self.constraint.group_id(),
            active: self.active,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}

impl<I, O> fmt::Display for ConstraintState<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}: active={}, succeeded={}, failed={}}}",
            self.constraint, self.active, self.succeeded, self.failed
        )
    }
}

/// The ordered collection of constraint states for one evaluation stream,
/// plus the count of those still active.
///
/// Constructed once from a constraint list and mutated only through
/// [`ConstrainingState::update_from`], which is called exactly once per
/// iteration with the chosen best output.
#[derive(Debug, Clone)]
pub struct ConstrainingState<I, O> {
    states: Vec<ConstraintState<I, O>>,
    num_active: usize,
}

impl<I, O> ConstrainingState<I, O> {
    pub fn new(constraints: Vec<Constraint<I, O>>) -> Self {
        let num_active = constraints.len();
        Self {
            states: constraints.into_iter().map(ConstraintState::new).collect(),
            num_active,
        }
    }

    pub fn states(&self) -> &[ConstraintState<I, O>] {
        &self.states
    }

    pub fn num_active(&self) -> usize {
        self.num_active
    }

    pub fn is_inactive(&self) -> bool {
        self.num_active == 0
    }

    /// True when the state was built without any constraints at all.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The constraints still active, in order.
    pub fn active_constraints(&self) -> Vec<&Constraint<I, O>> {
        self.states
            .iter()
            .filter(|s| s.active)
            .map(|s| &s.constraint)
            .collect()
    }

    /// Clones of all constraints, in construction order.
    pub fn constraints(&self) -> Vec<Constraint<I, O>> {
        self.states.iter().map(|s| s.constraint.clone()).collect()
    }

    pub fn snapshot(&self) -> Vec<ConstraintSnapshot> {
        self.states.iter().map(|s| s.snapshot()).collect()
    }

    /// Score `output` against the pending constraints without touching any
    /// controller state. Safe to call concurrently from worker threads.
    pub fn evaluate(&self, input: &I, output: &O) -> EngineResult<Score> {
        if self.is_inactive() {
            return Err(EngineError::NoActiveConstraints {
                states: self.snapshot(),
            });
        }
        let mut tally = ScoreTally::default();
        for (index, state) in self.states.iter().enumerate() {
            if state.is_pending() {
                let robustness = state.constraint.robustness(input, output);
                tally.record(index, robustness, &state.constraint);
            }
        }
        Ok(tally.into_score())
    }

    /// The authoritative state transition, applied once per iteration with
    /// the chosen best output.
    ///
    /// Re-scores the pending constraints with controller updates enabled,
    /// then marks successes and hard failures and deactivates every
    /// constraint whose group was flagged, including those the first pass
    /// had already visited.
    pub fn update_from(&mut self, input: &I, output: &O) -> EngineResult<()> {
        if self.is_inactive() {
            return Err(EngineError::NoActiveConstraints {
                states: self.snapshot(),
            });
        }
        let mut tally = ScoreTally::default();
        for (index, state) in self.states.iter_mut().enumerate() {
            if state.is_pending() {
                let robustness = state.constraint.robustness_updating(input, output);
                tally.record(index, robustness, &state.constraint);
            }
        }
        let eval = tally.into_score();

        let mut groups_to_deactivate: BTreeSet<u64> = BTreeSet::new();
        for (index, state) in self.states.iter_mut().enumerate() {
            if eval.successes().contains(&index) {
                state.set_success();
                if state.constraint.success_action() == SuccessAction::Deactivate {
                    groups_to_deactivate.insert(state.constraint.group_id());
                }
            }
            if eval.hard_failures().contains(&index) {
                state.set_failure();
                groups_to_deactivate.insert(state.constraint.group_id());
            }
        }
        for state in &mut self.states {
            if state.active && groups_to_deactivate.contains(&state.constraint.group_id()) {
                state.deactivate();
                self.num_active -= 1;
            }
        }
        Ok(())
    }
}

impl<I, O> Default for ConstrainingState<I, O> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Accumulates the per-constraint classification of one evaluation.
struct ScoreTally {
    successes: BTreeSet<usize>,
    hard_failures: BTreeSet<usize>,
    soft_failures: BTreeSet<usize>,
    objective: f64,
}

impl Default for ScoreTally {
    fn default() -> Self {
        Self {
            successes: BTreeSet::new(),
            hard_failures: BTreeSet::new(),
            soft_failures: BTreeSet::new(),
            objective: 0.0,
        }
    }
}

impl ScoreTally {
    fn record<I, O>(&mut self, index: usize, robustness: f64, constraint: &Constraint<I, O>) {
        match constraint.objective_impact() {
            ObjectiveImpact::Unsigned => self.objective += robustness.abs(),
            ObjectiveImpact::Signed => self.objective += robustness,
            ObjectiveImpact::None => {}
        }
        if robustness < 0.0 {
            match constraint.failure_kind() {
                FailureKind::Hard => {
                    self.hard_failures.insert(index);
                }
                FailureKind::Soft => {
                    self.soft_failures.insert(index);
                }
                FailureKind::None => {}
            }
        } else {
            self.successes.insert(index);
        }
    }

    fn into_score(self) -> Score {
        Score::new(
            self.successes,
            self.hard_failures,
            self.soft_failures,
            self.objective,
        )
    }
}
