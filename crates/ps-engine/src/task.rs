//! The task contract and the engine's wrapper around it.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ps_space::SearchableConfig;
use ps_types::{
    ConstrainingState, Constraint, ConstraintSnapshot, EngineError, EngineResult, Score,
};

/// A user-authored task body: a deterministic function from an input and a
/// fully-instantiated (singleton) configuration to an output.
///
/// Bodies are cheap to clone; they are duplicated whenever a new runner is
/// installed for the same runnable.
pub trait TaskBody: Clone + Send + Sync + 'static {
    type Input: Clone + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;
    type Config: SearchableConfig;

    /// The task name, used for worker-thread naming and logging.
    fn name(&self) -> &str;

    /// Execute the task. `cfg` is always a singleton configuration.
    fn run(&self, input: &Self::Input, cfg: &Self::Config) -> Result<Self::Output, String>;
}

/// A task body together with the constraining state of its evaluation
/// stream.
///
/// The state sits behind a `RwLock`: worker threads take the read path
/// ([`SearchTask::evaluate`], pure by construction) while the coordinator
/// takes the only write path ([`SearchTask::update_constraining_state`]),
/// once per iteration.
pub struct SearchTask<B: TaskBody> {
    body: B,
    state: RwLock<ConstrainingState<B::Input, B::Output>>,
}

impl<B: TaskBody> SearchTask<B> {
    pub fn new(body: B) -> Self {
        Self {
            body,
            state: RwLock::new(ConstrainingState::default()),
        }
    }

    pub fn name(&self) -> &str {
        self.body.name()
    }

    /// Execute the task body on a singleton configuration.
    pub fn run(&self, input: &B::Input, cfg: &B::Config) -> EngineResult<B::Output> {
        self.body.run(input, cfg).map_err(EngineError::TaskFailed)
    }

    /// Replace the constraining state with a fresh one for `constraints`.
    pub fn set_constraints(&self, constraints: Vec<Constraint<B::Input, B::Output>>) {
        *self.write_state() = ConstrainingState::new(constraints);
    }

    /// Score an output against the pending constraints without advancing
    /// any controller. Safe to call concurrently from workers.
    pub fn evaluate(&self, input: &B::Input, output: &B::Output) -> EngineResult<Score> {
        self.read_state().evaluate(input, output)
    }

    /// Apply the once-per-iteration state transition with the chosen best
    /// output. A no-op for tasks that carry no constraints at all.
    pub fn update_constraining_state(
        &self,
        input: &B::Input,
        output: &B::Output,
    ) -> EngineResult<()> {
        let mut state = self.write_state();
        if state.is_empty() {
            return Ok(());
        }
        state.update_from(input, output)
    }

    pub fn has_constraints(&self) -> bool {
        !self.read_state().is_empty()
    }

    pub fn num_active(&self) -> usize {
        self.read_state().num_active()
    }

    pub fn is_inactive(&self) -> bool {
        self.read_state().is_inactive()
    }

    /// Clones of the constraints, as given to `set_constraints`.
    pub fn constraints(&self) -> Vec<Constraint<B::Input, B::Output>> {
        self.read_state().constraints()
    }

    pub fn snapshot(&self) -> Vec<ConstraintSnapshot> {
        self.read_state().snapshot()
    }

    // A worker panicking while holding the lock poisons it; the state
    // itself is still consistent (evaluate does not write), so recover the
    // guard rather than propagating the poison.
    fn read_state(&self) -> RwLockReadGuard<'_, ConstrainingState<B::Input, B::Output>> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ConstrainingState<B::Input, B::Output>> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
