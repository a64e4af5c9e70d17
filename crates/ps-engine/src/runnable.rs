//! The user-facing binding between a task body and its runner.

use std::sync::Arc;

use ps_space::{SearchPoint, SearchableConfig, SpaceHandle};
use ps_types::{Constraint, ConstraintSnapshot, EngineResult};

use crate::manager::TaskManager;
use crate::runner::Runner;
use crate::task::TaskBody;

/// Binds a [`TaskBody`] and its configuration to a runner chosen by the
/// [`TaskManager`].
///
/// Construction installs a sequential runner on the frozen configuration;
/// attaching constraints re-picks the runner, typically upgrading to the
/// concurrent parameter-search runner when the configuration still spans a
/// search space.
pub struct Runnable<B: TaskBody> {
    body: B,
    config: B::Config,
    manager: Arc<TaskManager>,
    runner: Box<dyn Runner<B>>,
}

impl<B: TaskBody> Runnable<B> {
    /// Bind to the process-wide [`TaskManager`].
    pub fn new(body: B, config: B::Config) -> EngineResult<Self> {
        Self::with_manager(body, config, TaskManager::global())
    }

    /// Bind to a specific manager instance.
    pub fn with_manager(
        body: B,
        config: B::Config,
        manager: Arc<TaskManager>,
    ) -> EngineResult<Self> {
        let runner =
            TaskManager::choose_runner(&manager, body.clone(), config.clone(), Vec::new(), None)?;
        Ok(Self {
            body,
            config,
            manager,
            runner,
        })
    }

    /// Attach constraints and let the manager re-pick the runner, seeded
    /// at the search space's initial point.
    pub fn set_constraints(
        &mut self,
        constraints: Vec<Constraint<B::Input, B::Output>>,
    ) -> EngineResult<()> {
        let initial = self.config.search_space().initial_point();
        self.runner = TaskManager::choose_runner(
            &self.manager,
            self.body.clone(),
            self.config.clone(),
            constraints,
            Some(initial),
        )?;
        Ok(())
    }

    /// Re-pick the runner seeded at `point`, keeping the current
    /// constraints. This starts a fresh evaluation stream.
    pub fn set_initial_point(&mut self, point: SearchPoint) -> EngineResult<()> {
        let constraints = self.runner.constraints();
        self.runner = TaskManager::choose_runner(
            &self.manager,
            self.body.clone(),
            self.config.clone(),
            constraints,
            Some(point),
        )?;
        Ok(())
    }

    pub fn push(&mut self, input: B::Input) -> EngineResult<()> {
        self.runner.push(input)
    }

    pub fn pull(&mut self) -> EngineResult<B::Output> {
        self.runner.pull()
    }

    pub fn configuration(&self) -> &B::Config {
        &self.config
    }

    /// Diagnostic view of the constraint life-states of the current
    /// stream.
    pub fn constraint_snapshot(&self) -> Vec<ConstraintSnapshot> {
        self.runner.constraint_snapshot()
    }
}
