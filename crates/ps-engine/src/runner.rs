//! Sequential and parameter-search runners.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use ps_space::{extend_by_shifting, SearchPoint, SearchableConfig};
use ps_types::{
    Constraint, ConstraintSnapshot, EngineError, EngineResult, Generation, PointScore, Score,
};

use crate::exploration::Exploration;
use crate::manager::TaskManager;
use crate::task::{SearchTask, TaskBody};

/// The execution model of a task: inputs go in via `push`, one output per
/// iteration comes back via `pull`.
pub trait Runner<B: TaskBody>: Send {
    fn push(&mut self, input: B::Input) -> EngineResult<()>;
    fn pull(&mut self) -> EngineResult<B::Output>;

    /// Install constraints on the underlying task.
    fn set_constraints(&self, constraints: Vec<Constraint<B::Input, B::Output>>);

    /// Clones of the installed constraints.
    fn constraints(&self) -> Vec<Constraint<B::Input, B::Output>>;

    /// Diagnostic view of the constraint life-states.
    fn constraint_snapshot(&self) -> Vec<ConstraintSnapshot>;
}

// ---------------------------------------------------------------------------
// Sequential runner
// ---------------------------------------------------------------------------

/// Runs the task on the caller thread with a fixed singleton
/// configuration.
pub struct SequentialRunner<B: TaskBody> {
    task: Arc<SearchTask<B>>,
    config: B::Config,
    last_output: Option<B::Output>,
}

impl<B: TaskBody> SequentialRunner<B> {
    /// `config` must already be a singleton.
    pub fn new(body: B, config: B::Config) -> Self {
        debug_assert!(config.is_singleton());
        Self {
            task: Arc::new(SearchTask::new(body)),
            config,
            last_output: None,
        }
    }
}

impl<B: TaskBody> Runner<B> for SequentialRunner<B> {
    fn push(&mut self, input: B::Input) -> EngineResult<()> {
        let output = self.task.run(&input, &self.config)?;
        self.task.update_constraining_state(&input, &output)?;
        self.last_output = Some(output);
        if self.task.has_constraints() && self.task.is_inactive() {
            return Err(EngineError::NoActiveConstraints {
                states: self.task.snapshot(),
            });
        }
        Ok(())
    }

    fn pull(&mut self) -> EngineResult<B::Output> {
        self.last_output.clone().ok_or(EngineError::OutputNotReady)
    }

    fn set_constraints(&self, constraints: Vec<Constraint<B::Input, B::Output>>) {
        self.task.set_constraints(constraints);
    }

    fn constraints(&self) -> Vec<Constraint<B::Input, B::Output>> {
        self.task.constraints()
    }

    fn constraint_snapshot(&self) -> Vec<ConstraintSnapshot> {
        self.task.snapshot()
    }
}

// ---------------------------------------------------------------------------
// Parameter-search runner
// ---------------------------------------------------------------------------

/// One worker's report for one (input, point) package: the point it
/// evaluated and either the scored output or the failure message.
type WorkerReport<B> =
    (
        SearchPoint,
        Result<(<B as TaskBody>::Output, Score), String>,
    );

/// Explores the configuration space of a task with K concurrent workers.
///
/// Each `push` fans the input out to K pending search points through a
/// bounded queue; each `pull` collects the K reports, publishes the scored
/// generation, asks the exploration strategy for the next points and
/// returns the best output of the iteration.
pub struct ParameterSearchRunner<B: TaskBody> {
    task: Arc<SearchTask<B>>,
    concurrency: usize,
    exploration: Exploration,
    manager: Arc<TaskManager>,
    initial_point: SearchPoint,
    pending: VecDeque<SearchPoint>,
    last_input: Option<B::Input>,
    failures_total: Arc<AtomicUsize>,
    input_tx: Option<Sender<(B::Input, SearchPoint)>>,
    output_rx: Receiver<WorkerReport<B>>,
    workers: Vec<JoinHandle<()>>,
    active: bool,
}

impl<B: TaskBody> ParameterSearchRunner<B> {
    /// Spawn K named worker threads parked on the input queue. `config` is
    /// the non-singleton template each worker collapses per point.
    pub fn new(
        body: B,
        config: B::Config,
        initial_point: SearchPoint,
        concurrency: usize,
        exploration: Exploration,
        manager: Arc<TaskManager>,
    ) -> EngineResult<Self> {
        let task = Arc::new(SearchTask::new(body));
        let failures_total = Arc::new(AtomicUsize::new(0));
        let (input_tx, input_rx) = bounded::<(B::Input, SearchPoint)>(concurrency);
        let (output_tx, output_rx) = bounded::<WorkerReport<B>>(concurrency);

        let mut workers = Vec::with_capacity(concurrency);
        for index in 0..concurrency {
            let task = Arc::clone(&task);
            let config = config.clone();
            let input_rx = input_rx.clone();
            let output_tx = output_tx.clone();
            let failures = Arc::clone(&failures_total);
            let handle = std::thread::Builder::new()
                .name(format!("{}-{:02}", task.name(), index))
                .spawn(move || worker_loop(task, config, input_rx, output_tx, failures))?;
            workers.push(handle);
        }

        Ok(Self {
            task,
            concurrency,
            exploration,
            manager,
            initial_point,
            pending: VecDeque::with_capacity(concurrency),
            last_input: None,
            failures_total,
            input_tx: Some(input_tx),
            output_rx,
            workers,
            active: false,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Total number of failed executions since construction.
    pub fn failure_count(&self) -> usize {
        self.failures_total.load(Ordering::Relaxed)
    }
}

impl<B: TaskBody> Runner<B> for ParameterSearchRunner<B> {
    fn push(&mut self, input: B::Input) -> EngineResult<()> {
        if !self.active {
            self.active = true;
            let mut seed = self.initial_point.shifted(self.concurrency);
            if seed.len() < self.concurrency {
                // The space has no more than K points besides the initial
                // one; the initial point itself completes the seed.
                seed.insert(self.initial_point.clone());
            }
            for point in seed {
                self.pending.push_back(point);
            }
            debug!(
                task = self.task.name(),
                seed = self.pending.len(),
                "seeded the pending generation"
            );
        }
        assert!(
            self.pending.len() >= self.concurrency,
            "pending generation exhausted: push and pull must alternate"
        );
        let input_tx = self
            .input_tx
            .as_ref()
            .ok_or_else(|| EngineError::Internal("worker pool already shut down".into()))?;
        for _ in 0..self.concurrency {
            // The queue holds at most one generation, so this blocks until
            // workers drain earlier packages.
            let point = self
                .pending
                .pop_front()
                .ok_or_else(|| EngineError::Internal("pending point queue underflow".into()))?;
            input_tx
                .send((input.clone(), point))
                .map_err(|_| EngineError::Internal("worker pool disconnected".into()))?;
        }
        self.last_input = Some(input);
        Ok(())
    }

    fn pull(&mut self) -> EngineResult<B::Output> {
        let input = self.last_input.take().ok_or(EngineError::OutputNotReady)?;

        let mut outputs: BTreeMap<SearchPoint, B::Output> = BTreeMap::new();
        let mut scores: BTreeSet<PointScore> = BTreeSet::new();
        let mut failures = 0usize;
        for _ in 0..self.concurrency {
            let (point, report) = self
                .output_rx
                .recv()
                .map_err(|_| EngineError::Internal("worker pool disconnected".into()))?;
            match report {
                Ok((output, score)) => {
                    scores.insert(PointScore::new(point.clone(), score));
                    outputs.insert(point, output);
                }
                Err(_) => failures += 1,
            }
        }
        info!(
            task = self.task.name(),
            completed = self.concurrency - failures,
            failures,
            "iteration completed"
        );
        if scores.is_empty() {
            return Err(EngineError::AllExecutionsFailed(self.concurrency));
        }
        let generation = Generation::from_scores(scores);

        // Steer the next iteration. Failed executions shrink the scored
        // generation, so pad the returned set back to full width.
        let mut next = self.exploration.next_points(&generation);
        if next.len() < self.concurrency {
            next = extend_by_shifting(&next, self.concurrency);
        }
        for point in next {
            self.pending.push_back(point);
        }
        debug_assert_eq!(self.pending.len(), self.concurrency);

        self.manager.append_scores(generation.clone());

        let best = generation
            .best()
            .cloned()
            .ok_or_else(|| EngineError::Internal("empty generation after scoring".into()))?;
        let best_output = outputs
            .remove(best.point())
            .ok_or_else(|| EngineError::Internal("scored point lost its output".into()))?;
        debug!(task = self.task.name(), best = %best, "selected best point");

        self.task.update_constraining_state(&input, &best_output)?;
        if self.task.is_inactive() {
            return Err(EngineError::NoActiveConstraints {
                states: self.task.snapshot(),
            });
        }
        Ok(best_output)
    }

    fn set_constraints(&self, constraints: Vec<Constraint<B::Input, B::Output>>) {
        self.task.set_constraints(constraints);
    }

    fn constraints(&self) -> Vec<Constraint<B::Input, B::Output>> {
        self.task.constraints()
    }

    fn constraint_snapshot(&self) -> Vec<ConstraintSnapshot> {
        self.task.snapshot()
    }
}

impl<B: TaskBody> Drop for ParameterSearchRunner<B> {
    fn drop(&mut self) {
        // Closing the input queue wakes every parked worker; each exits at
        // its next receive.
        self.input_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop<B: TaskBody>(
    task: Arc<SearchTask<B>>,
    config: B::Config,
    input_rx: Receiver<(B::Input, SearchPoint)>,
    output_tx: Sender<WorkerReport<B>>,
    failures: Arc<AtomicUsize>,
) {
    while let Ok((input, point)) = input_rx.recv() {
        let singleton = config.with_point(&point);
        let report = match task.run(&input, &singleton) {
            Ok(output) => match task.evaluate(&input, &output) {
                Ok(score) => Ok((output, score)),
                Err(err) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    warn!(task = task.name(), point = %point, error = %err, "scoring failed");
                    Err(err.to_string())
                }
            },
            Err(err) => {
                failures.fetch_add(1, Ordering::Relaxed);
                warn!(task = task.name(), point = %point, error = %err, "task failed");
                Err(err.to_string())
            }
        };
        if output_tx.send((point, report)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ps_space::{SearchSpace, SpaceHandle};
    use ps_types::FailureKind;

    #[derive(Clone)]
    struct OrderConfig {
        space: Arc<SearchSpace>,
        order: Option<i64>,
    }

    impl OrderConfig {
        fn new() -> Self {
            Self {
                space: Arc::new(SearchSpace::new().add_int("order", 1, 5)),
                order: None,
            }
        }
    }

    impl SearchableConfig for OrderConfig {
        fn search_space(&self) -> &Arc<SearchSpace> {
            &self.space
        }

        fn is_singleton(&self) -> bool {
            self.order.is_some()
        }

        fn with_point(&self, point: &SearchPoint) -> Self {
            Self {
                space: Arc::clone(&self.space),
                order: Some(point.coordinates()[0]),
            }
        }
    }

    #[derive(Clone)]
    struct AddOrder;

    impl TaskBody for AddOrder {
        type Input = f64;
        type Output = f64;
        type Config = OrderConfig;

        fn name(&self) -> &str {
            "add_order"
        }

        fn run(&self, input: &f64, cfg: &OrderConfig) -> Result<f64, String> {
            let order = cfg.order.ok_or("configuration is not singleton")?;
            Ok(input + order as f64)
        }
    }

    #[test]
    fn sequential_push_then_pull() {
        let config = OrderConfig::new();
        let point = config.search_space().point(vec![2]).unwrap();
        let mut runner = SequentialRunner::new(AddOrder, config.with_point(&point));

        runner.push(1.0).unwrap();
        assert_eq!(runner.pull().unwrap(), 3.0);
        // Pull is repeatable until the next push.
        assert_eq!(runner.pull().unwrap(), 3.0);
    }

    #[test]
    fn sequential_pull_before_push_fails() {
        let config = OrderConfig::new();
        let point = config.search_space().point(vec![2]).unwrap();
        let mut runner = SequentialRunner::new(AddOrder, config.with_point(&point));
        assert!(matches!(
            runner.pull(),
            Err(EngineError::OutputNotReady)
        ));
    }

    #[test]
    fn sequential_reports_exhausted_constraints() {
        let config = OrderConfig::new();
        let point = config.search_space().point(vec![2]).unwrap();
        let mut runner = SequentialRunner::new(AddOrder, config.with_point(&point));
        runner.set_constraints(vec![
            Constraint::builder(|_i: &f64, o: &f64| -o)
                .failure_kind(FailureKind::Hard)
                .build(),
        ]);

        let err = runner.push(1.0).unwrap_err();
        assert!(matches!(err, EngineError::NoActiveConstraints { .. }));
        // The output of the failing iteration is still retrievable.
        assert_eq!(runner.pull().unwrap(), 3.0);
    }

    #[test]
    fn parameter_search_iterates_and_returns_best() {
        let manager = TaskManager::new();
        let config = OrderConfig::new();
        let initial = config.search_space().initial_point();
        let mut runner = ParameterSearchRunner::new(
            AddOrder,
            config,
            initial,
            4,
            Exploration::ShiftAndKeepBestHalf,
            Arc::clone(&manager),
        )
        .unwrap();
        // Prefer outputs close to 5 from below or above.
        runner.set_constraints(vec![
            Constraint::builder(|_i: &f64, o: &f64| o - 5.0)
                .failure_kind(FailureKind::Soft)
                .objective_impact(ps_types::ObjectiveImpact::Unsigned)
                .build(),
        ]);

        runner.push(1.0).unwrap();
        // Seed points are the shifted neighbourhood of order=3, which in a
        // five-point space is exactly {1, 2, 4, 5}; order=4 gives 5.0.
        assert_eq!(runner.pull().unwrap(), 5.0);

        let generations = manager.generations();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].generation().len(), 4);

        // The stream continues: the pending generation was refilled.
        runner.push(1.0).unwrap();
        let second = runner.pull().unwrap();
        assert!(second >= 2.0 && second <= 6.0);
        assert_eq!(manager.generations().len(), 2);
    }

    #[derive(Clone)]
    struct FailingBody {
        failing_order: i64,
    }

    impl TaskBody for FailingBody {
        type Input = f64;
        type Output = f64;
        type Config = OrderConfig;

        fn name(&self) -> &str {
            "failing"
        }

        fn run(&self, input: &f64, cfg: &OrderConfig) -> Result<f64, String> {
            let order = cfg.order.ok_or("configuration is not singleton")?;
            if order == self.failing_order {
                return Err(format!("order {order} is not supported"));
            }
            Ok(input + order as f64)
        }
    }

    #[test]
    fn failed_executions_are_tolerated() {
        let manager = TaskManager::new();
        let config = OrderConfig::new();
        let initial = config.search_space().initial_point();
        let mut runner = ParameterSearchRunner::new(
            FailingBody { failing_order: 2 },
            config,
            initial,
            4,
            Exploration::ShiftAndKeepBestHalf,
            Arc::clone(&manager),
        )
        .unwrap();
        runner.set_constraints(vec![Constraint::builder(|_i: &f64, o: &f64| o - 5.0)
            .failure_kind(FailureKind::Soft)
            .build()]);

        runner.push(1.0).unwrap();
        // Order 2 fails; the best of the surviving {1, 4, 5} still wins.
        assert_eq!(runner.pull().unwrap(), 5.0);
        assert_eq!(runner.failure_count(), 1);
        assert_eq!(manager.generations()[0].generation().len(), 3);

        // The pending generation is padded back to full width.
        runner.push(1.0).unwrap();
        runner.pull().unwrap();
    }

    #[derive(Clone)]
    struct AlwaysFails;

    impl TaskBody for AlwaysFails {
        type Input = f64;
        type Output = f64;
        type Config = OrderConfig;

        fn name(&self) -> &str {
            "always_fails"
        }

        fn run(&self, _input: &f64, _cfg: &OrderConfig) -> Result<f64, String> {
            Err("unconditional failure".into())
        }
    }

    #[test]
    fn all_failures_surface_instead_of_blocking() {
        let manager = TaskManager::new();
        let config = OrderConfig::new();
        let initial = config.search_space().initial_point();
        let mut runner = ParameterSearchRunner::new(
            AlwaysFails,
            config,
            initial,
            3,
            Exploration::ShiftAndKeepBestHalf,
            manager,
        )
        .unwrap();
        runner.set_constraints(vec![Constraint::builder(|_i: &f64, _o: &f64| 1.0).build()]);

        runner.push(1.0).unwrap();
        assert!(matches!(
            runner.pull(),
            Err(EngineError::AllExecutionsFailed(3))
        ));
    }
}
