//! Process-wide coordination: runner selection, score aggregation and the
//! optimum across iterations.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::{debug, info};
use uuid::Uuid;

use ps_space::{SearchPoint, SearchableConfig, SpaceHandle};
use ps_types::{Constraint, EngineError, EngineResult, Generation, PointScore};

use crate::exploration::Exploration;
use crate::runner::{ParameterSearchRunner, Runner, SequentialRunner};
use crate::task::TaskBody;

/// One recorded generation in the search history.
#[derive(Debug, Clone)]
pub struct GenerationRecord {
    id: Uuid,
    recorded_at: DateTime<Utc>,
    generation: Generation,
}

impl GenerationRecord {
    fn new(generation: Generation) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            generation,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }
}

struct ManagerState {
    exploration: Exploration,
    concurrency: usize,
    history: Vec<GenerationRecord>,
}

/// Coordinates runners and aggregates scores across every search stream in
/// the process.
///
/// The process-wide instance is lazily initialised behind
/// [`TaskManager::global`]; independent instances from [`TaskManager::new`]
/// give tests (or embedders) an isolated history.
pub struct TaskManager {
    state: Mutex<ManagerState>,
}

impl TaskManager {
    /// An independent manager with its own exploration strategy, history
    /// and concurrency budget.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ManagerState {
                exploration: Exploration::default(),
                concurrency: available_parallelism(),
                history: Vec::new(),
            }),
        })
    }

    /// The process-wide instance.
    pub fn global() -> Arc<Self> {
        static INSTANCE: OnceLock<Arc<TaskManager>> = OnceLock::new();
        Arc::clone(INSTANCE.get_or_init(TaskManager::new))
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ---- concurrency budget ----

    /// The hardware concurrency ceiling.
    pub fn maximum_concurrency(&self) -> usize {
        available_parallelism()
    }

    pub fn concurrency(&self) -> usize {
        self.lock().concurrency
    }

    /// Set the worker budget used when selecting runners.
    pub fn set_concurrency(&self, concurrency: usize) -> EngineResult<()> {
        let maximum = self.maximum_concurrency();
        if concurrency == 0 || concurrency > maximum {
            return Err(EngineError::InvalidConcurrency {
                requested: concurrency,
                maximum,
            });
        }
        self.lock().concurrency = concurrency;
        Ok(())
    }

    // ---- exploration strategy ----

    pub fn set_exploration(&self, exploration: Exploration) {
        self.lock().exploration = exploration;
    }

    pub fn exploration(&self) -> Exploration {
        self.lock().exploration
    }

    // ---- runner selection ----

    /// Pick the runner appropriate for `config` and `constraints`.
    ///
    /// Without constraints, or with a singleton configuration, the task
    /// runs sequentially on a frozen configuration. With constraints, a
    /// non-singleton configuration and a worker budget above one, the
    /// parameter-search runner explores `min(budget, total points)`
    /// configurations per iteration; otherwise the configuration is frozen
    /// at the initial point and run sequentially.
    pub fn choose_runner<B: TaskBody>(
        manager: &Arc<Self>,
        body: B,
        config: B::Config,
        constraints: Vec<Constraint<B::Input, B::Output>>,
        initial_point: Option<SearchPoint>,
    ) -> EngineResult<Box<dyn Runner<B>>> {
        let space = Arc::clone(config.search_space());
        let initial = initial_point.unwrap_or_else(|| space.initial_point());

        if constraints.is_empty() || config.is_singleton() {
            let frozen = if config.is_singleton() {
                config
            } else {
                debug!(point = %initial, "freezing configuration for sequential running");
                config.with_point(&initial)
            };
            let runner = SequentialRunner::new(body, frozen);
            runner.set_constraints(constraints);
            return Ok(Box::new(runner));
        }

        let budget = manager.concurrency();
        let total_points = space.total_points().unwrap_or(usize::MAX);
        if budget > 1 {
            let concurrency = budget.min(total_points);
            info!(
                concurrency,
                "installing the parameter-search runner"
            );
            let runner = ParameterSearchRunner::new(
                body,
                config,
                initial,
                concurrency,
                manager.exploration(),
                Arc::clone(manager),
            )?;
            runner.set_constraints(constraints);
            Ok(Box::new(runner))
        } else {
            info!(point = %initial, "single worker budget: freezing at the initial point");
            let runner = SequentialRunner::new(body, config.with_point(&initial));
            runner.set_constraints(constraints);
            Ok(Box::new(runner))
        }
    }

    // ---- score history ----

    pub fn append_scores(&self, generation: Generation) {
        self.lock().history.push(GenerationRecord::new(generation));
    }

    pub fn generations(&self) -> Vec<GenerationRecord> {
        self.lock().history.clone()
    }

    pub fn clear_scores(&self) {
        self.lock().history.clear();
    }

    /// The best point score of every recorded generation, in order.
    pub fn best_scores(&self) -> Vec<PointScore> {
        self.lock()
            .history
            .iter()
            .filter_map(|record| record.generation.best().cloned())
            .collect()
    }

    /// The centroid of the best points, rounded per coordinate. Empty when
    /// nothing was recorded.
    pub fn optimal_point(&self) -> Vec<i64> {
        let best = self.best_scores();
        let Some(first) = best.first() else {
            return Vec::new();
        };
        let dimension = first.point().coordinates().len();
        let mut sums = vec![0.0f64; dimension];
        for point_score in &best {
            for (index, &coordinate) in point_score.point().coordinates().iter().enumerate() {
                sums[index] += coordinate as f64;
            }
        }
        sums.iter()
            .map(|sum| (sum / best.len() as f64).round() as i64)
            .collect()
    }

    /// Write an Octave script plotting the best point per generation to
    /// `points.m` in the working directory.
    pub fn print_best_scores(&self) -> EngineResult<()> {
        self.write_best_scores(Path::new("points.m"))
    }

    pub fn write_best_scores(&self, path: &Path) -> EngineResult<()> {
        let best = self.best_scores();
        let Some(first) = best.first() else {
            return Ok(());
        };
        let space = Arc::clone(first.point().space());
        let dimension = space.dimension();

        let mut script = String::new();
        let _ = writeln!(script, "x = [1:{}];", best.len());
        for index in 0..dimension {
            let coordinates: Vec<String> = best
                .iter()
                .map(|ps| ps.point().coordinates()[index].to_string())
                .collect();
            let _ = writeln!(script, "y{} = [{}];", index, coordinates.join(", "));
        }
        let _ = writeln!(script, "figure(1);");
        let _ = writeln!(script, "hold on;");
        for (index, parameter) in space.parameters().iter().enumerate() {
            let label = parameter.name().replace('_', " ");
            let _ = writeln!(script, "plot(x, y{index}, 'DisplayName', '{label}');");
        }
        let _ = writeln!(script, "legend;");
        let _ = writeln!(script, "hold off;");

        std::fs::write(path, script)?;
        Ok(())
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}
