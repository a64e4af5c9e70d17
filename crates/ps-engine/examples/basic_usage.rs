use std::sync::Arc;

use ps_engine::{Runnable, TaskBody, TaskManager};
use ps_space::{SearchPoint, SearchSpace, SearchableConfig};
use ps_types::{Constraint, EngineError, FailureKind, ObjectiveImpact};

/// A solver configuration with two tunable parameters.
#[derive(Clone)]
struct SolverConfig {
    space: Arc<SearchSpace>,
    maximum_order: Option<i64>,
    refinement_level: Option<i64>,
}

impl SolverConfig {
    fn new() -> Self {
        Self {
            space: Arc::new(
                SearchSpace::new()
                    .add_int("maximum_order", 1, 8)
                    .add_int("refinement_level", 0, 4),
            ),
            maximum_order: None,
            refinement_level: None,
        }
    }
}

impl SearchableConfig for SolverConfig {
    fn search_space(&self) -> &Arc<SearchSpace> {
        &self.space
    }

    fn is_singleton(&self) -> bool {
        self.maximum_order.is_some() && self.refinement_level.is_some()
    }

    fn with_point(&self, point: &SearchPoint) -> Self {
        Self {
            space: Arc::clone(&self.space),
            maximum_order: Some(point.coordinates()[0]),
            refinement_level: Some(point.coordinates()[1]),
        }
    }
}

/// A mock solver: accuracy improves with order and refinement, at a cost.
#[derive(Clone)]
struct MockSolver;

impl TaskBody for MockSolver {
    type Input = f64;
    type Output = f64;
    type Config = SolverConfig;

    fn name(&self) -> &str {
        "mock_solver"
    }

    fn run(&self, input: &f64, cfg: &SolverConfig) -> Result<f64, String> {
        let order = cfg.maximum_order.ok_or("order not bound")? as f64;
        let level = cfg.refinement_level.ok_or("level not bound")? as f64;
        // Error shrinks with order and refinement; cost grows with both.
        let error = input / (order * (1.0 + level));
        let cost = order * 0.1 + level * 0.3;
        Ok(error + cost)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("ParaSift basic usage");

    let manager = TaskManager::global();
    println!(
        "Worker budget: {} (hardware maximum {})",
        manager.concurrency(),
        manager.maximum_concurrency()
    );

    let config = SolverConfig::new();
    println!(
        "Search space: {} parameters, {} points",
        config.search_space().dimension(),
        config.search_space().total_points().unwrap_or(0)
    );

    let mut runnable = Runnable::new(MockSolver, config)?;

    // Ask for outputs below 1.0, and prefer them as small as possible.
    runnable.set_constraints(vec![Constraint::builder(
        |_input: &f64, output: &f64| 1.0 - output,
    )
    .name("combined_cost_bound")
    .failure_kind(FailureKind::Soft)
    .objective_impact(ObjectiveImpact::Signed)
    .build()])?;

    for step in 1..=5 {
        runnable.push(2.0)?;
        match runnable.pull() {
            Ok(output) => println!("iteration {step}: best output {output:.4}"),
            Err(EngineError::NoActiveConstraints { states }) => {
                println!("iteration {step}: constraints exhausted ({} states)", states.len());
                break;
            }
            Err(other) => return Err(other.into()),
        }
    }

    println!("Recorded generations: {}", manager.generations().len());
    for (index, ps) in manager.best_scores().iter().enumerate() {
        println!("  best of generation {}: {}", index + 1, ps);
    }
    println!("Optimal point so far: {:?}", manager.optimal_point());

    // Write the Octave plotting script next to the binary.
    manager.print_best_scores()?;
    println!("Wrote points.m");

    Ok(())
}
