//! Shared fixtures: a one-dimensional order sweep task.

use std::sync::Arc;

use ps_engine::TaskBody;
use ps_space::{SearchPoint, SearchSpace, SearchableConfig};

/// Configuration with a single tunable `order` parameter in 1..=5.
#[derive(Clone)]
pub struct OrderConfig {
    space: Arc<SearchSpace>,
    pub order: Option<i64>,
}

impl OrderConfig {
    pub fn new() -> Self {
        Self {
            space: Arc::new(SearchSpace::new().add_int("maximum_order", 1, 5)),
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

/// `run(x, cfg) = x + cfg.order`.
#[derive(Clone)]
pub struct AddOrder;

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
