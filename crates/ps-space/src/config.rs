//! Configuration binding: collapsing a search point into a singleton.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::point::SearchPoint;
use crate::space::SearchSpace;

/// A concrete parameter value produced by materialising a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Json(serde_json::Value),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

/// A configuration embedding a search space.
///
/// A configuration is *singleton* when every parameter has been collapsed
/// to a single value; only singleton configurations can be executed.
/// `with_point` binds a [`SearchPoint`] and must return a singleton
/// configuration whose parameter values match the point's coordinates.
pub trait SearchableConfig: Clone + Send + Sync + 'static {
    /// The space spanned by this configuration's tunable parameters.
    fn search_space(&self) -> &Arc<SearchSpace>;

    /// Whether every parameter is already collapsed to a single value.
    fn is_singleton(&self) -> bool;

    /// Collapse to the singleton configuration selected by `point`.
    fn with_point(&self, point: &SearchPoint) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::SpaceHandle;

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

    #[test]
    fn binding_a_point_makes_a_singleton() {
        let config = OrderConfig::new();
        assert!(!config.is_singleton());
        let point = config.search_space().point(vec![4]).unwrap();
        let singleton = config.with_point(&point);
        assert!(singleton.is_singleton());
        assert_eq!(singleton.order, Some(4));
    }

    #[test]
    fn param_value_display() {
        assert_eq!(ParamValue::Int(7).to_string(), "7");
        assert_eq!(
            ParamValue::Json(serde_json::json!("fast")).to_string(),
            "\"fast\""
        );
    }
}
