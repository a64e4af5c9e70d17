//! Search space definitions.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ParamValue;
use crate::error::SpaceError;
use crate::point::SearchPoint;

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDomain {
    /// Human-readable parameter name (e.g. "maximum_order").
    pub name: String,
    /// The kind of discrete range.
    pub kind: DomainKind,
}

/// Describes the discrete values a parameter may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainKind {
    /// Integer range [lower, upper] inclusive; coordinates are the values
    /// themselves.
    IntRange { lower: i64, upper: i64 },
    /// Enumerated choices; coordinates index into `values`.
    Enumerated { values: Vec<serde_json::Value> },
}

impl ParameterDomain {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of distinct coordinates in this domain.
    pub fn cardinality(&self) -> usize {
        match &self.kind {
            DomainKind::IntRange { lower, upper } => (upper - lower + 1) as usize,
            DomainKind::Enumerated { values } => values.len(),
        }
    }

    pub fn lower_coordinate(&self) -> i64 {
        match &self.kind {
            DomainKind::IntRange { lower, .. } => *lower,
            DomainKind::Enumerated { .. } => 0,
        }
    }

    pub fn upper_coordinate(&self) -> i64 {
        match &self.kind {
            DomainKind::IntRange { upper, .. } => *upper,
            DomainKind::Enumerated { values } => values.len() as i64 - 1,
        }
    }

    pub fn contains(&self, coordinate: i64) -> bool {
        coordinate >= self.lower_coordinate() && coordinate <= self.upper_coordinate()
    }

    /// The midpoint coordinate, used as the default starting point.
    pub fn midpoint(&self) -> i64 {
        let lower = self.lower_coordinate();
        let upper = self.upper_coordinate();
        lower + (upper - lower) / 2
    }

    /// Materialise the coordinate into a concrete parameter value.
    pub fn value_at(&self, coordinate: i64) -> Option<ParamValue> {
        if !self.contains(coordinate) {
            return None;
        }
        match &self.kind {
            DomainKind::IntRange { .. } => Some(ParamValue::Int(coordinate)),
            DomainKind::Enumerated { values } => {
                Some(ParamValue::Json(values[coordinate as usize].clone()))
            }
        }
    }
}

/// The full search space: an ordered list of parameter domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<ParameterDomain>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    /// Add an inclusive integer range dimension.
    pub fn add_int(mut self, name: impl Into<String>, lower: i64, upper: i64) -> Self {
        assert!(lower <= upper, "integer domain must satisfy lower <= upper");
        self.parameters.push(ParameterDomain {
            name: name.into(),
            kind: DomainKind::IntRange { lower, upper },
        });
        self
    }

    /// Add an enumerated dimension; coordinates index into `values`.
    pub fn add_values(mut self, name: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        assert!(!values.is_empty(), "enumerated domain must not be empty");
        self.parameters.push(ParameterDomain {
            name: name.into(),
            kind: DomainKind::Enumerated { values },
        });
        self
    }

    pub fn parameters(&self) -> &[ParameterDomain] {
        &self.parameters
    }

    pub fn dimension(&self) -> usize {
        self.parameters.len()
    }

    /// Total number of points (`None` on overflow).
    pub fn total_points(&self) -> Option<usize> {
        let mut total: usize = 1;
        for param in &self.parameters {
            total = total.checked_mul(param.cardinality())?;
        }
        Some(total)
    }

}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

/// Point constructors on a shared space handle. Points keep the handle
/// alive, so construction goes through the `Arc` rather than the bare
/// space.
pub trait SpaceHandle {
    /// The point at the midpoint of every domain.
    fn initial_point(&self) -> SearchPoint;

    /// Build a point from explicit coordinates, validating each against
    /// its domain.
    fn point(&self, coordinates: Vec<i64>) -> Result<SearchPoint, SpaceError>;
}

impl SpaceHandle for Arc<SearchSpace> {
    fn initial_point(&self) -> SearchPoint {
        let coordinates = self.parameters.iter().map(|p| p.midpoint()).collect();
        SearchPoint::new_unchecked(Arc::clone(self), coordinates)
    }

    fn point(&self, coordinates: Vec<i64>) -> Result<SearchPoint, SpaceError> {
        if coordinates.len() != self.dimension() {
            return Err(SpaceError::DimensionMismatch {
                expected: self.dimension(),
                got: coordinates.len(),
            });
        }
        for (param, &coordinate) in self.parameters.iter().zip(&coordinates) {
            if !param.contains(coordinate) {
                return Err(SpaceError::OutOfDomain {
                    name: param.name.clone(),
                    coordinate,
                });
            }
        }
        Ok(SearchPoint::new_unchecked(Arc::clone(self), coordinates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinality_and_total_points() {
        let space = SearchSpace::new()
            .add_int("a", 1, 3) // 3 values
            .add_int("b", 10, 11); // 2 values
        assert_eq!(space.dimension(), 2);
        assert_eq!(space.total_points(), Some(6));
    }

    #[test]
    fn total_points_overflows_to_none() {
        let space = SearchSpace::new()
            .add_int("a", 0, i64::MAX / 2)
            .add_int("b", 0, i64::MAX / 2);
        assert_eq!(space.total_points(), None);
    }

    #[test]
    fn initial_point_sits_on_midpoints() {
        let space = Arc::new(
            SearchSpace::new()
                .add_int("order", 1, 5)
                .add_int("level", 0, 3),
        );
        let initial = space.initial_point();
        assert_eq!(initial.coordinates(), &[3, 1]);
    }

    #[test]
    fn enumerated_values_are_indexed() {
        let domain = ParameterDomain {
            name: "mode".into(),
            kind: DomainKind::Enumerated {
                values: vec![serde_json::json!("fast"), serde_json::json!("slow")],
            },
        };
        assert_eq!(domain.cardinality(), 2);
        assert_eq!(domain.lower_coordinate(), 0);
        assert_eq!(domain.upper_coordinate(), 1);
        assert_eq!(
            domain.value_at(1),
            Some(ParamValue::Json(serde_json::json!("slow")))
        );
        assert_eq!(domain.value_at(2), None);
    }

    #[test]
    fn point_validation() {
        let space = Arc::new(SearchSpace::new().add_int("order", 1, 5));
        assert!(space.point(vec![3]).is_ok());
        assert_eq!(
            space.point(vec![0]),
            Err(SpaceError::OutOfDomain {
                name: "order".into(),
                coordinate: 0
            })
        );
        assert_eq!(
            space.point(vec![1, 2]),
            Err(SpaceError::DimensionMismatch {
                expected: 1,
                got: 2
            })
        );
    }
}
