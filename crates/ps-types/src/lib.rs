//! # ps-types
//!
//! Scoring and constraint types for the parameter-search engine: the
//! totally ordered [`Score`] record, user [`Constraint`]s with their
//! robustness controllers, and the [`ConstrainingState`] machine that
//! tracks successes and failures across iterations.

pub mod constraint;
pub mod controller;
pub mod errors;
pub mod score;
pub mod state;

pub use constraint::{
    Constraint, ConstraintBuilder, FailureKind, ObjectiveImpact, SuccessAction,
};
pub use controller::{RobustnessController, TimeProgressLinear};
pub use errors::{ConstraintSnapshot, EngineError, EngineResult};
pub use score::{Generation, PointScore, Score};
pub use state::{ConstrainingState, ConstraintState};
