use thiserror::Error;

/// Errors produced when constructing or addressing search points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpaceError {
    #[error("coordinate count {got} does not match space dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("coordinate {coordinate} is outside the domain of parameter '{name}'")]
    OutOfDomain { name: String, coordinate: i64 },
}
