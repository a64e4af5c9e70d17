//! # ps-space
//!
//! Discrete configuration-space primitives for parameter search.
//!
//! A [`SearchSpace`] is an ordered list of named discrete parameter
//! domains; a [`SearchPoint`] picks one coordinate per domain. Points can
//! be shifted to neighbours at Hamming distance 1, which is how the
//! exploration layer walks the space. Configurations that embed a search
//! space implement [`SearchableConfig`] so a point can be collapsed into a
//! singleton configuration.

mod config;
mod error;
mod point;
mod space;

pub use config::{ParamValue, SearchableConfig};
pub use error::SpaceError;
pub use point::{extend_by_shifting, SearchPoint};
pub use space::{DomainKind, ParameterDomain, SearchSpace, SpaceHandle};
