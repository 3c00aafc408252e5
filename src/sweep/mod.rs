//! Marginal (partial-dependence) curves.
//!
//! - resolve-and-aggregate sweeps against a classifier (`marginal`)
//! - classifier-free aggregation of an already resolved grid (`aggregate`)

pub mod aggregate;
pub mod marginal;

pub use aggregate::*;
pub use marginal::*;
