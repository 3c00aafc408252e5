//! Terminal plots of marginal curves.

pub mod ascii;

pub use ascii::*;
