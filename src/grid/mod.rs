//! Synthetic test grid.
//!
//! - feature range generation (`ranges`)
//! - cartesian-product construction and row lookup (`builder`)

pub mod builder;
pub mod ranges;

pub use builder::*;
pub use ranges::*;
