//! Input/output helpers.
//!
//! - training-table CSV ingest (`ingest`)
//! - predictions CSV write/read (`export`)
//! - curves JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
