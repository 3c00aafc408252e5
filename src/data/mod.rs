//! Training data sources other than CSV files.

pub mod sample;

pub use sample::*;
