//! Area analysis.
//!
//! Polygon geometry and the per-document aggregation pass.

pub mod aggregator;
pub mod geometry;

pub use aggregator::*;
