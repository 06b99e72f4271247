//! Analysis modules.
//!
//! `metrics` derives per-project values; `aggregator` rolls them up across
//! a collection.

pub mod aggregator;
pub mod metrics;

pub use aggregator::*;
pub use metrics::*;
