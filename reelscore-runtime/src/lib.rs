//! reelscore runtime
//!
//! Turns a title into an [`AggregateResult`](reelscore_core::AggregateResult)
//! by running every source extractor and combining what they return, and
//! scores whole title lists for offline runs.

pub mod aggregator;
pub mod batch;

pub use aggregator::*;
pub use batch::*;
