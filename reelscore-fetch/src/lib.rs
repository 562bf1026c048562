//! reelscore fetch layer
//!
//! Outbound HTTP for the extractors:
//! - Browser-like request identity rotated per attempt
//! - Per-attempt timeout with linear backoff retry
//! - Politeness delay after successful fetches
//! - Interchangeable page fetchers (plain HTTP, shared session, fixtures)
//! - Visible text extraction for scanning strategies

pub mod client;
pub mod retry;
pub mod fetcher;
pub mod fixture;
pub mod page;

pub use client::*;
pub use retry::*;
pub use fetcher::*;
pub use fixture::*;
