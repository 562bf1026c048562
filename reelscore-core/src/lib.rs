//! reelscore core - domain model for unified movie scores
//!
//! This crate provides the foundational primitives:
//! - Review sources and their native rating scales
//! - Bounds-checked ratings and the unified-score combination
//! - Title normalization and permissive matching
//! - Review site registry (search URL templates)
//! - Explicit score override table

pub mod score;
pub mod sites;
pub mod title;
pub mod overrides;

pub use score::*;
pub use sites::*;
pub use title::*;
pub use overrides::*;

/// Plausible release years, excluded when scanning free text for scores
pub const RELEASE_YEARS: std::ops::RangeInclusive<u32> = 1888..=2100;

/// Upper bound of the unified score scale
pub const UNIFIED_MAX: u32 = 100;
