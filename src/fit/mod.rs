//! Curve superposition.
//!
//! Responsibilities:
//!
//! - compute the common domain shared by every curve
//! - resolve per-curve K / b values (fixed, cyclic or free)
//! - fit each curve against the reference (parallel)

pub mod domain_range;
pub mod engine;
pub mod params;

pub use domain_range::*;
pub use engine::*;
pub use params::*;
