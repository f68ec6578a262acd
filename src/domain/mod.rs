//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - curves and their samples (`Curve`, `Sample`, `DerivedSeries`)
//! - the shared fit interval (`Domain`)
//! - parameter modes (`ParamSpec`, `ParamValue`, `ParamAssignment`)
//! - fit outputs (`FitResult`, `FitOutcome`, `SummaryRow`)

pub mod types;

pub use types::*;
