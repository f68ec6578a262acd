//! Input/output helpers.
//!
//! - curve file ingest + row validation (`ingest`)
//! - `-i/--input` wildcard expansion (`pattern`)
//! - scaled curve CSV and summary JSON exports (`export`)

pub mod export;
pub mod ingest;
pub mod pattern;

pub use export::*;
pub use ingest::*;
pub use pattern::expand_patterns;
