//! Reporting utilities: summary rows and their text rendering.

pub mod format;
pub mod summary;

pub use format::*;
pub use summary::*;
