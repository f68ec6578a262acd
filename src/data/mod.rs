//! Data sources other than curve files on disk.

pub mod synthetic;

pub use synthetic::*;
