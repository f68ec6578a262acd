//! `superimpose` library crate.
//!
//! Fits every curve of a set onto a reference curve through
//! `I_scaled(Q) = K*I(Q) - b`, with K and b free, fixed, or cycled from a list.
//!
//! The binary (`superimpose`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
