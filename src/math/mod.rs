//! Mathematical utilities: interpolation and nonlinear least squares.

pub mod interp;
pub mod lm;

pub use interp::*;
pub use lm::*;
