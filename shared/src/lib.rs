//! Shared domain logic for the FitStore inventory platform
//!
//! This crate contains the pure pieces of the system: FIFO costing math,
//! money conventions and input validation. It has no database or web
//! dependencies so the valuation logic can be tested in isolation.

pub mod costing;
pub mod types;
pub mod validation;

pub use costing::*;
pub use types::*;
pub use validation::*;
