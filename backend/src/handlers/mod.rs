//! HTTP handlers for the FitStore inventory platform

pub mod customer;
pub mod health;
pub mod inventory;
pub mod product;
pub mod purchase;
pub mod reporting;
pub mod sale;
pub mod settings;

pub use customer::*;
pub use health::*;
pub use inventory::*;
pub use product::*;
pub use purchase::*;
pub use reporting::*;
pub use sale::*;
pub use settings::*;
