//! Business logic services for the FitStore inventory platform

pub mod customer;
pub mod inventory;
pub mod product;
pub mod purchase;
pub mod reporting;
pub mod sale;
pub mod settings;

pub use customer::CustomerService;
pub use inventory::InventoryService;
pub use product::ProductService;
pub use purchase::PurchaseService;
pub use reporting::ReportingService;
pub use sale::SaleService;
pub use settings::SettingsService;
