// Coop Ledger - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod error;
pub mod schema;         // Input validation
pub mod entities;       // Coop, Purchase, Expense, Activity, Invoice, Mortality
pub mod rotation;       // Coop rotation on chicken purchases
pub mod stock;          // Stock deduction rules
pub mod dashboard;
pub mod db;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{FarmConfig, ServerConfig};
pub use error::{FarmError, FarmResult};
pub use schema::{ValidationError, ValidationResult};
pub use entities::{
    Coop, CoopStatus, CoopUpdate,
    Purchase, PurchaseType, NewPurchase,
    Expense, ExpenseCategory, NewExpense,
    Activity, ActivityType, ActivityUpdate, NewActivity,
    Invoice, InvoiceStatus, InvoiceUpdate, NewInvoice,
    Mortality, MortalityCause, NewMortality,
};
pub use rotation::{plan_rotation, RotationPlan, SlotUpdate};
pub use stock::{plan_deduction, Deduction};
pub use dashboard::{AgeCategory, CoopAge, DashboardSummary};
pub use db::{Event, Store, setup_database, seed_coops, insert_event, get_events_for_entity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
