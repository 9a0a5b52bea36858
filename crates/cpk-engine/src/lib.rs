//! cpk-engine
//!
//! Tenant-scoped service facade. Every call names the workspace it acts
//! for; reads go through the `Store`, decisions through the pure planners
//! of the kernel crates, and writes back through the `Store`.

mod contracts;
mod engine;
mod ledger;
mod reports;
mod settings;

pub use engine::Engine;
pub use settings::EngineSettings;
