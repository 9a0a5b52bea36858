//! cpk-testkit
//!
//! Test doubles shared by the scenario suites:
//! - `MemoryStore`: the `Store` contract in memory, one async mutex per
//!   tenant, with per-tenant failure injection
//! - `StaticIndexRates`: fixed percentages per index, recording every call
//! - fixture builders for tenants, accounts, contracts and transactions

pub mod fixtures;
mod memory;
mod rates;

pub use memory::MemoryStore;
pub use rates::StaticIndexRates;
