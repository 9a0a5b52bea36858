//! cpk-store
//!
//! Persistence contract for the cash-planning engines.
//! - Every call carries the tenant id; rows of other tenants are invisible
//! - Range queries take explicit optional filters (absent = unfiltered)
//! - Lock-sensitive writes (contract saves, billing, schedule links) are
//!   planned and written under a per-tenant write lock inside the
//!   implementation
//!
//! Implementations: `cpk-db` (PostgreSQL) and `cpk-testkit` (in memory).

mod contract;
mod filter;
mod store;

pub use contract::{plan_contract, ContractCommand, ContractEffect};
pub use filter::{ScheduleFilter, TransactionFilter};
pub use store::{ensure_owned, Store};
