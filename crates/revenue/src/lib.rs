//! Revenue pool.
//!
//! Per (asset, currency) accounting of received, accumulated and distributed
//! funds, plus per-owner pending balances. Distribution is pro-rata over the
//! ownership ledger's economic percentages using floor division; rounding
//! residue stays in the pool rather than being force-flushed.

pub mod account;
pub mod pool;

pub use account::{PendingBalance, RevenueAccount};
pub use pool::RevenuePool;
