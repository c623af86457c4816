//! Shared foundation for the Tessera ledger engine.
//!
//! This crate carries everything the subsystem crates have in common:
//! identifiers and amount types, the unified error taxonomy, the clock
//! abstraction used for all deadline arithmetic, and the pre-call guards
//! (global pause switch plus per-component reentrancy marker) that every
//! mutating operation passes through.

pub mod error;
pub mod guard;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use guard::{EntryPermit, OpGuard, PauseSwitch};
pub use time::{Clock, ManualClock, SystemClock};
pub use types::{
    content_hash, Address, Amount, AssetId, Bps, LicenseId, ProposalId, Timestamp, BPS_DENOMINATOR,
};
