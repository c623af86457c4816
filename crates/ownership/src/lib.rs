//! Fractional ownership ledger.
//!
//! This is the leaf subsystem of the engine: it owns the asset records and
//! the per-asset mapping of owner → (economic percentage, governance weight),
//! and everything else reads from it. Percentages are integers that sum to
//! exactly 100 per asset at every quiescent point.

pub mod asset;
pub mod ledger;

pub use asset::{Asset, AssetKind, ComplianceStatus};
pub use ledger::{OwnerEntry, OwnershipLedger};
