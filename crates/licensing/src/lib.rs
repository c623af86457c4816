//! License registry.
//!
//! Per-license state machine (offer → approval → activation → suspension /
//! expiry → revocation / transfer), royalty accrual against reported usage,
//! and a lightweight asset-scoped license-proposal vote/execute flow. Fee and
//! royalty money moves licensee → pool through the payment ledger and is then
//! split pro-rata by the revenue pool.

pub mod license;
pub mod proposals;
pub mod registry;

#[cfg(test)]
pub(crate) mod testutil;

pub use license::{
    License, LicenseKind, LicenseStatus, LicenseTerms, RoyaltySchedule, APPROVAL_FEE_THRESHOLD,
    DEFAULT_ROYALTY_INTERVAL_SECS,
};
pub use proposals::{
    ApprovalPolicy, LicenseBlueprint, LicenseProposal, LICENSE_EXECUTION_WINDOW_SECS,
    LICENSE_VOTING_WINDOW_SECS,
};
pub use registry::LicenseRegistry;
