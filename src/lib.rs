//! Tessera, a ledger engine for collectively-owned intangible assets.
//!
//! Four subsystems share one ledger: the ownership ledger (fractional
//! economic shares with separate governance weights), the revenue pool
//! (multi-currency pro-rata distribution), the license registry (offer →
//! approval → activation → suspension/expiry → revocation/transfer), and the
//! governance engine (weighted, quorum-gated, time-boxed proposals). The
//! [`CommonsEngine`] constructs and wires them around one shared pause
//! switch, clock and token hub.

use std::sync::Arc;
use tracing::info;

pub use tessera_core::{
    content_hash, Address, Amount, AssetId, Bps, Clock, Error, LicenseId, ManualClock, PauseSwitch,
    ProposalId, Result, SystemClock, Timestamp,
};
pub use tessera_governance::{
    EmergencyAction, GovernanceEngine, GovernanceSettings, Proposal, ProposalCategory,
    ProposalPayload, SettingsStore,
};
pub use tessera_licensing::{
    License, LicenseBlueprint, LicenseKind, LicenseProposal, LicenseRegistry, LicenseStatus,
    LicenseTerms, RoyaltySchedule,
};
pub use tessera_ownership::{Asset, AssetKind, ComplianceStatus, OwnerEntry, OwnershipLedger};
pub use tessera_revenue::{PendingBalance, RevenueAccount, RevenuePool};
pub use tessera_tokens::{
    AssetTokenLedger, InMemoryAssetTokenLedger, InMemoryPaymentLedger, PaymentLedger, TokenHub,
};

/// The assembled engine: every subsystem wired to the same pause switch,
/// clock, ownership ledger and token collaborators.
pub struct CommonsEngine {
    pub pause: Arc<PauseSwitch>,
    pub clock: Arc<dyn Clock>,
    pub tokens: Arc<TokenHub>,
    pub asset_tokens: Arc<dyn AssetTokenLedger>,
    pub ownership: Arc<OwnershipLedger>,
    pub revenue: Arc<RevenuePool>,
    pub licensing: Arc<LicenseRegistry>,
    pub settings: Arc<SettingsStore>,
    pub governance: Arc<GovernanceEngine>,
}

impl CommonsEngine {
    /// Wire up a full engine against the given clock and token collaborators.
    pub fn new(
        clock: Arc<dyn Clock>,
        tokens: Arc<TokenHub>,
        asset_tokens: Arc<dyn AssetTokenLedger>,
    ) -> Self {
        let pause = Arc::new(PauseSwitch::new());
        let ownership = Arc::new(OwnershipLedger::new(
            clock.clone(),
            pause.clone(),
            asset_tokens.clone(),
        ));
        let revenue = Arc::new(RevenuePool::new(
            pause.clone(),
            ownership.clone(),
            tokens.clone(),
        ));
        let settings = Arc::new(SettingsStore::new());
        let licensing = Arc::new(LicenseRegistry::new(
            pause.clone(),
            clock.clone(),
            ownership.clone(),
            revenue.clone(),
            tokens.clone(),
            settings.clone(),
        ));
        let governance = Arc::new(GovernanceEngine::new(
            pause.clone(),
            clock.clone(),
            ownership.clone(),
            revenue.clone(),
            licensing.clone(),
            settings.clone(),
        ));

        info!("commons engine assembled");
        Self {
            pause,
            clock,
            tokens,
            asset_tokens,
            ownership,
            revenue,
            licensing,
            settings,
            governance,
        }
    }

    /// Convenience constructor on the wall clock
    pub fn with_system_clock(tokens: Arc<TokenHub>, asset_tokens: Arc<dyn AssetTokenLedger>) -> Self {
        Self::new(Arc::new(SystemClock), tokens, asset_tokens)
    }
}
