//! Shared fixture for the registry and proposal test modules.

use crate::proposals::ApprovalPolicy;
use crate::registry::LicenseRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tessera_core::{Address, Amount, AssetId, Bps, ManualClock, PauseSwitch};
use tessera_ownership::{AssetKind, OwnershipLedger};
use tessera_revenue::RevenuePool;
use tessera_tokens::{InMemoryAssetTokenLedger, InMemoryPaymentLedger, TokenHub};

pub(crate) const USD: &str = "USDT";
pub(crate) const T0: u64 = 1_000_000;

/// Policy stub returning one fixed quorum fraction
pub(crate) struct FixedPolicy(pub Bps);

#[async_trait]
impl ApprovalPolicy for FixedPolicy {
    async fn license_quorum_bps(&self, _asset: AssetId) -> Bps {
        self.0
    }
}

pub(crate) struct Fixture {
    pub clock: Arc<ManualClock>,
    pub pause: Arc<PauseSwitch>,
    pub ownership: Arc<OwnershipLedger>,
    pub revenue: Arc<RevenuePool>,
    pub payments: Arc<InMemoryPaymentLedger>,
    pub registry: LicenseRegistry,
    pub asset: AssetId,
}

pub(crate) fn addr(s: &str) -> Address {
    Address::new(s)
}

/// One asset owned 60/30/10 by o1/o2/o3 with weights 600/300/100, a USDT
/// payment ledger, and a registry with a 50% license quorum.
pub(crate) async fn fixture() -> Fixture {
    let clock = Arc::new(ManualClock::new(T0));
    let pause = Arc::new(PauseSwitch::new());
    let ownership = Arc::new(OwnershipLedger::new(
        clock.clone(),
        pause.clone(),
        Arc::new(InMemoryAssetTokenLedger::new()),
    ));
    let asset = ownership
        .register_asset(
            AssetKind::Music,
            "ipfs://meta",
            1_000,
            vec![addr("o1"), addr("o2"), addr("o3")],
            vec![60, 30, 10],
            vec![600, 300, 100],
        )
        .await
        .expect("fixture asset");

    let payments = Arc::new(InMemoryPaymentLedger::new());
    let tokens = Arc::new(TokenHub::new());
    tokens.register(USD, payments.clone()).await;

    let revenue = Arc::new(RevenuePool::new(
        pause.clone(),
        ownership.clone(),
        tokens.clone(),
    ));
    let registry = LicenseRegistry::new(
        pause.clone(),
        clock.clone(),
        ownership.clone(),
        revenue.clone(),
        tokens,
        Arc::new(FixedPolicy(5_000)),
    );

    Fixture {
        clock,
        pause,
        ownership,
        revenue,
        payments,
        registry,
        asset,
    }
}

/// Give `who` spendable funds approved toward the revenue pool
pub(crate) async fn fund(fix: &Fixture, who: &Address, amount: Amount) {
    fix.payments.deposit(who, amount).await;
    fix.payments
        .approve(who, fix.revenue.pool_account(), amount)
        .await;
}
