//! Governance scenarios driven through the assembled engine.

use std::sync::Arc;
use tessera::{
    Address, AssetKind, CommonsEngine, EmergencyAction, Error, GovernanceSettings,
    InMemoryAssetTokenLedger, InMemoryPaymentLedger, LicenseKind, LicenseStatus, LicenseTerms,
    ManualClock, ProposalPayload, TokenHub,
};
use tokio_test::block_on;

const USD: &str = "USDT";
const T0: u64 = 1_700_000_000;

fn addr(s: &str) -> Address {
    Address::new(s)
}

struct Setup {
    engine: CommonsEngine,
    clock: Arc<ManualClock>,
    payments: Arc<InMemoryPaymentLedger>,
    asset: u64,
}

async fn setup() -> Setup {
    let clock = Arc::new(ManualClock::new(T0));
    let payments = Arc::new(InMemoryPaymentLedger::new());
    let tokens = Arc::new(TokenHub::new());
    tokens.register(USD, payments.clone()).await;

    let engine = CommonsEngine::new(
        clock.clone(),
        tokens,
        Arc::new(InMemoryAssetTokenLedger::new()),
    );
    let asset = engine
        .ownership
        .register_asset(
            AssetKind::Software,
            "ipfs://project",
            1_000,
            vec![addr("o1"), addr("o2"), addr("o3")],
            vec![60, 30, 10],
            vec![600, 300, 100],
        )
        .await
        .unwrap();

    Setup {
        engine,
        clock,
        payments,
        asset,
    }
}

#[test]
fn test_weighted_proposal_passes_only_inside_its_window() {
    block_on(async {
        let s = setup().await;

        // Quorum 6000 bps over the 1000-weight snapshot -> 600
        s.engine
            .governance
            .set_governance_settings(
                s.asset,
                &addr("o1"),
                GovernanceSettings {
                    default_quorum_bps: 6_000,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let id = s
            .engine
            .governance
            .create_proposal(
                s.asset,
                &addr("o1"),
                ProposalPayload::AssetManagement {
                    metadata: Some("ipfs://project-v2".to_string()),
                    compliance: None,
                },
                None,
                "refresh metadata",
            )
            .await
            .unwrap();

        // Two owners vote for with combined weight 900 >= 600
        s.engine.governance.vote(id, &addr("o1"), true).await.unwrap();
        s.engine.governance.vote(id, &addr("o2"), true).await.unwrap();

        // Before and exactly at the voting deadline: not executable
        assert!(!s.engine.governance.can_execute(id).await.unwrap());
        s.clock.set(T0 + 3 * 86_400);
        assert!(!s.engine.governance.can_execute(id).await.unwrap());

        // Inside the window: executable
        s.clock.advance(1);
        assert!(s.engine.governance.can_execute(id).await.unwrap());
        let (metadata_changed, _) = s
            .engine
            .governance
            .execute_asset_management(id)
            .await
            .unwrap();
        assert!(metadata_changed);
        assert_eq!(
            s.engine.ownership.get_asset(s.asset).await.unwrap().metadata,
            "ipfs://project-v2"
        );
    });
}

#[test]
fn test_execution_window_closes() {
    block_on(async {
        let s = setup().await;
        let id = s
            .engine
            .governance
            .create_proposal(
                s.asset,
                &addr("o1"),
                ProposalPayload::AssetManagement {
                    metadata: Some("ipfs://late".to_string()),
                    compliance: None,
                },
                None,
                "too late",
            )
            .await
            .unwrap();
        s.engine.governance.vote(id, &addr("o1"), true).await.unwrap();

        // One second past the execution deadline
        s.clock.set(T0 + 4 * 86_400 + 1);
        assert!(!s.engine.governance.can_execute(id).await.unwrap());
        let err = s
            .engine
            .governance
            .execute_asset_management(id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::State(_)));
    });
}

#[test]
fn test_emergency_suspends_all_licenses_and_trips_pause() {
    block_on(async {
        let s = setup().await;
        let studio = addr("studio");

        // Two active licenses on the asset
        for _ in 0..2 {
            let id = s
                .engine
                .licensing
                .create_offer(
                    s.asset,
                    &addr("o1"),
                    studio.clone(),
                    LicenseKind::NonExclusive,
                    "embedding",
                    "worldwide",
                    0,
                    0,
                    0,
                    USD,
                    "terms",
                    LicenseTerms::default(),
                )
                .await
                .unwrap();
            s.engine.licensing.execute(id, &studio).await.unwrap();
        }

        let suspend = s
            .engine
            .governance
            .create_proposal(
                s.asset,
                &addr("o2"),
                ProposalPayload::Emergency {
                    action: EmergencyAction::SuspendAllLicenses {
                        duration_secs: 30 * 86_400,
                    },
                },
                None,
                "widespread infringement",
            )
            .await
            .unwrap();
        let trip = s
            .engine
            .governance
            .create_proposal(
                s.asset,
                &addr("o2"),
                ProposalPayload::Emergency {
                    action: EmergencyAction::TripPause,
                },
                None,
                "halt while investigating",
            )
            .await
            .unwrap();

        // Emergency quorum is 30% of 1000 = 300; o2 alone carries it
        s.engine.governance.vote(suspend, &addr("o2"), true).await.unwrap();
        s.engine.governance.vote(trip, &addr("o2"), true).await.unwrap();

        s.clock.advance(86_400 + 1);
        s.engine.governance.execute_emergency(suspend).await.unwrap();
        assert_eq!(
            s.engine.licensing.status(1).await.unwrap(),
            LicenseStatus::Suspended
        );
        assert_eq!(
            s.engine.licensing.status(2).await.unwrap(),
            LicenseStatus::Suspended
        );

        s.engine.governance.execute_emergency(trip).await.unwrap();
        assert!(s.engine.pause.is_paused());

        // Every ordinary mutating operation is halted
        s.payments.deposit(&addr("label"), 100).await;
        s.payments
            .approve(&addr("label"), s.engine.revenue.pool_account(), 100)
            .await;
        let err = s
            .engine
            .revenue
            .receive_revenue(s.asset, &addr("label"), USD, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::State(ref r) if r.contains("paused")));

        let err = s
            .engine
            .ownership
            .transfer_share(s.asset, &addr("o1"), &addr("o2"), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::State(ref r) if r.contains("paused")));

        // An emergency proposal can still lift the pause
        let lift = s
            .engine
            .governance
            .create_proposal(
                s.asset,
                &addr("o1"),
                ProposalPayload::Emergency {
                    action: EmergencyAction::LiftPause,
                },
                None,
                "all clear",
            )
            .await
            .unwrap();
        s.engine.governance.vote(lift, &addr("o1"), true).await.unwrap();
        s.clock.advance(86_400 + 1);
        s.engine.governance.execute_emergency(lift).await.unwrap();
        assert!(!s.engine.pause.is_paused());

        s.engine
            .revenue
            .receive_revenue(s.asset, &addr("label"), USD, 100)
            .await
            .unwrap();
    });
}

#[test]
fn test_revenue_policy_proposal_reaches_the_pool() {
    block_on(async {
        let s = setup().await;
        let id = s
            .engine
            .governance
            .create_proposal(
                s.asset,
                &addr("o3"),
                ProposalPayload::RevenuePolicy {
                    currency: USD.to_string(),
                    minimum_distribution: 1_000,
                },
                Some(86_400),
                "stop dust distributions",
            )
            .await
            .unwrap();
        s.engine.governance.vote(id, &addr("o1"), true).await.unwrap();

        s.clock.advance(86_400 + 1);
        s.engine.governance.execute_revenue_policy(id).await.unwrap();

        assert_eq!(
            s.engine
                .revenue
                .revenue_account(s.asset, USD)
                .await
                .unwrap()
                .minimum_distribution,
            1_000
        );
    });
}
