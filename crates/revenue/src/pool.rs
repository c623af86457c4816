//! The revenue pool.

use crate::account::{PendingBalance, RevenueAccount};
use std::collections::HashMap;
use std::sync::Arc;
use tessera_core::{Address, Amount, AssetId, Error, OpGuard, PauseSwitch, Result};
use tessera_ownership::OwnershipLedger;
use tessera_tokens::TokenHub;
use tokio::sync::RwLock;
use tracing::{debug, info};

type CurrencyKey = (AssetId, String);

/// Pooled multi-currency revenue accounting, split pro-rata over the
/// ownership ledger.
pub struct RevenuePool {
    guard: OpGuard,
    ownership: Arc<OwnershipLedger>,
    tokens: Arc<TokenHub>,
    pool_account: Address,
    accounts: RwLock<HashMap<CurrencyKey, RevenueAccount>>,
    pending: RwLock<HashMap<CurrencyKey, HashMap<Address, PendingBalance>>>,
}

impl RevenuePool {
    pub fn new(
        pause: Arc<PauseSwitch>,
        ownership: Arc<OwnershipLedger>,
        tokens: Arc<TokenHub>,
    ) -> Self {
        Self {
            guard: OpGuard::new(pause),
            ownership,
            tokens,
            pool_account: Address::new("tessera:revenue-pool"),
            accounts: RwLock::new(HashMap::new()),
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// The address holding pooled funds on the payment ledgers
    pub fn pool_account(&self) -> &Address {
        &self.pool_account
    }

    /// Pull `amount` of `currency` from the caller into the pool
    pub async fn receive_revenue(
        &self,
        asset: AssetId,
        caller: &Address,
        currency: &str,
        amount: Amount,
    ) -> Result<()> {
        let _permit = self.guard.enter("receive_revenue")?;

        if amount == 0 {
            return Err(Error::validation("revenue amount must be positive"));
        }
        if self.ownership.owner_count(asset).await == 0 {
            return Err(Error::state(format!(
                "asset {asset} has no active ownership record"
            )));
        }

        let ledger = self.tokens.ledger(currency).await?;
        ledger
            .transfer_from(caller, &self.pool_account, amount)
            .await?;

        let mut accounts = self.accounts.write().await;
        accounts
            .entry((asset, currency.to_string()))
            .or_default()
            .record_receipt(amount);

        info!(asset, currency, amount, %caller, "revenue received");
        Ok(())
    }

    /// Owner-initiated pro-rata distribution of `amount` into pending
    /// balances. Returns the total actually credited (floor residue stays in
    /// the pool).
    pub async fn distribute_revenue(
        &self,
        asset: AssetId,
        caller: &Address,
        currency: &str,
        amount: Amount,
    ) -> Result<Amount> {
        let _permit = self.guard.enter("distribute_revenue")?;
        self.distribute_inner(asset, caller, currency, amount).await
    }

    /// Distribute everything currently accumulated. No-op returning 0 when
    /// the pool holds nothing for this (asset, currency).
    pub async fn distribute_all_revenue(
        &self,
        asset: AssetId,
        caller: &Address,
        currency: &str,
    ) -> Result<Amount> {
        let _permit = self.guard.enter("distribute_all_revenue")?;

        let accumulated = {
            let accounts = self.accounts.read().await;
            accounts
                .get(&(asset, currency.to_string()))
                .map(|a| a.accumulated)
                .unwrap_or(0)
        };
        if accumulated == 0 {
            return Ok(0);
        }
        self.distribute_inner(asset, caller, currency, accumulated)
            .await
    }

    async fn distribute_inner(
        &self,
        asset: AssetId,
        caller: &Address,
        currency: &str,
        amount: Amount,
    ) -> Result<Amount> {
        if amount == 0 {
            return Err(Error::validation("distribution amount must be positive"));
        }
        if !self.ownership.is_owner(asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {asset}"
            )));
        }

        let key = (asset, currency.to_string());
        {
            let accounts = self.accounts.read().await;
            let account = accounts.get(&key).cloned().unwrap_or_default();
            if amount > account.accumulated {
                return Err(Error::insufficient_funds(format!(
                    "requested {amount} exceeds accumulated {} for asset {asset} in {currency}",
                    account.accumulated
                )));
            }
            if amount < account.minimum_distribution {
                return Err(Error::validation(format!(
                    "requested {amount} is below the minimum distribution of {}",
                    account.minimum_distribution
                )));
            }
        }

        let shares = self.pro_rata_shares(asset, amount).await;
        let distributed: Amount = shares.iter().map(|(_, share)| share).sum();

        let mut pending = self.pending.write().await;
        let per_owner = pending.entry(key.clone()).or_default();
        for (owner, share) in &shares {
            if *share > 0 {
                per_owner.entry(owner.clone()).or_default().credit(*share);
            }
        }
        drop(pending);

        let mut accounts = self.accounts.write().await;
        accounts
            .entry(key)
            .or_default()
            .record_distribution(distributed);

        info!(asset, currency, amount, distributed, "revenue distributed");
        Ok(distributed)
    }

    /// Pay out the caller's entire pending balance
    pub async fn withdraw_pending_revenue(
        &self,
        asset: AssetId,
        caller: &Address,
        currency: &str,
    ) -> Result<Amount> {
        let _permit = self.guard.enter("withdraw_pending_revenue")?;

        if !self.ownership.is_owner(asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {asset}"
            )));
        }

        let key = (asset, currency.to_string());
        let amount = {
            let pending = self.pending.read().await;
            pending
                .get(&key)
                .and_then(|per_owner| per_owner.get(caller))
                .map(|p| p.amount)
                .unwrap_or(0)
        };
        if amount == 0 {
            return Err(Error::insufficient_funds(format!(
                "{caller} has nothing to withdraw for asset {asset} in {currency}"
            )));
        }

        let ledger = self.tokens.ledger(currency).await?;
        ledger.transfer(&self.pool_account, caller, amount).await?;

        let mut pending = self.pending.write().await;
        if let Some(balance) = pending
            .get_mut(&key)
            .and_then(|per_owner| per_owner.get_mut(caller))
        {
            balance.drain();
        }

        info!(asset, currency, amount, %caller, "pending revenue withdrawn");
        Ok(amount)
    }

    /// Owner-gated dust-prevention floor
    pub async fn set_minimum_distribution(
        &self,
        asset: AssetId,
        caller: &Address,
        currency: &str,
        amount: Amount,
    ) -> Result<()> {
        let _permit = self.guard.enter("set_minimum_distribution")?;

        if !self.ownership.is_owner(asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {asset}"
            )));
        }

        let mut accounts = self.accounts.write().await;
        accounts
            .entry((asset, currency.to_string()))
            .or_default()
            .minimum_distribution = amount;
        Ok(())
    }

    /// Governance-executed revenue-policy change
    pub async fn apply_policy_minimum(
        &self,
        asset: AssetId,
        currency: &str,
        amount: Amount,
    ) -> Result<()> {
        let _permit = self.guard.enter("apply_policy_minimum")?;

        let mut accounts = self.accounts.write().await;
        accounts
            .entry((asset, currency.to_string()))
            .or_default()
            .minimum_distribution = amount;

        info!(asset, currency, amount, "minimum distribution set by policy");
        Ok(())
    }

    /// Split an already-pooled fee or royalty payment among owners.
    ///
    /// Called by the license registry after it has moved the funds into the
    /// pool; bypasses the minimum-distribution floor since the split is not
    /// owner-initiated. Returns the total credited.
    pub async fn route_fee(
        &self,
        asset: AssetId,
        currency: &str,
        amount: Amount,
    ) -> Result<Amount> {
        let _permit = self.guard.enter("route_fee")?;

        if amount == 0 {
            return Err(Error::validation("fee amount must be positive"));
        }
        if self.ownership.owner_count(asset).await == 0 {
            return Err(Error::state(format!(
                "asset {asset} has no active ownership record"
            )));
        }

        let shares = self.pro_rata_shares(asset, amount).await;
        let distributed: Amount = shares.iter().map(|(_, share)| share).sum();

        let key = (asset, currency.to_string());
        let mut pending = self.pending.write().await;
        let per_owner = pending.entry(key.clone()).or_default();
        for (owner, share) in &shares {
            if *share > 0 {
                per_owner.entry(owner.clone()).or_default().credit(*share);
            }
        }
        drop(pending);

        let mut accounts = self.accounts.write().await;
        accounts
            .entry(key)
            .or_default()
            .record_fee_routing(amount, distributed);

        debug!(asset, currency, amount, distributed, "fee routed");
        Ok(distributed)
    }

    async fn pro_rata_shares(&self, asset: AssetId, amount: Amount) -> Vec<(Address, Amount)> {
        self.ownership
            .owners_of(asset)
            .await
            .into_iter()
            .map(|(owner, entry)| (owner, amount * entry.percentage as u128 / 100))
            .collect()
    }

    // ---- pure reads ----

    /// Accounting snapshot for one (asset, currency)
    pub async fn revenue_account(&self, asset: AssetId, currency: &str) -> Option<RevenueAccount> {
        self.accounts
            .read()
            .await
            .get(&(asset, currency.to_string()))
            .cloned()
    }

    /// One owner's pending balance (zeroes when never credited)
    pub async fn pending_of(
        &self,
        asset: AssetId,
        owner: &Address,
        currency: &str,
    ) -> PendingBalance {
        self.pending
            .read()
            .await
            .get(&(asset, currency.to_string()))
            .and_then(|per_owner| per_owner.get(owner))
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::OnceLock;
    use tessera_core::ManualClock;
    use tessera_ownership::AssetKind;
    use tessera_tokens::{
        AssetTokenLedger, InMemoryAssetTokenLedger, InMemoryPaymentLedger, PaymentLedger,
    };

    const USD: &str = "USDT";

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    struct Fixture {
        pool: Arc<RevenuePool>,
        ownership: Arc<OwnershipLedger>,
        payments: Arc<InMemoryPaymentLedger>,
        asset: AssetId,
    }

    async fn fixture() -> Fixture {
        let pause = Arc::new(PauseSwitch::new());
        let ownership = Arc::new(OwnershipLedger::new(
            Arc::new(ManualClock::new(1_000)),
            pause.clone(),
            Arc::new(InMemoryAssetTokenLedger::new()),
        ));
        let asset = ownership
            .register_asset(
                AssetKind::Music,
                "ipfs://meta",
                1_000,
                vec![addr("o1"), addr("o2"), addr("o3")],
                vec![50, 40, 10],
                vec![500, 400, 100],
            )
            .await
            .unwrap();

        let payments = Arc::new(InMemoryPaymentLedger::new());
        let tokens = Arc::new(TokenHub::new());
        tokens.register(USD, payments.clone()).await;

        let pool = Arc::new(RevenuePool::new(pause, ownership.clone(), tokens));
        Fixture {
            pool,
            ownership,
            payments,
            asset,
        }
    }

    async fn fund(fix: &Fixture, payer: &Address, amount: Amount) {
        fix.payments.deposit(payer, amount).await;
        fix.payments
            .approve(payer, fix.pool.pool_account(), amount)
            .await;
    }

    #[tokio::test]
    async fn test_receive_then_distribute_all_splits_evenly() {
        let fix = fixture().await;
        let payer = addr("label");
        fund(&fix, &payer, 1_000).await;

        fix.pool
            .receive_revenue(fix.asset, &payer, USD, 1_000)
            .await
            .unwrap();

        let account = fix.pool.revenue_account(fix.asset, USD).await.unwrap();
        assert_eq!(account.total_received, 1_000);
        assert_eq!(account.accumulated, 1_000);

        let distributed = fix
            .pool
            .distribute_all_revenue(fix.asset, &addr("o1"), USD)
            .await
            .unwrap();
        assert_eq!(distributed, 1_000);

        // 50/40/10 over 1000 divides evenly: no residue
        assert_eq!(fix.pool.pending_of(fix.asset, &addr("o1"), USD).await.amount, 500);
        assert_eq!(fix.pool.pending_of(fix.asset, &addr("o2"), USD).await.amount, 400);
        assert_eq!(fix.pool.pending_of(fix.asset, &addr("o3"), USD).await.amount, 100);

        let account = fix.pool.revenue_account(fix.asset, USD).await.unwrap();
        assert_eq!(account.accumulated, 0);
        assert_eq!(account.total_distributed, 1_000);
        assert_eq!(account.distribution_count, 1);
    }

    #[tokio::test]
    async fn test_floor_residue_stays_pooled() {
        let fix = fixture().await;
        let payer = addr("label");
        fund(&fix, &payer, 7).await;

        fix.pool
            .receive_revenue(fix.asset, &payer, USD, 7)
            .await
            .unwrap();
        let distributed = fix
            .pool
            .distribute_revenue(fix.asset, &addr("o1"), USD, 7)
            .await
            .unwrap();

        // floor(7*50/100)=3, floor(7*40/100)=2, floor(7*10/100)=0
        assert_eq!(distributed, 5);
        assert_eq!(fix.pool.pending_of(fix.asset, &addr("o3"), USD).await.amount, 0);

        let account = fix.pool.revenue_account(fix.asset, USD).await.unwrap();
        assert_eq!(account.accumulated, 2);
        assert_eq!(
            account.accumulated,
            account.total_received - account.total_distributed
        );
    }

    #[tokio::test]
    async fn test_distribution_preconditions() {
        let fix = fixture().await;
        let payer = addr("label");
        fund(&fix, &payer, 1_000).await;
        fix.pool
            .receive_revenue(fix.asset, &payer, USD, 1_000)
            .await
            .unwrap();

        let err = fix
            .pool
            .distribute_revenue(fix.asset, &addr("stranger"), USD, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        let err = fix
            .pool
            .distribute_revenue(fix.asset, &addr("o1"), USD, 1_001)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds(_)));

        fix.pool
            .set_minimum_distribution(fix.asset, &addr("o1"), USD, 500)
            .await
            .unwrap();
        let err = fix
            .pool
            .distribute_revenue(fix.asset, &addr("o1"), USD, 400)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Nothing was credited along the way
        assert_eq!(fix.pool.pending_of(fix.asset, &addr("o1"), USD).await.amount, 0);
    }

    #[tokio::test]
    async fn test_withdraw_is_idempotent_safe() {
        let fix = fixture().await;
        let payer = addr("label");
        fund(&fix, &payer, 1_000).await;
        fix.pool
            .receive_revenue(fix.asset, &payer, USD, 1_000)
            .await
            .unwrap();
        fix.pool
            .distribute_all_revenue(fix.asset, &addr("o1"), USD)
            .await
            .unwrap();

        let taken = fix
            .pool
            .withdraw_pending_revenue(fix.asset, &addr("o2"), USD)
            .await
            .unwrap();
        assert_eq!(taken, 400);
        assert_eq!(fix.payments.balance_of(&addr("o2")).await, 400);

        let pending = fix.pool.pending_of(fix.asset, &addr("o2"), USD).await;
        assert_eq!(pending.amount, 0);
        assert_eq!(pending.total_earned, 400);
        assert_eq!(pending.total_withdrawn, 400);

        let err = fix
            .pool
            .withdraw_pending_revenue(fix.asset, &addr("o2"), USD)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds(_)));
    }

    #[tokio::test]
    async fn test_receive_requires_funds_and_ownership_record() {
        let fix = fixture().await;
        let payer = addr("label");

        // No allowance granted
        fix.payments.deposit(&payer, 100).await;
        let err = fix
            .pool
            .receive_revenue(fix.asset, &payer, USD, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds(_)));
        assert!(fix.pool.revenue_account(fix.asset, USD).await.is_none());

        // Unregistered asset
        fund(&fix, &payer, 100).await;
        let err = fix
            .pool
            .receive_revenue(99, &payer, USD, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::State(_)));

        let err = fix
            .pool
            .receive_revenue(fix.asset, &payer, USD, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_route_fee_bypasses_minimum_floor() {
        let fix = fixture().await;
        fix.pool
            .set_minimum_distribution(fix.asset, &addr("o1"), USD, 10_000)
            .await
            .unwrap();

        let distributed = fix.pool.route_fee(fix.asset, USD, 1_000).await.unwrap();
        assert_eq!(distributed, 1_000);
        assert_eq!(fix.pool.pending_of(fix.asset, &addr("o1"), USD).await.amount, 500);

        let account = fix.pool.revenue_account(fix.asset, USD).await.unwrap();
        assert_eq!(account.total_received, 1_000);
        assert_eq!(account.total_distributed, 1_000);
        assert_eq!(account.distribution_count, 0);
    }

    /// A payment ledger that re-enters the pool mid-transfer, as a malicious
    /// token contract would.
    #[derive(Default)]
    struct ReentrantLedger {
        pool: OnceLock<Arc<RevenuePool>>,
    }

    #[async_trait]
    impl PaymentLedger for ReentrantLedger {
        async fn transfer_from(
            &self,
            payer: &Address,
            _recipient: &Address,
            _amount: Amount,
        ) -> Result<()> {
            match self.pool.get() {
                Some(pool) => pool.receive_revenue(1, payer, "EVIL", 1).await,
                None => Ok(()),
            }
        }

        async fn transfer(&self, _from: &Address, _to: &Address, _amount: Amount) -> Result<()> {
            Ok(())
        }

        async fn balance_of(&self, _holder: &Address) -> Amount {
            0
        }

        async fn allowance(&self, _owner: &Address, _spender: &Address) -> Amount {
            0
        }
    }

    #[tokio::test]
    async fn test_reentrant_payment_ledger_is_rejected() {
        let pause = Arc::new(PauseSwitch::new());
        let ownership = Arc::new(OwnershipLedger::new(
            Arc::new(ManualClock::new(0)),
            pause.clone(),
            Arc::new(InMemoryAssetTokenLedger::new()),
        ));
        let asset = ownership
            .register_asset(
                AssetKind::Other,
                "m",
                100,
                vec![addr("o1")],
                vec![100],
                vec![1],
            )
            .await
            .unwrap();

        let evil = Arc::new(ReentrantLedger::default());
        let tokens = Arc::new(TokenHub::new());
        tokens.register("EVIL", evil.clone()).await;

        let pool = Arc::new(RevenuePool::new(pause, ownership, tokens));
        let _ = evil.pool.set(pool.clone());

        let err = pool
            .receive_revenue(asset, &addr("o1"), "EVIL", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Reentrancy(_)));

        // The aborted call left no partial state behind
        assert!(pool.revenue_account(asset, "EVIL").await.is_none());
    }

    #[tokio::test]
    async fn test_zero_percentage_owner_gets_vacuous_share() {
        let fix = fixture().await;

        // Drain o3 to zero; the entry stays enumerated
        fix.ownership
            .transfer_share(fix.asset, &addr("o3"), &addr("o1"), 10)
            .await
            .unwrap();

        let payer = addr("label");
        fund(&fix, &payer, 1_000).await;
        fix.pool
            .receive_revenue(fix.asset, &payer, USD, 1_000)
            .await
            .unwrap();
        fix.pool
            .distribute_all_revenue(fix.asset, &addr("o1"), USD)
            .await
            .unwrap();

        assert_eq!(fix.pool.pending_of(fix.asset, &addr("o3"), USD).await.amount, 0);
        assert_eq!(fix.pool.pending_of(fix.asset, &addr("o1"), USD).await.amount, 600);

        // o3 is still an owner, so withdrawal fails on funds, not authority
        let err = fix
            .pool
            .withdraw_pending_revenue(fix.asset, &addr("o3"), USD)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds(_)));
    }
}
