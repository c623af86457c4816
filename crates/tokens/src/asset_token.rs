//! Asset token ledger interface and in-memory implementation.
//!
//! Fungible per-asset balances are owned by this collaborator; the engine
//! only mints pro-rata at registration and on explicit additional-supply
//! mints, and treats balances as read-only otherwise.

use async_trait::async_trait;
use std::collections::HashMap;
use tessera_core::{Address, Amount, AssetId, Result};
use tokio::sync::RwLock;
use tracing::debug;

/// Mint/read interface of the per-asset fungible token ledger
#[async_trait]
pub trait AssetTokenLedger: Send + Sync {
    /// Mint `amount` units of `asset` to `recipient`
    async fn mint(&self, recipient: &Address, asset: AssetId, amount: Amount) -> Result<()>;

    /// Balance of `holder` in `asset` units
    async fn balance_of(&self, holder: &Address, asset: AssetId) -> Amount;
}

/// In-process asset token ledger
#[derive(Debug, Default)]
pub struct InMemoryAssetTokenLedger {
    balances: RwLock<HashMap<(AssetId, Address), Amount>>,
}

impl InMemoryAssetTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetTokenLedger for InMemoryAssetTokenLedger {
    async fn mint(&self, recipient: &Address, asset: AssetId, amount: Amount) -> Result<()> {
        let mut balances = self.balances.write().await;
        *balances.entry((asset, recipient.clone())).or_default() += amount;
        debug!(%recipient, asset, amount, "minted asset units");
        Ok(())
    }

    async fn balance_of(&self, holder: &Address, asset: AssetId) -> Amount {
        self.balances
            .read()
            .await
            .get(&(asset, holder.clone()))
            .copied()
            .unwrap_or(0)
    }
}
