//! The ownership ledger proper.

use crate::asset::{Asset, AssetKind, ComplianceStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_core::{Address, Amount, AssetId, Clock, Error, OpGuard, PauseSwitch, Result};
use tessera_tokens::AssetTokenLedger;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One owner's stake in an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerEntry {
    /// Economic percentage, 0–100
    pub percentage: u8,
    /// Governance weight, independent of the economic share
    pub weight: u128,
}

/// Per-asset owner set. Enumeration order is append-only: an owner whose
/// percentage reaches 0 stays listed and contributes a vacuous 0 share.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OwnerSet {
    entries: HashMap<Address, OwnerEntry>,
    order: Vec<Address>,
}

impl OwnerSet {
    fn insert(&mut self, owner: Address, entry: OwnerEntry) {
        if !self.entries.contains_key(&owner) {
            self.order.push(owner.clone());
        }
        self.entries.insert(owner, entry);
    }

    fn ordered(&self) -> Vec<(Address, OwnerEntry)> {
        self.order
            .iter()
            .filter_map(|addr| self.entries.get(addr).map(|e| (addr.clone(), *e)))
            .collect()
    }
}

/// Asset registry and owner-share ledger
pub struct OwnershipLedger {
    clock: Arc<dyn Clock>,
    guard: OpGuard,
    asset_tokens: Arc<dyn AssetTokenLedger>,
    assets: RwLock<HashMap<AssetId, Asset>>,
    owners: RwLock<HashMap<AssetId, OwnerSet>>,
    next_asset_id: AtomicU64,
}

impl OwnershipLedger {
    pub fn new(
        clock: Arc<dyn Clock>,
        pause: Arc<PauseSwitch>,
        asset_tokens: Arc<dyn AssetTokenLedger>,
    ) -> Self {
        Self {
            clock,
            guard: OpGuard::new(pause),
            asset_tokens,
            assets: RwLock::new(HashMap::new()),
            owners: RwLock::new(HashMap::new()),
            next_asset_id: AtomicU64::new(1),
        }
    }

    /// Register a new asset with its initial owner set, minting the nominal
    /// supply pro-rata through the asset token ledger.
    pub async fn register_asset(
        &self,
        kind: AssetKind,
        metadata: impl Into<String>,
        total_supply: Amount,
        owners: Vec<Address>,
        percentages: Vec<u8>,
        weights: Vec<u128>,
    ) -> Result<AssetId> {
        let _permit = self.guard.enter("register_asset")?;

        if total_supply == 0 {
            return Err(Error::validation("total supply must be positive"));
        }
        let set = build_owner_set(&owners, &percentages, &weights)?;

        let id = self.next_asset_id.fetch_add(1, Ordering::SeqCst);
        let asset = Asset::new(id, kind, metadata.into(), total_supply, self.clock.now());

        for (owner, entry) in set.ordered() {
            let units = total_supply * entry.percentage as u128 / 100;
            if units > 0 {
                self.asset_tokens.mint(&owner, id, units).await?;
            }
        }

        self.assets.write().await.insert(id, asset);
        self.owners.write().await.insert(id, set);

        info!(asset = id, owners = owners.len(), "registered asset");
        Ok(id)
    }

    /// Replace an asset's entire owner set atomically. Once an asset has an
    /// owner set, only a current owner may replace it.
    pub async fn register_ownership(
        &self,
        asset: AssetId,
        caller: &Address,
        owners: Vec<Address>,
        percentages: Vec<u8>,
        weights: Vec<u128>,
    ) -> Result<()> {
        let _permit = self.guard.enter("register_ownership")?;

        if !self.assets.read().await.contains_key(&asset) {
            return Err(Error::state(format!("asset {asset} not found")));
        }

        let set = build_owner_set(&owners, &percentages, &weights)?;

        let mut table = self.owners.write().await;
        if let Some(existing) = table.get(&asset) {
            if !existing.entries.is_empty() && !existing.entries.contains_key(caller) {
                return Err(Error::authorization(format!(
                    "{caller} is not an owner of asset {asset}"
                )));
            }
        }
        table.insert(asset, set);

        info!(asset, owners = owners.len(), "replaced owner set");
        Ok(())
    }

    /// Transfer part of `from`'s economic share to `to`, moving governance
    /// weight proportionally. `from` is the caller.
    pub async fn transfer_share(
        &self,
        asset: AssetId,
        from: &Address,
        to: &Address,
        percentage: u8,
    ) -> Result<()> {
        let _permit = self.guard.enter("transfer_share")?;

        if percentage == 0 || percentage > 100 {
            return Err(Error::validation(format!(
                "transfer percentage must be in 1..=100, got {percentage}"
            )));
        }
        if from == to {
            return Err(Error::validation("cannot transfer a share to oneself"));
        }

        let mut table = self.owners.write().await;
        let set = table
            .get_mut(&asset)
            .ok_or_else(|| Error::state(format!("asset {asset} has no ownership record")))?;

        let sender = *set
            .entries
            .get(from)
            .ok_or_else(|| Error::authorization(format!("{from} is not an owner of asset {asset}")))?;

        if sender.percentage < percentage {
            return Err(Error::insufficient_funds(format!(
                "{from} holds {}% of asset {asset}, below the {percentage}% requested",
                sender.percentage
            )));
        }

        // Weight moves in proportion to the share leaving, floored
        let weight_moved = sender.weight * percentage as u128 / sender.percentage as u128;

        if let Some(entry) = set.entries.get_mut(from) {
            entry.percentage -= percentage;
            entry.weight -= weight_moved;
        }
        match set.entries.get_mut(to) {
            Some(entry) => {
                entry.percentage += percentage;
                entry.weight += weight_moved;
            }
            None => {
                set.insert(
                    to.clone(),
                    OwnerEntry {
                        percentage,
                        weight: weight_moved,
                    },
                );
            }
        }

        debug!(asset, %from, %to, percentage, weight_moved, "transferred share");
        Ok(())
    }

    /// Owner-gated metadata update
    pub async fn update_metadata(
        &self,
        asset: AssetId,
        caller: &Address,
        metadata: impl Into<String>,
    ) -> Result<()> {
        let _permit = self.guard.enter("update_metadata")?;
        self.require_owner(asset, caller).await?;

        let mut assets = self.assets.write().await;
        let record = assets
            .get_mut(&asset)
            .ok_or_else(|| Error::state(format!("asset {asset} not found")))?;
        record.set_metadata(metadata.into());
        Ok(())
    }

    /// Owner-gated compliance tag update
    pub async fn set_compliance_status(
        &self,
        asset: AssetId,
        caller: &Address,
        status: ComplianceStatus,
    ) -> Result<()> {
        let _permit = self.guard.enter("set_compliance_status")?;
        self.require_owner(asset, caller).await?;

        let mut assets = self.assets.write().await;
        let record = assets
            .get_mut(&asset)
            .ok_or_else(|| Error::state(format!("asset {asset} not found")))?;
        record.compliance = status;
        Ok(())
    }

    /// Mint additional nominal supply pro-rata to the current owner set
    pub async fn mint_additional_supply(
        &self,
        asset: AssetId,
        caller: &Address,
        amount: Amount,
    ) -> Result<()> {
        let _permit = self.guard.enter("mint_additional_supply")?;

        if amount == 0 {
            return Err(Error::validation("mint amount must be positive"));
        }
        self.require_owner(asset, caller).await?;

        let holders = self.owners_of(asset).await;
        for (owner, entry) in holders {
            let units = amount * entry.percentage as u128 / 100;
            if units > 0 {
                self.asset_tokens.mint(&owner, asset, units).await?;
            }
        }

        let mut assets = self.assets.write().await;
        let record = assets
            .get_mut(&asset)
            .ok_or_else(|| Error::state(format!("asset {asset} not found")))?;
        record.total_supply += amount;

        info!(asset, amount, "minted additional supply");
        Ok(())
    }

    /// Apply a governance-executed metadata/compliance change. Reports which
    /// fields actually changed.
    pub async fn apply_governance_change(
        &self,
        asset: AssetId,
        metadata: Option<String>,
        compliance: Option<ComplianceStatus>,
    ) -> Result<(bool, bool)> {
        let _permit = self.guard.enter("apply_governance_change")?;

        let mut assets = self.assets.write().await;
        let record = assets
            .get_mut(&asset)
            .ok_or_else(|| Error::state(format!("asset {asset} not found")))?;

        let mut metadata_changed = false;
        if let Some(metadata) = metadata {
            if record.metadata != metadata {
                record.set_metadata(metadata);
                metadata_changed = true;
            }
        }

        let mut compliance_changed = false;
        if let Some(compliance) = compliance {
            if record.compliance != compliance {
                record.compliance = compliance;
                compliance_changed = true;
            }
        }

        Ok((metadata_changed, compliance_changed))
    }

    // ---- pure reads ----

    /// Fetch an asset record
    pub async fn get_asset(&self, asset: AssetId) -> Option<Asset> {
        self.assets.read().await.get(&asset).cloned()
    }

    /// Membership test
    pub async fn is_owner(&self, asset: AssetId, address: &Address) -> bool {
        self.owners
            .read()
            .await
            .get(&asset)
            .map(|set| set.entries.contains_key(address))
            .unwrap_or(false)
    }

    /// Governance-rights test: a listed owner with nonzero weight
    pub async fn has_governance_rights(&self, asset: AssetId, address: &Address) -> bool {
        self.weight_of(asset, address).await > 0
    }

    /// Current governance weight of an address (0 when not an owner)
    pub async fn weight_of(&self, asset: AssetId, address: &Address) -> u128 {
        self.owners
            .read()
            .await
            .get(&asset)
            .and_then(|set| set.entries.get(address))
            .map(|entry| entry.weight)
            .unwrap_or(0)
    }

    /// Current economic percentage of an address (0 when not an owner)
    pub async fn percentage_of(&self, asset: AssetId, address: &Address) -> u8 {
        self.owners
            .read()
            .await
            .get(&asset)
            .and_then(|set| set.entries.get(address))
            .map(|entry| entry.percentage)
            .unwrap_or(0)
    }

    /// Enumerate the owner set in registration/append order
    pub async fn owners_of(&self, asset: AssetId) -> Vec<(Address, OwnerEntry)> {
        self.owners
            .read()
            .await
            .get(&asset)
            .map(|set| set.ordered())
            .unwrap_or_default()
    }

    /// Number of enumerated owners (zero-percentage entries included)
    pub async fn owner_count(&self, asset: AssetId) -> usize {
        self.owners
            .read()
            .await
            .get(&asset)
            .map(|set| set.order.len())
            .unwrap_or(0)
    }

    /// Sum of governance weights over the current owner set
    pub async fn total_voting_weight(&self, asset: AssetId) -> u128 {
        self.owners
            .read()
            .await
            .get(&asset)
            .map(|set| set.entries.values().map(|e| e.weight).sum())
            .unwrap_or(0)
    }

    async fn require_owner(&self, asset: AssetId, caller: &Address) -> Result<()> {
        if self.is_owner(asset, caller).await {
            Ok(())
        } else {
            Err(Error::authorization(format!(
                "{caller} is not an owner of asset {asset}"
            )))
        }
    }
}

fn build_owner_set(owners: &[Address], percentages: &[u8], weights: &[u128]) -> Result<OwnerSet> {
    if owners.is_empty() {
        return Err(Error::validation("owner list must not be empty"));
    }
    if owners.len() != percentages.len() || owners.len() != weights.len() {
        return Err(Error::validation(format!(
            "owner/percentage/weight arrays differ in length: {}/{}/{}",
            owners.len(),
            percentages.len(),
            weights.len()
        )));
    }

    let sum: u32 = percentages.iter().map(|p| *p as u32).sum();
    if sum != 100 {
        return Err(Error::validation(format!(
            "percentages must sum to exactly 100, got {sum}"
        )));
    }

    let mut set = OwnerSet::default();
    for ((owner, percentage), weight) in owners.iter().zip(percentages).zip(weights) {
        if set.entries.contains_key(owner) {
            return Err(Error::validation(format!("duplicate owner {owner}")));
        }
        set.insert(
            owner.clone(),
            OwnerEntry {
                percentage: *percentage,
                weight: *weight,
            },
        );
    }
    Ok(set)
}
