//! Per-asset governance settings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tessera_core::{AssetId, Bps, Error, Result, BPS_DENOMINATOR};
use tessera_licensing::ApprovalPolicy;
use tokio::sync::RwLock;

/// Hard floor on the execution delay
pub const MIN_EXECUTION_DELAY_SECS: u64 = 3_600;

/// Quorum fractions, voting windows and execution delay for one asset.
/// Defaults apply until explicitly set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceSettings {
    /// Quorum for asset-management and revenue-policy proposals
    pub default_quorum_bps: Bps,
    /// Quorum for emergency proposals
    pub emergency_quorum_bps: Bps,
    /// Quorum consumed by the license-proposal flow
    pub license_quorum_bps: Bps,
    /// Voting window for non-emergency proposals
    pub default_voting_secs: u64,
    /// Shorter voting window for emergency proposals
    pub emergency_voting_secs: u64,
    /// Gap between the voting deadline and the execution deadline
    pub execution_delay_secs: u64,
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        Self {
            default_quorum_bps: 5_000,   // 50%
            emergency_quorum_bps: 3_000, // 30%
            license_quorum_bps: 5_000,   // 50%
            default_voting_secs: 3 * 86_400,
            emergency_voting_secs: 86_400,
            execution_delay_secs: 86_400,
        }
    }
}

impl GovernanceSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, bps) in [
            ("default", self.default_quorum_bps),
            ("emergency", self.emergency_quorum_bps),
            ("license", self.license_quorum_bps),
        ] {
            if bps as u128 > BPS_DENOMINATOR {
                return Err(Error::validation(format!(
                    "{name} quorum of {bps} bps exceeds 10000"
                )));
            }
        }
        if self.emergency_quorum_bps > self.default_quorum_bps {
            return Err(Error::validation(
                "emergency quorum must not exceed the default quorum",
            ));
        }
        if self.default_voting_secs == 0 || self.emergency_voting_secs == 0 {
            return Err(Error::validation("voting windows must be positive"));
        }
        if self.execution_delay_secs < MIN_EXECUTION_DELAY_SECS {
            return Err(Error::validation(format!(
                "execution delay must be at least {MIN_EXECUTION_DELAY_SECS} seconds"
            )));
        }
        Ok(())
    }
}

/// Per-asset settings overrides; defaults until set
#[derive(Default)]
pub struct SettingsStore {
    overrides: RwLock<HashMap<AssetId, GovernanceSettings>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective settings for an asset
    pub async fn settings_for(&self, asset: AssetId) -> GovernanceSettings {
        self.overrides
            .read()
            .await
            .get(&asset)
            .cloned()
            .unwrap_or_default()
    }

    /// Install validated overrides for an asset
    pub async fn set(&self, asset: AssetId, settings: GovernanceSettings) -> Result<()> {
        settings.validate()?;
        self.overrides.write().await.insert(asset, settings);
        Ok(())
    }
}

/// The licensing flow consumes the license-approval quorum from here.
#[async_trait]
impl ApprovalPolicy for SettingsStore {
    async fn license_quorum_bps(&self, asset: AssetId) -> Bps {
        self.settings_for(asset).await.license_quorum_bps
    }
}
