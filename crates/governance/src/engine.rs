//! The weighted proposal engine.

use crate::proposal::{EmergencyAction, Proposal, ProposalCategory, ProposalPayload};
use crate::settings::SettingsStore;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_core::{
    Address, AssetId, Clock, Error, OpGuard, PauseSwitch, ProposalId, Result, BPS_DENOMINATOR,
};
use tessera_licensing::LicenseRegistry;
use tessera_ownership::OwnershipLedger;
use tessera_revenue::RevenuePool;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Weighted proposal/vote/execute engine over one asset's owner set.
///
/// Emergency-category operations bypass the pause gate so that a tripped
/// pause can still be lifted through governance.
pub struct GovernanceEngine {
    clock: Arc<dyn Clock>,
    guard: OpGuard,
    pause: Arc<PauseSwitch>,
    ownership: Arc<OwnershipLedger>,
    revenue: Arc<RevenuePool>,
    licensing: Arc<LicenseRegistry>,
    settings: Arc<SettingsStore>,
    proposals: RwLock<HashMap<ProposalId, Proposal>>,
    next_proposal_id: AtomicU64,
}

impl GovernanceEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pause: Arc<PauseSwitch>,
        clock: Arc<dyn Clock>,
        ownership: Arc<OwnershipLedger>,
        revenue: Arc<RevenuePool>,
        licensing: Arc<LicenseRegistry>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            clock,
            guard: OpGuard::new(pause.clone()),
            pause,
            ownership,
            revenue,
            licensing,
            settings,
            proposals: RwLock::new(HashMap::new()),
            next_proposal_id: AtomicU64::new(1),
        }
    }

    /// Open a proposal. The total-voting-weight snapshot taken here is the
    /// quorum denominator for the proposal's whole life; votes read each
    /// voter's weight at vote time.
    pub async fn create_proposal(
        &self,
        asset: AssetId,
        caller: &Address,
        payload: ProposalPayload,
        voting_duration_secs: Option<u64>,
        description: impl Into<String>,
    ) -> Result<ProposalId> {
        let category = payload.category();
        let _permit = match category {
            ProposalCategory::Emergency => self.guard.enter_bypassing_pause("create_proposal")?,
            _ => self.guard.enter("create_proposal")?,
        };

        if !self.ownership.is_owner(asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {asset}"
            )));
        }
        if voting_duration_secs == Some(0) {
            return Err(Error::validation("voting duration must be positive"));
        }

        let settings = self.settings.settings_for(asset).await;
        let (quorum_bps, default_duration) = match category {
            ProposalCategory::Emergency => {
                (settings.emergency_quorum_bps, settings.emergency_voting_secs)
            }
            _ => (settings.default_quorum_bps, settings.default_voting_secs),
        };
        let duration = voting_duration_secs.unwrap_or(default_duration);

        let now = self.clock.now();
        let snapshot = self.ownership.total_voting_weight(asset).await;
        let voting_deadline = now + duration;

        let id = self.next_proposal_id.fetch_add(1, Ordering::SeqCst);
        let proposal = Proposal {
            id,
            asset,
            proposer: caller.clone(),
            category,
            payload,
            description: description.into(),
            votes_for: 0,
            votes_against: 0,
            voters: HashSet::new(),
            total_weight_snapshot: snapshot,
            quorum: snapshot * quorum_bps as u128 / BPS_DENOMINATOR,
            voting_deadline,
            execution_deadline: voting_deadline + settings.execution_delay_secs,
            executed: false,
            cancelled: false,
            created_at: now,
        };
        self.proposals.write().await.insert(id, proposal);

        info!(proposal = id, asset, ?category, snapshot, "proposal opened");
        Ok(id)
    }

    /// Cast the caller's *current* governance weight for or against
    pub async fn vote(&self, proposal: ProposalId, caller: &Address, in_favor: bool) -> Result<()> {
        let _permit = self.guard.enter_bypassing_pause("vote")?;
        let now = self.clock.now();

        let mut proposals = self.proposals.write().await;
        let record = proposals
            .get_mut(&proposal)
            .ok_or_else(|| Error::state(format!("proposal {proposal} not found")))?;

        self.check_pause_for(record.category, "vote")?;

        if record.executed {
            return Err(Error::state(format!("proposal {proposal} already executed")));
        }
        if record.cancelled {
            return Err(Error::state(format!("proposal {proposal} was cancelled")));
        }
        if now >= record.voting_deadline {
            return Err(Error::state(format!(
                "voting on proposal {proposal} closed at {}",
                record.voting_deadline
            )));
        }
        if !self.ownership.is_owner(record.asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {}",
                record.asset
            )));
        }
        if record.voters.contains(caller) {
            return Err(Error::state(format!(
                "{caller} already voted on proposal {proposal}"
            )));
        }

        let weight = self.ownership.weight_of(record.asset, caller).await;
        if in_favor {
            record.votes_for += weight;
        } else {
            record.votes_against += weight;
        }
        record.voters.insert(caller.clone());

        info!(proposal, %caller, weight, in_favor, "vote cast");
        Ok(())
    }

    /// Proposer-only cancellation, any time before execution
    pub async fn cancel_proposal(&self, proposal: ProposalId, caller: &Address) -> Result<()> {
        let _permit = self.guard.enter_bypassing_pause("cancel_proposal")?;

        let mut proposals = self.proposals.write().await;
        let record = proposals
            .get_mut(&proposal)
            .ok_or_else(|| Error::state(format!("proposal {proposal} not found")))?;

        self.check_pause_for(record.category, "cancel_proposal")?;

        if record.proposer != *caller {
            return Err(Error::authorization(format!(
                "{caller} did not propose proposal {proposal}"
            )));
        }
        if record.executed {
            return Err(Error::state(format!("proposal {proposal} already executed")));
        }
        if record.cancelled {
            return Err(Error::state(format!("proposal {proposal} was cancelled")));
        }

        record.cancelled = true;
        info!(proposal, "proposal cancelled");
        Ok(())
    }

    /// Whether the proposal could be executed right now
    pub async fn can_execute(&self, proposal: ProposalId) -> Result<bool> {
        let proposals = self.proposals.read().await;
        let record = proposals
            .get(&proposal)
            .ok_or_else(|| Error::state(format!("proposal {proposal} not found")))?;

        Ok(!record.executed
            && !record.cancelled
            && record.in_execution_window(self.clock.now())
            && record.passed())
    }

    /// Apply an asset-management proposal. Reports which of the two fields
    /// actually changed.
    pub async fn execute_asset_management(&self, proposal: ProposalId) -> Result<(bool, bool)> {
        let _permit = self.guard.enter("execute_asset_management")?;

        let (asset, payload) = self
            .take_executable(proposal, ProposalCategory::AssetManagement)
            .await?;
        let ProposalPayload::AssetManagement { metadata, compliance } = payload else {
            return Err(Error::state(format!(
                "proposal {proposal} carries a mismatched payload"
            )));
        };

        let changed = match self
            .ownership
            .apply_governance_change(asset, metadata, compliance)
            .await
        {
            Ok(changed) => changed,
            Err(err) => {
                self.unmark_executed(proposal).await;
                return Err(err);
            }
        };
        info!(proposal, asset, ?changed, "asset-management proposal executed");
        Ok(changed)
    }

    /// Apply a revenue-policy proposal
    pub async fn execute_revenue_policy(&self, proposal: ProposalId) -> Result<()> {
        let _permit = self.guard.enter("execute_revenue_policy")?;

        let (asset, payload) = self
            .take_executable(proposal, ProposalCategory::RevenuePolicy)
            .await?;
        let ProposalPayload::RevenuePolicy {
            currency,
            minimum_distribution,
        } = payload
        else {
            return Err(Error::state(format!(
                "proposal {proposal} carries a mismatched payload"
            )));
        };

        if let Err(err) = self
            .revenue
            .apply_policy_minimum(asset, &currency, minimum_distribution)
            .await
        {
            self.unmark_executed(proposal).await;
            return Err(err);
        }
        info!(proposal, asset, "revenue-policy proposal executed");
        Ok(())
    }

    /// Dispatch an emergency proposal. Works while the engine is paused.
    pub async fn execute_emergency(&self, proposal: ProposalId) -> Result<()> {
        let _permit = self.guard.enter_bypassing_pause("execute_emergency")?;

        let (asset, payload) = self
            .take_executable(proposal, ProposalCategory::Emergency)
            .await?;
        let ProposalPayload::Emergency { action } = payload else {
            return Err(Error::state(format!(
                "proposal {proposal} carries a mismatched payload"
            )));
        };

        let outcome = match action {
            EmergencyAction::SuspendLicense {
                license,
                duration_secs,
            } => match self.licensing.get_license(license).await {
                None => Err(Error::state(format!("license {license} not found"))),
                Some(record) if record.asset != asset => Err(Error::state(format!(
                    "license {license} does not belong to asset {asset}"
                ))),
                Some(_) => {
                    self.licensing
                        .suspend_for_governance(license, duration_secs)
                        .await
                }
            },
            EmergencyAction::SuspendAllLicenses { duration_secs } => self
                .licensing
                .suspend_all_for_governance(asset, duration_secs)
                .await
                .map(|suspended| {
                    warn!(proposal, asset, suspended, "emergency suspended all licenses");
                }),
            EmergencyAction::TripPause => {
                self.pause.engage();
                Ok(())
            }
            EmergencyAction::LiftPause => {
                self.pause.lift();
                Ok(())
            }
        };
        if let Err(err) = outcome {
            self.unmark_executed(proposal).await;
            return Err(err);
        }

        info!(proposal, asset, "emergency proposal executed");
        Ok(())
    }

    /// Install per-asset settings overrides; owner-gated
    pub async fn set_governance_settings(
        &self,
        asset: AssetId,
        caller: &Address,
        settings: crate::settings::GovernanceSettings,
    ) -> Result<()> {
        let _permit = self.guard.enter("set_governance_settings")?;

        if !self.ownership.is_owner(asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {asset}"
            )));
        }
        self.settings.set(asset, settings).await
    }

    /// Effective settings for an asset (defaults until overridden)
    pub async fn governance_settings(&self, asset: AssetId) -> crate::settings::GovernanceSettings {
        self.settings.settings_for(asset).await
    }

    /// Fetch a proposal record
    pub async fn get_proposal(&self, proposal: ProposalId) -> Option<Proposal> {
        self.proposals.read().await.get(&proposal).cloned()
    }

    /// Validate every execution precondition with a distinct reason, then
    /// mark the proposal executed and hand back its payload.
    async fn take_executable(
        &self,
        proposal: ProposalId,
        expected: ProposalCategory,
    ) -> Result<(AssetId, ProposalPayload)> {
        let now = self.clock.now();

        let mut proposals = self.proposals.write().await;
        let record = proposals
            .get_mut(&proposal)
            .ok_or_else(|| Error::state(format!("proposal {proposal} not found")))?;

        if record.category != expected {
            return Err(Error::state(format!(
                "proposal {proposal} is a {:?} proposal, not {expected:?}",
                record.category
            )));
        }
        if record.executed {
            return Err(Error::state(format!("proposal {proposal} already executed")));
        }
        if record.cancelled {
            return Err(Error::state(format!("proposal {proposal} was cancelled")));
        }
        if now <= record.voting_deadline {
            return Err(Error::state(format!(
                "voting on proposal {proposal} is still open"
            )));
        }
        if now > record.execution_deadline {
            return Err(Error::state(format!(
                "execution window for proposal {proposal} closed at {}",
                record.execution_deadline
            )));
        }
        if record.votes_for + record.votes_against < record.quorum {
            return Err(Error::state(format!(
                "proposal {proposal} did not reach its quorum of {}",
                record.quorum
            )));
        }
        if record.votes_for <= record.votes_against {
            return Err(Error::state(format!(
                "proposal {proposal} did not reach a majority"
            )));
        }

        record.executed = true;
        Ok((record.asset, record.payload.clone()))
    }

    /// Roll an execution mark back when the side effect could not be applied,
    /// so the proposal is not consumed without effect.
    async fn unmark_executed(&self, proposal: ProposalId) {
        let mut proposals = self.proposals.write().await;
        if let Some(record) = proposals.get_mut(&proposal) {
            record.executed = false;
        }
    }

    /// Non-emergency governance honors the pause like any other mutation
    fn check_pause_for(&self, category: ProposalCategory, op: &str) -> Result<()> {
        if category != ProposalCategory::Emergency && self.pause.is_paused() {
            return Err(Error::state(format!("{op}: engine is paused")));
        }
        Ok(())
    }
}
