//! Asset-scoped license proposals.
//!
//! A smaller parallel of the governance engine: owners propose a license
//! blueprint, vote with their current governance weight inside a fixed
//! window, and a passing proposal can be executed for 24 hours afterwards,
//! creating a brand-new approved (but not yet active) license.

use crate::license::{License, LicenseKind, LicenseTerms};
use crate::registry::LicenseRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use tessera_core::{
    content_hash, Address, Amount, AssetId, Bps, Error, LicenseId, ProposalId, Result, Timestamp,
    BPS_DENOMINATOR,
};
use tracing::info;

/// Fixed voting window for license proposals
pub const LICENSE_VOTING_WINDOW_SECS: u64 = 7 * 86_400;

/// Execution window opening once voting closes
pub const LICENSE_EXECUTION_WINDOW_SECS: u64 = 86_400;

/// Source of the license-approval quorum fraction.
///
/// The setting lives with the governance engine's per-asset settings; this
/// seam lets the registry consume it without depending on that crate.
#[async_trait]
pub trait ApprovalPolicy: Send + Sync {
    /// Quorum fraction (bps) required for license proposals on `asset`
    async fn license_quorum_bps(&self, asset: AssetId) -> Bps;
}

/// The license a passing proposal will create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseBlueprint {
    pub licensee: Address,
    pub kind: LicenseKind,
    pub usage_rights: String,
    pub territory: String,
    pub fee: Amount,
    pub royalty_rate_bps: Bps,
    pub duration_secs: u64,
    pub currency: String,
    pub terms_ref: String,
    pub terms: LicenseTerms,
}

/// A pending collective decision over a license blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseProposal {
    pub id: ProposalId,
    pub asset: AssetId,
    pub proposer: Address,
    pub blueprint: LicenseBlueprint,
    pub votes_for: u128,
    pub votes_against: u128,
    pub voters: HashSet<Address>,
    /// Quorum denominator, snapshotted at proposal creation
    pub total_weight_snapshot: u128,
    pub voting_deadline: Timestamp,
    pub executed: bool,
    /// Set once executed
    pub created_license: Option<LicenseId>,
    pub created_at: Timestamp,
}

impl LicenseRegistry {
    /// Put a license blueprint to a collective vote
    pub async fn propose_license_terms(
        &self,
        asset: AssetId,
        caller: &Address,
        blueprint: LicenseBlueprint,
    ) -> Result<ProposalId> {
        let _permit = self.guard.enter("propose_license_terms")?;

        if blueprint.royalty_rate_bps as u128 > BPS_DENOMINATOR {
            return Err(Error::validation(format!(
                "royalty rate {} bps exceeds 10000",
                blueprint.royalty_rate_bps
            )));
        }
        if !self.ownership.is_owner(asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {asset}"
            )));
        }

        let now = self.clock.now();
        let id = self.next_proposal_id.fetch_add(1, Ordering::SeqCst);
        let proposal = LicenseProposal {
            id,
            asset,
            proposer: caller.clone(),
            blueprint,
            votes_for: 0,
            votes_against: 0,
            voters: HashSet::new(),
            total_weight_snapshot: self.ownership.total_voting_weight(asset).await,
            voting_deadline: now + LICENSE_VOTING_WINDOW_SECS,
            executed: false,
            created_license: None,
            created_at: now,
        };
        self.proposals.write().await.insert(id, proposal);

        info!(proposal = id, asset, "license proposal opened");
        Ok(id)
    }

    /// Cast the caller's current governance weight for or against
    pub async fn vote_on_license_proposal(
        &self,
        proposal: ProposalId,
        caller: &Address,
        in_favor: bool,
    ) -> Result<()> {
        let _permit = self.guard.enter("vote_on_license_proposal")?;
        let now = self.clock.now();

        let mut proposals = self.proposals.write().await;
        let record = proposals
            .get_mut(&proposal)
            .ok_or_else(|| Error::state(format!("license proposal {proposal} not found")))?;

        if record.executed {
            return Err(Error::state(format!(
                "license proposal {proposal} already executed"
            )));
        }
        if now >= record.voting_deadline {
            return Err(Error::state(format!(
                "voting on license proposal {proposal} closed at {}",
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
                "{caller} already voted on license proposal {proposal}"
            )));
        }

        let weight = self.ownership.weight_of(record.asset, caller).await;
        if in_favor {
            record.votes_for += weight;
        } else {
            record.votes_against += weight;
        }
        record.voters.insert(caller.clone());
        Ok(())
    }

    /// Execute a passed proposal inside its 24-hour window, creating the
    /// license it described. The license arrives approved but not active;
    /// the licensee still activates it through `execute`.
    pub async fn execute_license_proposal(&self, proposal: ProposalId) -> Result<LicenseId> {
        let _permit = self.guard.enter("execute_license_proposal")?;
        let now = self.clock.now();

        let mut proposals = self.proposals.write().await;
        let record = proposals
            .get_mut(&proposal)
            .ok_or_else(|| Error::state(format!("license proposal {proposal} not found")))?;

        if record.executed {
            return Err(Error::state(format!(
                "license proposal {proposal} already executed"
            )));
        }
        if now <= record.voting_deadline {
            return Err(Error::state(format!(
                "voting on license proposal {proposal} is still open"
            )));
        }
        if now > record.voting_deadline + LICENSE_EXECUTION_WINDOW_SECS {
            return Err(Error::state(format!(
                "execution window for license proposal {proposal} has closed"
            )));
        }

        let quorum = record.total_weight_snapshot
            * self.policy.license_quorum_bps(record.asset).await as u128
            / BPS_DENOMINATOR;
        if record.votes_for + record.votes_against < quorum {
            return Err(Error::state(format!(
                "license proposal {proposal} did not reach its quorum of {quorum}"
            )));
        }
        if record.votes_for <= record.votes_against {
            return Err(Error::state(format!(
                "license proposal {proposal} did not reach a majority"
            )));
        }

        let blueprint = record.blueprint.clone();
        let id = self
            .next_license_id
            .fetch_add(1, Ordering::SeqCst);

        let license = License {
            id,
            asset: record.asset,
            licensor: record.proposer.clone(),
            licensee: blueprint.licensee,
            kind: blueprint.kind,
            usage_rights: blueprint.usage_rights,
            territory: blueprint.territory,
            fee: blueprint.fee,
            royalty_rate_bps: blueprint.royalty_rate_bps,
            start_time: now,
            end_time: if blueprint.duration_secs == 0 {
                0
            } else {
                now + blueprint.duration_secs
            },
            currency: blueprint.currency,
            terms_hash: content_hash(&blueprint.terms_ref),
            terms_ref: blueprint.terms_ref,
            // The collective vote is the approval
            approval_required: false,
            approval: Some(true),
            active: false,
            suspended: false,
            suspension_end: 0,
            revoked: false,
            revocation_reason: None,
            created_at: now,
        };

        record.executed = true;
        record.created_license = Some(id);
        drop(proposals);

        self.licenses.write().await.insert(id, license);
        self.terms.write().await.insert(
            id,
            LicenseTerms {
                usage_count: 0,
                ..blueprint.terms
            },
        );

        info!(proposal, license = id, "license proposal executed");
        Ok(id)
    }

    /// Fetch a license proposal
    pub async fn get_license_proposal(&self, proposal: ProposalId) -> Option<LicenseProposal> {
        self.proposals.read().await.get(&proposal).cloned()
    }
}
