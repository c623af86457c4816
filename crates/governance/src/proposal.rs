//! Proposal records and category payloads.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tessera_core::{Address, Amount, AssetId, LicenseId, ProposalId, Timestamp};
use tessera_ownership::ComplianceStatus;

/// Proposal categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalCategory {
    /// Metadata and compliance-tag changes
    AssetManagement,
    /// Minimum-distribution floor changes
    RevenuePolicy,
    /// License suspensions and the global pause
    Emergency,
}

/// Action carried by an emergency proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyAction {
    /// Suspend one license of the asset
    SuspendLicense {
        license: LicenseId,
        duration_secs: u64,
    },
    /// Suspend every active license of the asset
    SuspendAllLicenses { duration_secs: u64 },
    /// Halt all mutating operations system-wide
    TripPause,
    /// Lift the halt
    LiftPause,
}

/// Category-specific payload, fixed at proposal creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalPayload {
    AssetManagement {
        metadata: Option<String>,
        compliance: Option<ComplianceStatus>,
    },
    RevenuePolicy {
        currency: String,
        minimum_distribution: Amount,
    },
    Emergency { action: EmergencyAction },
}

impl ProposalPayload {
    pub fn category(&self) -> ProposalCategory {
        match self {
            Self::AssetManagement { .. } => ProposalCategory::AssetManagement,
            Self::RevenuePolicy { .. } => ProposalCategory::RevenuePolicy,
            Self::Emergency { .. } => ProposalCategory::Emergency,
        }
    }
}

/// A time-boxed, quorum-gated collective decision.
///
/// Immutable once created, apart from the vote tallies and the
/// executed/cancelled flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub asset: AssetId,
    pub proposer: Address,
    pub category: ProposalCategory,
    pub payload: ProposalPayload,
    pub description: String,
    pub votes_for: u128,
    pub votes_against: u128,
    pub voters: HashSet<Address>,
    /// Quorum denominator, snapshotted at creation. Votes themselves use
    /// each voter's weight at vote time.
    pub total_weight_snapshot: u128,
    /// Required combined participation, derived from the snapshot
    pub quorum: u128,
    pub voting_deadline: Timestamp,
    pub execution_deadline: Timestamp,
    pub executed: bool,
    pub cancelled: bool,
    pub created_at: Timestamp,
}

impl Proposal {
    /// Quorum reached and a strict majority in favor
    pub fn passed(&self) -> bool {
        self.votes_for + self.votes_against >= self.quorum && self.votes_for > self.votes_against
    }

    /// Strictly after the voting deadline, at or before the execution deadline
    pub fn in_execution_window(&self, now: Timestamp) -> bool {
        now > self.voting_deadline && now <= self.execution_deadline
    }
}
