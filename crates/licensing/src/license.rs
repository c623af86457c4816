//! License records and derived status.

use serde::{Deserialize, Serialize};
use tessera_core::{Address, Amount, AssetId, Bps, LicenseId, Timestamp, BPS_DENOMINATOR};

/// Fee above which an offer always needs collective approval
pub const APPROVAL_FEE_THRESHOLD: Amount = 500;

/// Royalty payment interval used for new schedules
pub const DEFAULT_ROYALTY_INTERVAL_SECS: u64 = 30 * 86_400;

/// Exclusivity tier of a license
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseKind {
    /// Ordinary grant; any number may coexist
    NonExclusive,
    /// Exclusive within the granted scope
    Exclusive,
    /// Exclusive even against the licensor
    SoleExclusive,
}

impl LicenseKind {
    /// Exclusive tiers always need collective approval
    pub fn requires_collective_approval(&self) -> bool {
        matches!(self, Self::Exclusive | Self::SoleExclusive)
    }
}

/// Derived license status, evaluated in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseStatus {
    /// Offer awaiting owner approval
    PendingApproval,
    /// Revoked by an owner; terminal
    Revoked,
    /// Approved (or denied) but not active
    Inactive,
    /// Suspended, window still running
    Suspended,
    /// Suspended, window elapsed; awaiting reactivation
    SuspensionExpired,
    /// Fixed term has passed
    Expired,
    /// In force
    Active,
}

/// A grant of usage rights over an asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    pub asset: AssetId,
    /// The owner who made (or whose proposal made) the offer
    pub licensor: Address,
    pub licensee: Address,
    pub kind: LicenseKind,
    pub usage_rights: String,
    pub territory: String,
    /// One-time activation fee
    pub fee: Amount,
    /// Royalty rate in parts per ten thousand
    pub royalty_rate_bps: Bps,
    /// Grant start; stamped at offer creation
    pub start_time: Timestamp,
    /// Grant end; 0 means perpetual
    pub end_time: Timestamp,
    pub currency: String,
    /// Free-text terms reference
    pub terms_ref: String,
    /// Content hash pinning the terms text
    pub terms_hash: String,
    /// Whether this offer needed collective approval
    pub approval_required: bool,
    /// None until resolved; Some(decision) afterwards
    pub approval: Option<bool>,
    pub active: bool,
    pub suspended: bool,
    /// When a running suspension window elapses
    pub suspension_end: Timestamp,
    pub revoked: bool,
    pub revocation_reason: Option<String>,
    pub created_at: Timestamp,
}

impl License {
    /// Approval has been granted (either resolved or automatic)
    pub fn is_approved(&self) -> bool {
        self.approval == Some(true)
    }

    /// Derive the composite status as observed at `now`
    pub fn status_at(&self, now: Timestamp) -> LicenseStatus {
        if self.approval_required && self.approval.is_none() {
            return LicenseStatus::PendingApproval;
        }
        if self.revoked {
            return LicenseStatus::Revoked;
        }
        if self.suspended {
            return if now >= self.suspension_end {
                LicenseStatus::SuspensionExpired
            } else {
                LicenseStatus::Suspended
            };
        }
        if !self.active {
            return LicenseStatus::Inactive;
        }
        if self.end_time != 0 && now > self.end_time {
            return LicenseStatus::Expired;
        }
        LicenseStatus::Active
    }
}

/// Usage constraints attached one-to-one to a license
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseTerms {
    /// Maximum uses; 0 means unlimited
    pub usage_cap: u64,
    /// Uses reported so far
    pub usage_count: u64,
    pub attribution_required: bool,
    pub modification_allowed: bool,
    /// Notice required before termination
    pub notice_period_secs: u64,
}

/// Royalty accrual for an active license
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoyaltySchedule {
    /// Current beneficiary-side holder (follows the licensee on transfer)
    pub holder: Address,
    /// Cumulative licensee revenue reported
    pub revenue_reported: Amount,
    /// Cumulative royalties paid
    pub royalties_paid: Amount,
    pub payment_interval_secs: u64,
    pub next_due: Timestamp,
}

impl RoyaltySchedule {
    pub fn new(holder: Address, now: Timestamp) -> Self {
        Self {
            holder,
            revenue_reported: 0,
            royalties_paid: 0,
            payment_interval_secs: DEFAULT_ROYALTY_INTERVAL_SECS,
            next_due: now + DEFAULT_ROYALTY_INTERVAL_SECS,
        }
    }

    /// Royalties owed: floor(reported × rate) minus what was already paid
    pub fn due(&self, rate_bps: Bps) -> Amount {
        (self.revenue_reported * rate_bps as u128 / BPS_DENOMINATOR)
            .saturating_sub(self.royalties_paid)
    }
}
