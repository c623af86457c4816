//! License registry state machine.

use crate::license::{
    License, LicenseKind, LicenseStatus, LicenseTerms, RoyaltySchedule, APPROVAL_FEE_THRESHOLD,
};
use crate::proposals::{ApprovalPolicy, LicenseProposal};
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tessera_core::{
    content_hash, Address, Amount, AssetId, Bps, Clock, Error, LicenseId, OpGuard, PauseSwitch,
    ProposalId, Result, BPS_DENOMINATOR,
};
use tessera_ownership::OwnershipLedger;
use tessera_revenue::RevenuePool;
use tessera_tokens::TokenHub;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Per-license state machine, royalty accrual, and the asset-scoped
/// license-proposal flow (implemented in `proposals`).
pub struct LicenseRegistry {
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) guard: OpGuard,
    pub(crate) ownership: Arc<OwnershipLedger>,
    pub(crate) revenue: Arc<RevenuePool>,
    pub(crate) tokens: Arc<TokenHub>,
    pub(crate) policy: Arc<dyn ApprovalPolicy>,
    pub(crate) licenses: RwLock<HashMap<LicenseId, License>>,
    pub(crate) terms: RwLock<HashMap<LicenseId, LicenseTerms>>,
    pub(crate) schedules: RwLock<HashMap<LicenseId, RoyaltySchedule>>,
    pub(crate) proposals: RwLock<HashMap<ProposalId, LicenseProposal>>,
    pub(crate) next_license_id: AtomicU64,
    pub(crate) next_proposal_id: AtomicU64,
}

impl LicenseRegistry {
    pub fn new(
        pause: Arc<PauseSwitch>,
        clock: Arc<dyn Clock>,
        ownership: Arc<OwnershipLedger>,
        revenue: Arc<RevenuePool>,
        tokens: Arc<TokenHub>,
        policy: Arc<dyn ApprovalPolicy>,
    ) -> Self {
        Self {
            clock,
            guard: OpGuard::new(pause),
            ownership,
            revenue,
            tokens,
            policy,
            licenses: RwLock::new(HashMap::new()),
            terms: RwLock::new(HashMap::new()),
            schedules: RwLock::new(HashMap::new()),
            proposals: RwLock::new(HashMap::new()),
            next_license_id: AtomicU64::new(1),
            next_proposal_id: AtomicU64::new(1),
        }
    }

    /// Offer a license over an asset. Exclusive tiers and fees above the
    /// threshold need collective approval; everything else is self-approved.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_offer(
        &self,
        asset: AssetId,
        caller: &Address,
        licensee: Address,
        kind: LicenseKind,
        usage_rights: impl Into<String>,
        territory: impl Into<String>,
        fee: Amount,
        royalty_rate_bps: Bps,
        duration_secs: u64,
        currency: impl Into<String>,
        terms_ref: impl Into<String>,
        terms: LicenseTerms,
    ) -> Result<LicenseId> {
        let _permit = self.guard.enter("create_offer")?;

        if royalty_rate_bps as u128 > BPS_DENOMINATOR {
            return Err(Error::validation(format!(
                "royalty rate {royalty_rate_bps} bps exceeds 10000"
            )));
        }
        if !self.ownership.is_owner(asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {asset}"
            )));
        }

        let approval_required = kind.requires_collective_approval() || fee > APPROVAL_FEE_THRESHOLD;
        let now = self.clock.now();
        let id = self
            .next_license_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let terms_ref = terms_ref.into();
        let license = License {
            id,
            asset,
            licensor: caller.clone(),
            licensee,
            kind,
            usage_rights: usage_rights.into(),
            territory: territory.into(),
            fee,
            royalty_rate_bps,
            start_time: now,
            end_time: if duration_secs == 0 {
                0
            } else {
                now + duration_secs
            },
            currency: currency.into(),
            terms_hash: content_hash(&terms_ref),
            terms_ref,
            approval_required,
            approval: if approval_required { None } else { Some(true) },
            active: false,
            suspended: false,
            suspension_end: 0,
            revoked: false,
            revocation_reason: None,
            created_at: now,
        };

        self.licenses.write().await.insert(id, license);
        self.terms.write().await.insert(
            id,
            LicenseTerms {
                usage_count: 0,
                ..terms
            },
        );

        info!(license = id, asset, approval_required, "license offered");
        Ok(id)
    }

    /// Resolve a pending approval
    pub async fn approve(&self, license: LicenseId, caller: &Address, decision: bool) -> Result<()> {
        let _permit = self.guard.enter("approve")?;

        let mut licenses = self.licenses.write().await;
        let record = licenses
            .get_mut(&license)
            .ok_or_else(|| Error::state(format!("license {license} not found")))?;

        if !self.ownership.is_owner(record.asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {}",
                record.asset
            )));
        }
        if !record.approval_required || record.approval.is_some() {
            return Err(Error::state(format!(
                "license {license} has no approval pending"
            )));
        }

        record.approval = Some(decision);
        info!(license, decision, "license approval resolved");
        Ok(())
    }

    /// Licensee consent + fee payment: activates an approved license and
    /// starts its royalty schedule.
    pub async fn execute(&self, license: LicenseId, caller: &Address) -> Result<()> {
        let _permit = self.guard.enter("execute")?;
        let now = self.clock.now();

        let (asset, fee, currency) = {
            let licenses = self.licenses.read().await;
            let record = licenses
                .get(&license)
                .ok_or_else(|| Error::state(format!("license {license} not found")))?;

            if record.licensee != *caller {
                return Err(Error::authorization(format!(
                    "{caller} is not the licensee of license {license}"
                )));
            }
            if record.revoked {
                return Err(Error::state(format!("license {license} has been revoked")));
            }
            if record.suspended {
                return Err(Error::state(format!("license {license} is suspended")));
            }
            if !record.is_approved() {
                return Err(Error::state(format!("license {license} is not approved")));
            }
            if record.active {
                return Err(Error::state(format!("license {license} is already active")));
            }
            if record.end_time != 0 && now > record.end_time {
                return Err(Error::state(format!(
                    "license {license} term ended at {}",
                    record.end_time
                )));
            }
            (record.asset, record.fee, record.currency.clone())
        };

        if fee > 0 {
            let ledger = self.tokens.ledger(&currency).await?;
            ledger
                .transfer_from(caller, self.revenue.pool_account(), fee)
                .await?;
            self.revenue.route_fee(asset, &currency, fee).await?;
        }

        let mut licenses = self.licenses.write().await;
        if let Some(record) = licenses.get_mut(&license) {
            record.active = true;
        }
        self.schedules
            .write()
            .await
            .insert(license, RoyaltySchedule::new(caller.clone(), now));

        info!(license, asset, fee, "license executed");
        Ok(())
    }

    /// Owner revocation; terminal
    pub async fn revoke(
        &self,
        license: LicenseId,
        caller: &Address,
        reason: impl Into<String>,
    ) -> Result<()> {
        let _permit = self.guard.enter("revoke")?;
        let now = self.clock.now();

        let mut licenses = self.licenses.write().await;
        let record = licenses
            .get_mut(&license)
            .ok_or_else(|| Error::state(format!("license {license} not found")))?;

        if !self.ownership.is_owner(record.asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {}",
                record.asset
            )));
        }
        if record.status_at(now) != LicenseStatus::Active {
            return Err(Error::state(format!("license {license} is not active")));
        }

        record.active = false;
        record.revoked = true;
        record.revocation_reason = Some(reason.into());
        info!(license, "license revoked");
        Ok(())
    }

    /// Owner suspension for a fixed window
    pub async fn suspend(
        &self,
        license: LicenseId,
        caller: &Address,
        duration_secs: u64,
    ) -> Result<()> {
        let _permit = self.guard.enter("suspend")?;

        let asset = {
            let licenses = self.licenses.read().await;
            licenses
                .get(&license)
                .map(|r| r.asset)
                .ok_or_else(|| Error::state(format!("license {license} not found")))?
        };
        if !self.ownership.is_owner(asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {asset}"
            )));
        }

        self.suspend_unchecked(license, duration_secs).await
    }

    /// Permissionless reactivation once the suspension window has elapsed
    pub async fn check_and_reactivate(&self, license: LicenseId) -> Result<()> {
        let _permit = self.guard.enter("check_and_reactivate")?;
        let now = self.clock.now();

        let mut licenses = self.licenses.write().await;
        let record = licenses
            .get_mut(&license)
            .ok_or_else(|| Error::state(format!("license {license} not found")))?;

        if !record.suspended {
            return Err(Error::state(format!("license {license} is not suspended")));
        }
        if now < record.suspension_end {
            return Err(Error::state(format!(
                "suspension of license {license} runs until {}",
                record.suspension_end
            )));
        }

        record.suspended = false;
        record.suspension_end = 0;
        record.active = true;
        info!(license, "license reactivated after suspension");
        Ok(())
    }

    /// Owner reactivation that bypasses the suspension timer
    pub async fn manual_reactivate(&self, license: LicenseId, caller: &Address) -> Result<()> {
        let _permit = self.guard.enter("manual_reactivate")?;

        let mut licenses = self.licenses.write().await;
        let record = licenses
            .get_mut(&license)
            .ok_or_else(|| Error::state(format!("license {license} not found")))?;

        if !self.ownership.is_owner(record.asset, caller).await {
            return Err(Error::authorization(format!(
                "{caller} is not an owner of asset {}",
                record.asset
            )));
        }
        if !record.suspended {
            return Err(Error::state(format!("license {license} is not suspended")));
        }

        record.suspended = false;
        record.suspension_end = 0;
        record.active = true;
        info!(license, "license manually reactivated");
        Ok(())
    }

    /// Move an active license to a new licensee
    pub async fn transfer(
        &self,
        license: LicenseId,
        caller: &Address,
        new_licensee: Address,
    ) -> Result<()> {
        let _permit = self.guard.enter("transfer")?;
        let now = self.clock.now();

        let mut licenses = self.licenses.write().await;
        let record = licenses
            .get_mut(&license)
            .ok_or_else(|| Error::state(format!("license {license} not found")))?;

        if record.licensee != *caller {
            return Err(Error::authorization(format!(
                "{caller} is not the licensee of license {license}"
            )));
        }
        if record.status_at(now) != LicenseStatus::Active {
            return Err(Error::state(format!("license {license} is not active")));
        }
        if record.licensee == new_licensee {
            return Err(Error::validation(
                "license is already held by that licensee",
            ));
        }

        record.licensee = new_licensee.clone();
        if let Some(schedule) = self.schedules.write().await.get_mut(&license) {
            schedule.holder = new_licensee.clone();
        }

        info!(license, %new_licensee, "license transferred");
        Ok(())
    }

    /// Licensee usage report: bumps the usage counter (under the cap) and the
    /// cumulative revenue figure royalties accrue against.
    pub async fn report_usage(
        &self,
        license: LicenseId,
        caller: &Address,
        revenue_amount: Amount,
        usage_count: u64,
    ) -> Result<()> {
        let _permit = self.guard.enter("report_usage")?;
        let now = self.clock.now();

        {
            let licenses = self.licenses.read().await;
            let record = licenses
                .get(&license)
                .ok_or_else(|| Error::state(format!("license {license} not found")))?;
            if record.licensee != *caller {
                return Err(Error::authorization(format!(
                    "{caller} is not the licensee of license {license}"
                )));
            }
            if record.status_at(now) != LicenseStatus::Active {
                return Err(Error::state(format!("license {license} is not active")));
            }
        }

        let mut terms = self.terms.write().await;
        let constraints = terms
            .get_mut(&license)
            .ok_or_else(|| Error::state(format!("license {license} has no terms record")))?;
        if constraints.usage_cap != 0
            && constraints.usage_count + usage_count > constraints.usage_cap
        {
            return Err(Error::state(format!(
                "usage cap of {} reached for license {license}",
                constraints.usage_cap
            )));
        }
        constraints.usage_count += usage_count;
        drop(terms);

        let mut schedules = self.schedules.write().await;
        if let Some(schedule) = schedules.get_mut(&license) {
            schedule.revenue_reported += revenue_amount;
        }

        debug!(license, revenue_amount, usage_count, "usage reported");
        Ok(())
    }

    /// Licensee royalty payment, routed pro-rata to the owners
    pub async fn pay_royalties(
        &self,
        license: LicenseId,
        caller: &Address,
        amount: Amount,
    ) -> Result<()> {
        let _permit = self.guard.enter("pay_royalties")?;
        let now = self.clock.now();

        if amount == 0 {
            return Err(Error::validation("royalty payment must be positive"));
        }

        let (asset, currency) = {
            let licenses = self.licenses.read().await;
            let record = licenses
                .get(&license)
                .ok_or_else(|| Error::state(format!("license {license} not found")))?;
            if record.licensee != *caller {
                return Err(Error::authorization(format!(
                    "{caller} is not the licensee of license {license}"
                )));
            }
            if record.revoked {
                return Err(Error::state(format!("license {license} has been revoked")));
            }
            (record.asset, record.currency.clone())
        };
        if !self.schedules.read().await.contains_key(&license) {
            return Err(Error::state(format!(
                "license {license} has no royalty schedule"
            )));
        }

        let ledger = self.tokens.ledger(&currency).await?;
        ledger
            .transfer_from(caller, self.revenue.pool_account(), amount)
            .await?;
        self.revenue.route_fee(asset, &currency, amount).await?;

        let mut schedules = self.schedules.write().await;
        let schedule = schedules
            .get_mut(&license)
            .ok_or_else(|| Error::state(format!("license {license} has no royalty schedule")))?;
        schedule.royalties_paid += amount;
        schedule.next_due = now + schedule.payment_interval_secs;

        info!(license, amount, "royalties paid");
        Ok(())
    }

    /// Royalties currently owed by the licensee
    pub async fn due_royalties(&self, license: LicenseId) -> Result<Amount> {
        let licenses = self.licenses.read().await;
        let record = licenses
            .get(&license)
            .ok_or_else(|| Error::state(format!("license {license} not found")))?;

        let schedules = self.schedules.read().await;
        Ok(schedules
            .get(&license)
            .map(|s| s.due(record.royalty_rate_bps))
            .unwrap_or(0))
    }

    /// Derived status as of the current clock
    pub async fn status(&self, license: LicenseId) -> Result<LicenseStatus> {
        let licenses = self.licenses.read().await;
        let record = licenses
            .get(&license)
            .ok_or_else(|| Error::state(format!("license {license} not found")))?;
        Ok(record.status_at(self.clock.now()))
    }

    /// Fetch a license record
    pub async fn get_license(&self, license: LicenseId) -> Option<License> {
        self.licenses.read().await.get(&license).cloned()
    }

    /// Fetch a license's usage constraints
    pub async fn get_terms(&self, license: LicenseId) -> Option<LicenseTerms> {
        self.terms.read().await.get(&license).copied()
    }

    /// Fetch a license's royalty schedule
    pub async fn get_schedule(&self, license: LicenseId) -> Option<RoyaltySchedule> {
        self.schedules.read().await.get(&license).cloned()
    }

    // ---- governance-driven entry points ----

    /// Suspend a single license on behalf of an executed emergency proposal.
    /// Skips the owner gate and the pause gate.
    pub async fn suspend_for_governance(
        &self,
        license: LicenseId,
        duration_secs: u64,
    ) -> Result<()> {
        let _permit = self.guard.enter_bypassing_pause("suspend_for_governance")?;
        self.suspend_unchecked(license, duration_secs).await
    }

    /// Suspend every active license of an asset; returns how many were hit
    pub async fn suspend_all_for_governance(
        &self,
        asset: AssetId,
        duration_secs: u64,
    ) -> Result<usize> {
        let _permit = self
            .guard
            .enter_bypassing_pause("suspend_all_for_governance")?;
        let now = self.clock.now();

        let mut licenses = self.licenses.write().await;
        let mut suspended = 0;
        for record in licenses.values_mut() {
            if record.asset == asset && record.status_at(now) == LicenseStatus::Active {
                record.active = false;
                record.suspended = true;
                record.suspension_end = now + duration_secs;
                suspended += 1;
            }
        }

        info!(asset, suspended, "asset licenses suspended by governance");
        Ok(suspended)
    }

    async fn suspend_unchecked(&self, license: LicenseId, duration_secs: u64) -> Result<()> {
        if duration_secs == 0 {
            return Err(Error::validation("suspension duration must be positive"));
        }
        let now = self.clock.now();

        let mut licenses = self.licenses.write().await;
        let record = licenses
            .get_mut(&license)
            .ok_or_else(|| Error::state(format!("license {license} not found")))?;
        if record.status_at(now) != LicenseStatus::Active {
            return Err(Error::state(format!("license {license} is not active")));
        }

        record.active = false;
        record.suspended = true;
        record.suspension_end = now + duration_secs;
        info!(license, until = record.suspension_end, "license suspended");
        Ok(())
    }
}
