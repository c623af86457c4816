//! Per-asset revenue accounting records.

use serde::{Deserialize, Serialize};
use tessera_core::Amount;

/// Running totals for one (asset, currency) pair.
///
/// Invariant: `accumulated == total_received - total_distributed`, reconciled
/// at every receipt and distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueAccount {
    /// Everything ever received into the pool
    pub total_received: Amount,
    /// Everything ever credited out to owners
    pub total_distributed: Amount,
    /// Funds still held by the pool
    pub accumulated: Amount,
    /// Dust-prevention floor consulted by owner-initiated distribution
    pub minimum_distribution: Amount,
    /// Number of owner-initiated distributions
    pub distribution_count: u64,
}

impl RevenueAccount {
    /// Record an inbound receipt
    pub fn record_receipt(&mut self, amount: Amount) {
        self.total_received += amount;
        self.accumulated += amount;
    }

    /// Record an owner-initiated distribution of `distributed` (the floored
    /// sum actually credited, never the requested amount)
    pub fn record_distribution(&mut self, distributed: Amount) {
        self.accumulated -= distributed;
        self.total_distributed += distributed;
        self.distribution_count += 1;
    }

    /// Record a fee/royalty routing: `amount` arrived and `distributed` of it
    /// was credited out in the same call; the floor residue stays pooled
    pub fn record_fee_routing(&mut self, amount: Amount, distributed: Amount) {
        self.total_received += amount;
        self.total_distributed += distributed;
        self.accumulated += amount - distributed;
    }
}

/// One owner's balance awaiting withdrawal in one currency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBalance {
    /// Amount currently withdrawable
    pub amount: Amount,
    /// Lifetime earnings credited (reporting)
    pub total_earned: Amount,
    /// Lifetime withdrawals taken (reporting)
    pub total_withdrawn: Amount,
}

impl PendingBalance {
    /// Credit a distribution share
    pub fn credit(&mut self, amount: Amount) {
        self.amount += amount;
        self.total_earned += amount;
    }

    /// Zero the pending amount, recording the withdrawal
    pub fn drain(&mut self) -> Amount {
        let taken = self.amount;
        self.amount = 0;
        self.total_withdrawn += taken;
        taken
    }
}
