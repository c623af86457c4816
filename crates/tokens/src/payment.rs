//! Payment token ledger interface and in-memory implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use tessera_core::{Address, Amount, Error, Result};
use tokio::sync::RwLock;
use tracing::debug;

/// Standard allowance/transfer primitives of a payment token ledger.
///
/// Amounts are integers in the token's native smallest unit.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Move funds from `payer` to `recipient` using `recipient`'s allowance
    async fn transfer_from(
        &self,
        payer: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<()>;

    /// Move funds out of `from` into `to`
    async fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<()>;

    /// Current balance of a holder
    async fn balance_of(&self, holder: &Address) -> Amount;

    /// Remaining allowance granted by `owner` to `spender`
    async fn allowance(&self, owner: &Address, spender: &Address) -> Amount;
}

/// Resolves the payment ledger for a currency code.
///
/// One ledger instance exists per currency in use; every monetary operation
/// names its currency and is routed here.
#[derive(Default)]
pub struct TokenHub {
    ledgers: RwLock<HashMap<String, std::sync::Arc<dyn PaymentLedger>>>,
}

impl TokenHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the ledger serving a currency
    pub async fn register(&self, currency: impl Into<String>, ledger: std::sync::Arc<dyn PaymentLedger>) {
        let currency = currency.into();
        debug!(%currency, "registering payment ledger");
        self.ledgers.write().await.insert(currency, ledger);
    }

    /// Resolve the ledger for a currency
    pub async fn ledger(&self, currency: &str) -> Result<std::sync::Arc<dyn PaymentLedger>> {
        self.ledgers
            .read()
            .await
            .get(currency)
            .cloned()
            .ok_or_else(|| Error::validation(format!("unknown currency: {currency}")))
    }
}

#[derive(Debug, Default)]
struct Books {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

/// In-process payment ledger with balances and allowances
#[derive(Debug, Default)]
pub struct InMemoryPaymentLedger {
    books: RwLock<Books>,
}

impl InMemoryPaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a holder out of thin air (test funding)
    pub async fn deposit(&self, holder: &Address, amount: Amount) {
        let mut books = self.books.write().await;
        *books.balances.entry(holder.clone()).or_default() += amount;
    }

    /// Grant `spender` an allowance over `owner`'s funds
    pub async fn approve(&self, owner: &Address, spender: &Address, amount: Amount) {
        let mut books = self.books.write().await;
        books
            .allowances
            .insert((owner.clone(), spender.clone()), amount);
    }
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentLedger {
    async fn transfer_from(
        &self,
        payer: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<()> {
        let mut books = self.books.write().await;

        let key = (payer.clone(), recipient.clone());
        let allowed = books.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(Error::insufficient_funds(format!(
                "allowance of {allowed} from {payer} is below {amount}"
            )));
        }

        let balance = books.balances.get(payer).copied().unwrap_or(0);
        if balance < amount {
            return Err(Error::insufficient_funds(format!(
                "balance of {balance} held by {payer} is below {amount}"
            )));
        }

        books.allowances.insert(key, allowed - amount);
        books.balances.insert(payer.clone(), balance - amount);
        *books.balances.entry(recipient.clone()).or_default() += amount;

        debug!(%payer, %recipient, amount, "transfer_from");
        Ok(())
    }

    async fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        let mut books = self.books.write().await;

        let balance = books.balances.get(from).copied().unwrap_or(0);
        if balance < amount {
            return Err(Error::insufficient_funds(format!(
                "balance of {balance} held by {from} is below {amount}"
            )));
        }

        books.balances.insert(from.clone(), balance - amount);
        *books.balances.entry(to.clone()).or_default() += amount;

        debug!(%from, %to, amount, "transfer");
        Ok(())
    }

    async fn balance_of(&self, holder: &Address) -> Amount {
        self.books
            .read()
            .await
            .balances
            .get(holder)
            .copied()
            .unwrap_or(0)
    }

    async fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.books
            .read()
            .await
            .allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }
}
