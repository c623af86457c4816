//! Token ledger collaborators.
//!
//! The engine never does decimal handling or balance bookkeeping of its own;
//! all monetary movement goes through a payment token ledger (one per
//! currency in use, resolved through the [`TokenHub`]) and all fungible
//! per-asset units through the [`AssetTokenLedger`]. In-memory
//! implementations back the test suites.

pub mod asset_token;
pub mod payment;

pub use asset_token::{AssetTokenLedger, InMemoryAssetTokenLedger};
pub use payment::{InMemoryPaymentLedger, PaymentLedger, TokenHub};
