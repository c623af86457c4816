//! Identifier and value types shared across the engine.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// An opaque participant address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create a new address
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Asset identifier, sequential per registry
pub type AssetId = u64;

/// License identifier, sequential per registry
pub type LicenseId = u64;

/// Proposal identifier, sequential per engine
pub type ProposalId = u64;

/// Monetary amount in a token's native smallest unit
pub type Amount = u128;

/// Rate in parts per ten thousand (basis points)
pub type Bps = u32;

/// Denominator for basis-point arithmetic
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Second-resolution timestamp
pub type Timestamp = u64;

/// Opaque content hash of a free-text field, hex encoded.
///
/// The engine never interprets metadata or license terms; it only pins their
/// content so a later reader can detect drift.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
