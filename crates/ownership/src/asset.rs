//! Asset records.

use serde::{Deserialize, Serialize};
use tessera_core::{content_hash, Amount, AssetId, Timestamp};

/// Kind of intangible property an asset represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    /// Musical composition or recording
    Music,
    /// Film or video work
    Film,
    /// Literary work
    Literary,
    /// Software or source code
    Software,
    /// Patent or patent family
    Patent,
    /// Trademark
    Trademark,
    /// Visual artwork
    Artwork,
    /// Anything else
    Other,
}

/// Compliance tag cached on the asset record.
///
/// The verification workflow lives in an external registry; this core only
/// stores the tag, as directed by owner action or governance execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    /// Not yet reviewed
    Pending,
    /// Cleared by the external registry
    Compliant,
    /// Flagged; usable but restricted
    Restricted,
}

impl Default for ComplianceStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A collectively-owned intangible asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Asset identifier
    pub id: AssetId,
    /// What kind of property this is
    pub kind: AssetKind,
    /// Free-text metadata reference
    pub metadata: String,
    /// Content hash pinning the metadata text
    pub metadata_hash: String,
    /// Total nominal token supply
    pub total_supply: Amount,
    /// When the asset was registered
    pub created_at: Timestamp,
    /// Cached compliance tag
    pub compliance: ComplianceStatus,
}

impl Asset {
    /// Create a new asset record
    pub fn new(
        id: AssetId,
        kind: AssetKind,
        metadata: String,
        total_supply: Amount,
        created_at: Timestamp,
    ) -> Self {
        let metadata_hash = content_hash(&metadata);
        Self {
            id,
            kind,
            metadata,
            metadata_hash,
            total_supply,
            created_at,
            compliance: ComplianceStatus::default(),
        }
    }

    /// Replace the metadata text, re-pinning its hash
    pub fn set_metadata(&mut self, metadata: String) {
        self.metadata_hash = content_hash(&metadata);
        self.metadata = metadata;
    }
}
