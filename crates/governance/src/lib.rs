//! Governance engine.
//!
//! General-purpose weighted proposal engine over the ownership ledger's
//! governance weights: asset-management, revenue-policy and emergency
//! categories, quorum-gated and time-boxed, with execution dispatching into
//! the other subsystems and the global pause switch.

pub mod engine;
pub mod proposal;
pub mod settings;

pub use engine::GovernanceEngine;
pub use proposal::{EmergencyAction, Proposal, ProposalCategory, ProposalPayload};
pub use settings::{GovernanceSettings, SettingsStore, MIN_EXECUTION_DELAY_SECS};
