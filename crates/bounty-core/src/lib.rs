//! Core of the player-bounty feature: the write-through bounty ledger, the
//! kill-settlement engine, and the collaborator seams toward the hosting
//! game server.

pub mod engine;
pub mod host;
pub mod ledger;
pub mod memory;

pub use engine::{AddBountyError, BountyEngine, SettlementError, SettlementOutcome, SkipReason};
pub use ledger::{BountyLedger, LedgerError, RebuildSummary};
