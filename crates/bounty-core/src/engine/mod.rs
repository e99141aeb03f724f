//! Bounty engine: composes the ledger with the host collaborators and owns
//! every state transition of the feature (rebuild, reads, admin writes,
//! player funding, kill settlement).

mod settlement;

use contracts::{BountyConfig, PlayerId};

use crate::host::{BountyStore, BroadcastSink, EconomyService, ProfileDirectory};
use crate::ledger::{BountyLedger, LedgerError, RebuildSummary};

pub use settlement::{AddBountyError, SettlementError, SettlementOutcome, SkipReason};

pub struct BountyEngine {
    config: BountyConfig,
    ledger: BountyLedger,
    directory: Box<dyn ProfileDirectory>,
    economy: Box<dyn EconomyService>,
    broadcast: Box<dyn BroadcastSink>,
}

impl BountyEngine {
    pub fn new(
        config: BountyConfig,
        store: Box<dyn BountyStore>,
        directory: Box<dyn ProfileDirectory>,
        economy: Box<dyn EconomyService>,
        broadcast: Box<dyn BroadcastSink>,
    ) -> Self {
        Self {
            config,
            ledger: BountyLedger::new(store),
            directory,
            economy,
            broadcast,
        }
    }

    pub fn config(&self) -> &BountyConfig {
        &self.config
    }

    /// Rebuild the cache from the profile directory. Safe to call repeatedly;
    /// each call fully replaces the previous cache contents.
    pub fn rebuild_cache(&mut self) -> RebuildSummary {
        let summary = self.ledger.rebuild(self.directory.as_ref());
        log::info!("{} cache rebuilt: {summary}", self.config.feature_id);
        summary
    }

    pub fn bounty(&mut self, player: &PlayerId) -> Result<u64, LedgerError> {
        self.ledger.get(player)
    }

    pub fn set_bounty(&mut self, player: &PlayerId, amount: u64) -> Result<(), LedgerError> {
        self.ledger.set(player, amount)
    }

    pub fn tracked(&self) -> usize {
        self.ledger.tracked()
    }

    pub fn bounties(&self) -> Vec<(PlayerId, u64)> {
        self.ledger
            .entries()
            .map(|(player, amount)| (player.clone(), amount))
            .collect()
    }

    /// Send a server-wide announcement through the host's broadcast channel.
    pub fn announce(&mut self, message: &str) {
        self.broadcast.broadcast(message);
    }
}
