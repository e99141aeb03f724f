//! Bounty ledger: in-memory cache over the durable per-player store, with
//! write-through on every mutation and bulk rebuild from the profile
//! directory.

use std::collections::BTreeMap;
use std::fmt;

use contracts::PlayerId;

use crate::host::{BountyStore, ProfileDirectory, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    Store(StoreError),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Counters reported by a cache rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub enumerated: usize,
    pub skipped: usize,
    pub loaded: usize,
    pub initialized: usize,
    pub failed: usize,
}

impl RebuildSummary {
    pub fn tracked(&self) -> usize {
        self.loaded + self.initialized
    }
}

impl fmt::Display for RebuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "profiles={} skipped={} loaded={} initialized={} failed={}",
            self.enumerated, self.skipped, self.loaded, self.initialized, self.failed
        )
    }
}

/// All bounty reads come from the cache; all writes go to the store first and
/// reach the cache only once the store accepted them. The cache therefore
/// never shows a value the store does not hold.
pub struct BountyLedger {
    cache: BTreeMap<PlayerId, u64>,
    store: Box<dyn BountyStore>,
}

impl BountyLedger {
    pub fn new(store: Box<dyn BountyStore>) -> Self {
        Self {
            cache: BTreeMap::new(),
            store,
        }
    }

    /// Replace the cache wholesale from the profile directory. Unresolvable
    /// profiles are skipped; players whose slot cannot be read or initialized
    /// stay absent until a later rebuild or a successful get/set.
    pub fn rebuild(&mut self, directory: &dyn ProfileDirectory) -> RebuildSummary {
        let mut cache = BTreeMap::new();
        let mut summary = RebuildSummary::default();

        for profile in directory.list_all_profiles() {
            summary.enumerated += 1;
            let Some(player) = directory.resolve(&profile) else {
                summary.skipped += 1;
                log::warn!("skipping unresolvable profile {}", profile.player_id);
                continue;
            };
            match self.store.read(&player.player_id) {
                Ok(Some(amount)) => {
                    cache.insert(player.player_id.clone(), amount);
                    summary.loaded += 1;
                }
                Ok(None) => match self.store.write(&player.player_id, 0) {
                    Ok(()) => {
                        cache.insert(player.player_id.clone(), 0);
                        summary.initialized += 1;
                    }
                    Err(err) => {
                        summary.failed += 1;
                        log::error!("{err}");
                    }
                },
                Err(err) => {
                    summary.failed += 1;
                    log::error!("{err}");
                }
            }
        }

        self.cache = cache;
        summary
    }

    /// Current bounty for the player. A first sighting materializes a zero
    /// entry through the same write-through path as `set`, so a successful
    /// return is always backed by the store.
    pub fn get(&mut self, player: &PlayerId) -> Result<u64, LedgerError> {
        if let Some(amount) = self.cache.get(player) {
            return Ok(*amount);
        }
        match self.read_or_init(player) {
            Ok(amount) => {
                self.cache.insert(player.clone(), amount);
                Ok(amount)
            }
            Err(err) => {
                log::error!("{err}");
                Err(err.into())
            }
        }
    }

    fn read_or_init(&mut self, player: &PlayerId) -> Result<u64, StoreError> {
        match self.store.read(player)? {
            Some(amount) => Ok(amount),
            None => {
                self.store.write(player, 0)?;
                Ok(0)
            }
        }
    }

    /// Cache-only read, no materialization.
    pub fn peek(&self, player: &PlayerId) -> Option<u64> {
        self.cache.get(player).copied()
    }

    /// Write through to the store, then mirror into the cache. On failure the
    /// cache keeps the old value.
    pub fn set(&mut self, player: &PlayerId, amount: u64) -> Result<(), LedgerError> {
        if let Err(err) = self.store.write(player, amount) {
            log::error!("{err}");
            return Err(err.into());
        }
        self.cache.insert(player.clone(), amount);
        Ok(())
    }

    pub fn tracked(&self) -> usize {
        self.cache.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&PlayerId, u64)> + '_ {
        self.cache.iter().map(|(player, amount)| (player, *amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDirectory, MemoryStore};
    use contracts::PlayerRef;

    fn id(raw: &str) -> PlayerId {
        PlayerId::new(raw)
    }

    fn directory_with(players: &[(&str, &str)]) -> MemoryDirectory {
        let directory = MemoryDirectory::new();
        for (player_id, name) in players {
            directory.add_player(&PlayerRef::new(PlayerId::new(*player_id), *name));
        }
        directory
    }

    #[test]
    fn rebuild_initializes_unseen_players_to_zero() {
        let directory = directory_with(&[("p:alice", "Alice"), ("p:bob", "Bob")]);
        let store = MemoryStore::new("bounty");
        let mut ledger = BountyLedger::new(Box::new(store.clone()));

        let summary = ledger.rebuild(&directory);

        assert_eq!(summary.enumerated, 2);
        assert_eq!(summary.initialized, 2);
        assert_eq!(summary.tracked(), 2);
        assert_eq!(ledger.peek(&id("p:alice")), Some(0));
        assert_eq!(store.persisted(&id("p:alice")), Some(0), "zero entry persisted");
    }

    #[test]
    fn rebuild_loads_persisted_values() {
        let directory = directory_with(&[("p:alice", "Alice")]);
        let store = MemoryStore::new("bounty");
        store.seed(id("p:alice"), 25);
        let mut ledger = BountyLedger::new(Box::new(store.clone()));

        let summary = ledger.rebuild(&directory);

        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.initialized, 0);
        assert_eq!(ledger.peek(&id("p:alice")), Some(25));
    }

    #[test]
    fn rebuild_skips_unresolvable_profiles() {
        let directory = directory_with(&[("p:alice", "Alice")]);
        directory.add_unresolvable(id("p:ghost"));
        let store = MemoryStore::new("bounty");
        let mut ledger = BountyLedger::new(Box::new(store.clone()));

        let summary = ledger.rebuild(&directory);

        assert_eq!(summary.enumerated, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(ledger.peek(&id("p:ghost")), None);
        assert_eq!(store.persisted(&id("p:ghost")), None, "no slot created");
    }

    #[test]
    fn rebuild_leaves_player_absent_when_init_write_fails() {
        let directory = directory_with(&[("p:alice", "Alice")]);
        let store = MemoryStore::new("bounty");
        store.fail_writes(true);
        let mut ledger = BountyLedger::new(Box::new(store.clone()));

        let summary = ledger.rebuild(&directory);
        assert_eq!(summary.failed, 1);
        assert_eq!(ledger.peek(&id("p:alice")), None);

        store.fail_writes(false);
        assert_eq!(ledger.get(&id("p:alice")), Ok(0), "recovers on next read");
        assert_eq!(store.persisted(&id("p:alice")), Some(0));
    }

    #[test]
    fn rebuild_replaces_previous_cache() {
        let directory = directory_with(&[("p:alice", "Alice"), ("p:bob", "Bob")]);
        let store = MemoryStore::new("bounty");
        let mut ledger = BountyLedger::new(Box::new(store.clone()));
        ledger.rebuild(&directory);
        ledger.set(&id("p:bob"), 42).expect("set bob");

        directory.remove(&id("p:bob"));
        ledger.rebuild(&directory);

        assert_eq!(ledger.peek(&id("p:bob")), None, "bob left the directory");
        assert_eq!(ledger.get(&id("p:bob")), Ok(42), "store still has bob's bounty");
    }

    #[test]
    fn get_materializes_zero_on_first_miss() {
        let store = MemoryStore::new("bounty");
        let mut ledger = BountyLedger::new(Box::new(store.clone()));

        assert_eq!(ledger.get(&id("p:new")), Ok(0));
        assert_eq!(ledger.peek(&id("p:new")), Some(0));
        assert_eq!(store.persisted(&id("p:new")), Some(0));
    }

    #[test]
    fn get_propagates_read_failure_without_caching() {
        let store = MemoryStore::new("bounty");
        let mut ledger = BountyLedger::new(Box::new(store.clone()));
        store.fail_reads(true);

        let err = ledger.get(&id("p:alice")).expect_err("read fails");
        assert!(matches!(err, LedgerError::Store(StoreError::Read { .. })));
        assert_eq!(ledger.peek(&id("p:alice")), None);

        store.fail_reads(false);
        assert_eq!(ledger.get(&id("p:alice")), Ok(0));
    }

    #[test]
    fn set_writes_through_to_store() {
        let store = MemoryStore::new("bounty");
        let mut ledger = BountyLedger::new(Box::new(store.clone()));

        ledger.set(&id("p:alice"), 60).expect("set succeeds");

        assert_eq!(ledger.peek(&id("p:alice")), Some(60));
        assert_eq!(store.persisted(&id("p:alice")), Some(60));
    }

    #[test]
    fn set_failure_leaves_cache_unchanged() {
        let store = MemoryStore::new("bounty");
        let mut ledger = BountyLedger::new(Box::new(store.clone()));
        ledger.set(&id("p:alice"), 10).expect("initial set");

        store.fail_writes(true);
        let err = ledger.set(&id("p:alice"), 99).expect_err("write fails");
        assert!(matches!(err, LedgerError::Store(StoreError::Write { .. })));

        assert_eq!(ledger.peek(&id("p:alice")), Some(10), "old value still visible");
        assert_eq!(store.persisted(&id("p:alice")), Some(10));
    }
}
