//! In-memory host adapters with shared, inspectable state. They back the test
//! suites and the demo CLI; real deployments wire the SQLite adapters or
//! host-native implementations instead.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{Currency, PlayerId, PlayerProfile, PlayerRef, TransferCause};

use crate::host::{
    AccountId, BountyStore, BroadcastSink, EconomyError, EconomyService, ProfileDirectory,
    StoreError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct DirectoryState {
    // None marks a profile the directory knows but cannot resolve.
    names: BTreeMap<PlayerId, Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&self, player: &PlayerRef) {
        lock(&self.state)
            .names
            .insert(player.player_id.clone(), Some(player.display_name.clone()));
    }

    pub fn add_unresolvable(&self, player: PlayerId) {
        lock(&self.state).names.insert(player, None);
    }

    pub fn remove(&self, player: &PlayerId) {
        lock(&self.state).names.remove(player);
    }
}

impl ProfileDirectory for MemoryDirectory {
    fn list_all_profiles(&self) -> Vec<PlayerProfile> {
        lock(&self.state)
            .names
            .iter()
            .map(|(id, name)| PlayerProfile::new(id.clone(), name.clone()))
            .collect()
    }

    fn resolve(&self, profile: &PlayerProfile) -> Option<PlayerRef> {
        let state = lock(&self.state);
        match state.names.get(&profile.player_id) {
            Some(Some(name)) => Some(PlayerRef::new(profile.player_id.clone(), name.clone())),
            Some(None) => None,
            None => profile
                .display_name
                .clone()
                .map(|name| PlayerRef::new(profile.player_id.clone(), name)),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    values: BTreeMap<PlayerId, u64>,
    fail_reads: bool,
    fail_writes: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    attribute: String,
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new(attribute_key: &str) -> Self {
        Self {
            attribute: attribute_key.to_string(),
            state: Arc::default(),
        }
    }

    pub fn seed(&self, player: PlayerId, amount: u64) {
        lock(&self.state).values.insert(player, amount);
    }

    /// What actually sits in the durable slot, independent of any cache.
    pub fn persisted(&self, player: &PlayerId) -> Option<u64> {
        lock(&self.state).values.get(player).copied()
    }

    pub fn fail_reads(&self, fail: bool) {
        lock(&self.state).fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }
}

impl BountyStore for MemoryStore {
    fn read(&self, player: &PlayerId) -> Result<Option<u64>, StoreError> {
        let state = lock(&self.state);
        if state.fail_reads {
            return Err(StoreError::Read {
                player: player.clone(),
                detail: format!("injected read failure on slot {}", self.attribute),
            });
        }
        Ok(state.values.get(player).copied())
    }

    fn write(&mut self, player: &PlayerId, amount: u64) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(StoreError::Write {
                player: player.clone(),
                detail: format!("injected write failure on slot {}", self.attribute),
            });
        }
        state.values.insert(player.clone(), amount);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    pub account: AccountId,
    /// Positive for deposits, negative for withdrawals.
    pub amount: i64,
    pub cause: TransferCause,
}

#[derive(Debug)]
struct EconomyState {
    currency: Currency,
    balances: BTreeMap<AccountId, i64>,
    transfers: Vec<RecordedTransfer>,
    denied: BTreeSet<PlayerId>,
    fail_deposits: bool,
    fail_withdrawals: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryEconomy {
    state: Arc<Mutex<EconomyState>>,
}

impl Default for MemoryEconomy {
    fn default() -> Self {
        Self::new(Currency::new("coin", "c"))
    }
}

impl MemoryEconomy {
    pub fn new(currency: Currency) -> Self {
        Self {
            state: Arc::new(Mutex::new(EconomyState {
                currency,
                balances: BTreeMap::new(),
                transfers: Vec::new(),
                denied: BTreeSet::new(),
                fail_deposits: false,
                fail_withdrawals: false,
            })),
        }
    }

    pub fn seed_account(&self, player: &PlayerRef, balance: i64) {
        lock(&self.state)
            .balances
            .insert(AccountId::new(player.player_id.as_str()), balance);
    }

    pub fn balance_of(&self, player: &PlayerId) -> Option<i64> {
        lock(&self.state)
            .balances
            .get(&AccountId::new(player.as_str()))
            .copied()
    }

    /// Make account resolution fail for this player.
    pub fn deny_account(&self, player: PlayerId) {
        lock(&self.state).denied.insert(player);
    }

    pub fn fail_deposits(&self, fail: bool) {
        lock(&self.state).fail_deposits = fail;
    }

    pub fn fail_withdrawals(&self, fail: bool) {
        lock(&self.state).fail_withdrawals = fail;
    }

    pub fn transfers(&self) -> Vec<RecordedTransfer> {
        lock(&self.state).transfers.clone()
    }
}

impl EconomyService for MemoryEconomy {
    fn default_currency(&self) -> Currency {
        lock(&self.state).currency.clone()
    }

    fn get_or_create_account(&mut self, player: &PlayerRef) -> Option<AccountId> {
        let mut state = lock(&self.state);
        if state.denied.contains(&player.player_id) {
            return None;
        }
        let account = AccountId::new(player.player_id.as_str());
        state.balances.entry(account.clone()).or_insert(0);
        Some(account)
    }

    fn balance(&self, account: &AccountId, _currency: &Currency) -> i64 {
        lock(&self.state).balances.get(account).copied().unwrap_or(0)
    }

    fn withdraw(
        &mut self,
        account: &AccountId,
        _currency: &Currency,
        amount: u64,
        cause: &TransferCause,
    ) -> Result<(), EconomyError> {
        let mut state = lock(&self.state);
        if state.fail_withdrawals {
            return Err(EconomyError::Backend("injected withdrawal failure".to_string()));
        }
        let delta = i64::try_from(amount).map_err(|_| EconomyError::InvalidAmount(amount))?;
        if delta == 0 {
            return Err(EconomyError::InvalidAmount(amount));
        }
        let balance = state
            .balances
            .get(account)
            .copied()
            .ok_or_else(|| EconomyError::UnknownAccount(account.clone()))?;
        if balance < delta {
            return Err(EconomyError::InsufficientBalance {
                account: account.clone(),
                balance,
                needed: amount,
            });
        }
        state.balances.insert(account.clone(), balance - delta);
        state.transfers.push(RecordedTransfer {
            account: account.clone(),
            amount: -delta,
            cause: cause.clone(),
        });
        Ok(())
    }

    fn deposit(
        &mut self,
        account: &AccountId,
        _currency: &Currency,
        amount: u64,
        cause: &TransferCause,
    ) -> Result<(), EconomyError> {
        let mut state = lock(&self.state);
        if state.fail_deposits {
            return Err(EconomyError::Backend("injected deposit failure".to_string()));
        }
        let delta = i64::try_from(amount).map_err(|_| EconomyError::InvalidAmount(amount))?;
        if delta == 0 {
            return Err(EconomyError::InvalidAmount(amount));
        }
        let balance = state
            .balances
            .get(account)
            .copied()
            .ok_or_else(|| EconomyError::UnknownAccount(account.clone()))?;
        state.balances.insert(account.clone(), balance + delta);
        state.transfers.push(RecordedTransfer {
            account: account.clone(),
            amount: delta,
            cause: cause.clone(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBroadcast {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemoryBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

impl BroadcastSink for MemoryBroadcast {
    fn broadcast(&mut self, message: &str) {
        lock(&self.messages).push(message.to_string());
    }
}
