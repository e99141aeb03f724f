//! Collaborator seams toward the hosting game server: identity directory,
//! durable per-player store, economy service, and broadcast channel.

use std::fmt;

use contracts::{Currency, PlayerId, PlayerProfile, PlayerRef, TransferCause};

/// Opaque handle to a payable economy account. Adapters decide what goes
/// inside; callers only pass it back.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Read { player: PlayerId, detail: String },
    Write { player: PlayerId, detail: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { player, detail } => {
                write!(f, "bounty read failed for {player}: {detail}")
            }
            Self::Write { player, detail } => {
                write!(f, "bounty write failed for {player}: {detail}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    UnknownAccount(AccountId),
    InsufficientBalance {
        account: AccountId,
        balance: i64,
        needed: u64,
    },
    InvalidAmount(u64),
    Backend(String),
}

impl fmt::Display for EconomyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAccount(account) => write!(f, "unknown economy account: {account}"),
            Self::InsufficientBalance {
                account,
                balance,
                needed,
            } => write!(
                f,
                "insufficient balance on {account}: have {balance}, need {needed}"
            ),
            Self::InvalidAmount(amount) => write!(f, "invalid transfer amount: {amount}"),
            Self::Backend(detail) => write!(f, "economy backend error: {detail}"),
        }
    }
}

impl std::error::Error for EconomyError {}

/// The host's registry of every account it has ever seen. Enumeration feeds
/// the ledger rebuild; resolution turns a profile into a live player record
/// and may fail for stale or corrupt profiles.
pub trait ProfileDirectory: Send {
    fn list_all_profiles(&self) -> Vec<PlayerProfile>;
    fn resolve(&self, profile: &PlayerProfile) -> Option<PlayerRef>;
}

/// Durable per-player slot holding a single non-negative integer. Which slot
/// is written under is fixed when the adapter is constructed.
pub trait BountyStore: Send {
    fn read(&self, player: &PlayerId) -> Result<Option<u64>, StoreError>;
    fn write(&mut self, player: &PlayerId, amount: u64) -> Result<(), StoreError>;
}

/// External money service. Account resolution is fallible and amounts are in
/// the smallest accounted unit of the given currency.
pub trait EconomyService: Send {
    fn default_currency(&self) -> Currency;
    fn get_or_create_account(&mut self, player: &PlayerRef) -> Option<AccountId>;
    fn balance(&self, account: &AccountId, currency: &Currency) -> i64;
    fn withdraw(
        &mut self,
        account: &AccountId,
        currency: &Currency,
        amount: u64,
        cause: &TransferCause,
    ) -> Result<(), EconomyError>;
    fn deposit(
        &mut self,
        account: &AccountId,
        currency: &Currency,
        amount: u64,
        cause: &TransferCause,
    ) -> Result<(), EconomyError>;
}

/// Server-wide chat announcement channel.
pub trait BroadcastSink: Send {
    fn broadcast(&mut self, message: &str);
}
