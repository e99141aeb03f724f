//! In-process service facade: lifecycle, host wiring behind one lock, and the
//! player-facing command surface.

mod persistence;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bounty_core::host::{BountyStore, BroadcastSink, EconomyService, ProfileDirectory};
use bounty_core::{
    AddBountyError, BountyEngine, LedgerError, RebuildSummary, SettlementOutcome,
};
use contracts::{
    BountyCommand, BountyConfig, CommandReply, CommandSource, KillEvent, PlayerId, PlayerRef,
};
pub use persistence::{PersistenceError, SqlitePlayerStore, SqliteProfileDirectory};

const CONSOLE_LOG_HINT: &str = "An error occurred. Check the console log for more information.";
const DISABLED_REPLY: &str = "Bounties are disabled on this server.";

/// Everything the host supplies at startup. The economy is optional because
/// hosts may run without one; the feature then disables itself instead of
/// degrading.
pub struct HostServices {
    pub store: Box<dyn BountyStore>,
    pub directory: Box<dyn ProfileDirectory>,
    pub economy: Option<Box<dyn EconomyService>>,
    pub broadcast: Box<dyn BroadcastSink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    Disabled,
    Ledger(LedgerError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "bounty service is disabled"),
            Self::Ledger(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<LedgerError> for ServiceError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

struct ServiceInner {
    engine: Option<BountyEngine>,
}

/// Shared handle to the bounty feature. Clones see the same engine; every
/// operation takes the single inner lock for its whole duration, so command
/// handling and kill settlement never interleave.
#[derive(Clone)]
pub struct BountyService {
    inner: Arc<Mutex<ServiceInner>>,
}

impl BountyService {
    /// Wire the feature into a host. A missing economy service disables the
    /// whole feature; otherwise the bounty cache is rebuilt immediately, as
    /// on a server that just finished starting.
    pub fn start(config: BountyConfig, services: HostServices) -> Self {
        let HostServices {
            store,
            directory,
            economy,
            broadcast,
        } = services;

        let Some(economy) = economy else {
            log::error!(
                "{} requires an economy service in order to function",
                config.feature_id
            );
            log::info!("{} is now disabled", config.feature_id);
            return Self {
                inner: Arc::new(Mutex::new(ServiceInner { engine: None })),
            };
        };

        let mut engine = BountyEngine::new(config, store, directory, economy, broadcast);
        engine.rebuild_cache();
        log::info!("{} loaded", engine.config().feature_id);
        Self {
            inner: Arc::new(Mutex::new(ServiceInner {
                engine: Some(engine),
            })),
        }
    }

    pub fn enabled(&self) -> bool {
        self.lock().engine.is_some()
    }

    pub fn rebuild(&self) -> Result<RebuildSummary, ServiceError> {
        self.with_engine(|engine| engine.rebuild_cache())
    }

    pub fn bounty_of(&self, player: &PlayerId) -> Result<u64, ServiceError> {
        self.with_engine(|engine| engine.bounty(player))?
            .map_err(ServiceError::from)
    }

    pub fn set_bounty(&self, player: &PlayerId, amount: u64) -> Result<(), ServiceError> {
        self.with_engine(|engine| engine.set_bounty(player, amount))?
            .map_err(ServiceError::from)
    }

    /// Run settlement for a host-delivered kill event.
    pub fn handle_kill(&self, event: &KillEvent) -> Result<SettlementOutcome, ServiceError> {
        self.with_engine(|engine| engine.on_kill(event))
    }

    pub fn bounties(&self) -> Result<Vec<(PlayerId, u64)>, ServiceError> {
        self.with_engine(|engine| engine.bounties())
    }

    pub fn submit(&self, source: &CommandSource, command: BountyCommand) -> CommandReply {
        match command {
            BountyCommand::Set { target, amount } => self.handle_set(source, target, amount),
            BountyCommand::Get { target } => self.handle_get(source, target),
            BountyCommand::Add { target, amount } => self.handle_add(source, target, amount),
        }
    }

    fn handle_set(&self, source: &CommandSource, target: PlayerRef, amount: i64) -> CommandReply {
        if !source.admin {
            return CommandReply::rejected("You do not have permission to use this command");
        }
        if amount <= 0 {
            return CommandReply::rejected("Bounty must be a positive integer");
        }
        let amount = amount as u64;

        match self.with_engine(|engine| {
            engine.set_bounty(&target.player_id, amount).map(|()| {
                let message = format!("{target}'s bounty is at {amount}!");
                engine.announce(&message);
                message
            })
        }) {
            Ok(Ok(message)) => CommandReply::accepted(message),
            Ok(Err(_)) => CommandReply::rejected(CONSOLE_LOG_HINT),
            Err(_) => CommandReply::rejected(DISABLED_REPLY),
        }
    }

    fn handle_get(&self, source: &CommandSource, target: Option<PlayerRef>) -> CommandReply {
        let Some(target) = target.or_else(|| source.player.clone()) else {
            return CommandReply::rejected("This command must target a player");
        };

        match self.with_engine(|engine| engine.bounty(&target.player_id)) {
            Ok(Ok(0)) => CommandReply::accepted(format!("{target} doesn't have a bounty")),
            Ok(Ok(amount)) => CommandReply::accepted(format!("{target}'s bounty is {amount}")),
            Ok(Err(_)) => CommandReply::rejected(CONSOLE_LOG_HINT),
            Err(_) => CommandReply::rejected(DISABLED_REPLY),
        }
    }

    fn handle_add(&self, source: &CommandSource, target: PlayerRef, amount: i64) -> CommandReply {
        let Some(contributor) = source.player.clone() else {
            return CommandReply::rejected("Only a player can place a bounty");
        };
        if amount <= 0 {
            return CommandReply::rejected("Bounty must be a positive integer");
        }
        let amount = amount as u64;

        match self.with_engine(|engine| {
            engine.add_bounty(&target, &contributor, amount).map(|total| {
                let message = format!("{target}'s bounty is at {total}!");
                engine.announce(&message);
                message
            })
        }) {
            Ok(Ok(message)) => CommandReply::accepted(message),
            Ok(Err(AddBountyError::InsufficientBalance { .. })) => {
                CommandReply::rejected("You don't have enough funds to place that bounty")
            }
            Ok(Err(err)) => {
                log::error!("{err}");
                CommandReply::rejected(CONSOLE_LOG_HINT)
            }
            Err(_) => CommandReply::rejected(DISABLED_REPLY),
        }
    }

    fn with_engine<T>(
        &self,
        operation: impl FnOnce(&mut BountyEngine) -> T,
    ) -> Result<T, ServiceError> {
        let mut inner = self.lock();
        match inner.engine.as_mut() {
            Some(engine) => Ok(operation(engine)),
            None => Err(ServiceError::Disabled),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServiceInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
