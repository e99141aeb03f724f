use std::fmt;

use contracts::{KillEvent, KillParticipant, ParticipantRole, PlayerId, PlayerRef, TransferCause};

use crate::host::EconomyError;
use crate::ledger::LedgerError;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Cancelled,
    NoKiller,
    NoBounty,
    UnresolvedAccount,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Cancelled => "event was cancelled",
            Self::NoKiller => "no distinct killer in the cause chain",
            Self::NoBounty => "victim has no bounty",
            Self::UnresolvedAccount => "killer's account could not be resolved",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    Ledger(LedgerError),
    Deposit {
        error: EconomyError,
        bounty_restored: bool,
    },
}

impl fmt::Display for SettlementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ledger(err) => write!(f, "ledger failure during settlement: {err}"),
            Self::Deposit {
                error,
                bounty_restored: true,
            } => write!(f, "deposit failed, bounty restored: {error}"),
            Self::Deposit {
                error,
                bounty_restored: false,
            } => write!(f, "deposit failed and bounty could not be restored: {error}"),
        }
    }
}

impl std::error::Error for SettlementError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Paid { killer: PlayerRef, amount: u64 },
    Skipped(SkipReason),
    Failed(SettlementError),
}

impl SettlementOutcome {
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddBountyError {
    InvalidAmount,
    Overflow,
    UnresolvedAccount(PlayerId),
    InsufficientBalance { balance: i64, needed: u64 },
    Ledger(LedgerError),
    Withdraw { error: EconomyError, rolled_back: bool },
}

impl fmt::Display for AddBountyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAmount => write!(f, "amount must be positive"),
            Self::Overflow => write!(f, "bounty total would overflow"),
            Self::UnresolvedAccount(player) => write!(f, "no payable account for {player}"),
            Self::InsufficientBalance { balance, needed } => {
                write!(f, "insufficient funds: have {balance}, need {needed}")
            }
            Self::Ledger(err) => write!(f, "{err}"),
            Self::Withdraw {
                error,
                rolled_back: true,
            } => write!(f, "withdrawal failed, bounty rolled back: {error}"),
            Self::Withdraw {
                error,
                rolled_back: false,
            } => write!(f, "withdrawal failed and bounty rollback also failed: {error}"),
        }
    }
}

impl std::error::Error for AddBountyError {}

impl From<LedgerError> for AddBountyError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

fn credits(participant: &KillParticipant, victim: &PlayerRef) -> bool {
    !participant.synthetic && participant.player.player_id != victim.player_id
}

/// Prioritized scan of the typed cause chain: the first creditable
/// primary-source participant wins, else the first creditable participant in
/// chain order. Synthetic actors and the victim are never credited.
pub(super) fn select_killer<'a>(event: &'a KillEvent) -> Option<&'a KillParticipant> {
    event
        .participants
        .iter()
        .find(|participant| {
            participant.role == ParticipantRole::PrimarySource && credits(participant, &event.victim)
        })
        .or_else(|| {
            event
                .participants
                .iter()
                .find(|participant| credits(participant, &event.victim))
        })
}

impl BountyEngine {
    /// Settle a kill. Every path that does not pay leaves the ledger and the
    /// economy untouched, except a failed deposit after the claim, which is
    /// rolled back and reported.
    pub fn on_kill(&mut self, event: &KillEvent) -> SettlementOutcome {
        if event.cancelled {
            return SettlementOutcome::Skipped(SkipReason::Cancelled);
        }
        let Some(killer) = select_killer(event).map(|participant| participant.player.clone())
        else {
            return SettlementOutcome::Skipped(SkipReason::NoKiller);
        };
        let bounty = match self.ledger.get(&event.victim.player_id) {
            Ok(amount) => amount,
            Err(err) => return SettlementOutcome::Failed(SettlementError::Ledger(err)),
        };
        if bounty == 0 {
            return SettlementOutcome::Skipped(SkipReason::NoBounty);
        }
        let Some(account) = self.economy.get_or_create_account(&killer) else {
            return SettlementOutcome::Skipped(SkipReason::UnresolvedAccount);
        };

        // Claim before paying: a crash between the two steps forfeits one
        // payout instead of doubling it on retry.
        if let Err(err) = self.ledger.set(&event.victim.player_id, 0) {
            return SettlementOutcome::Failed(SettlementError::Ledger(err));
        }

        let currency = self.economy.default_currency();
        let cause = TransferCause::claim(
            self.config.feature_id.clone(),
            event.victim.player_id.clone(),
            killer.player_id.clone(),
        );
        if let Err(error) = self.economy.deposit(&account, &currency, bounty, &cause) {
            log::error!("deposit of {bounty} to {killer} failed: {error}");
            let bounty_restored = self.ledger.set(&event.victim.player_id, bounty).is_ok();
            if !bounty_restored {
                log::error!(
                    "bounty of {bounty} on {} lost: the restore write failed too",
                    event.victim.player_id
                );
            }
            return SettlementOutcome::Failed(SettlementError::Deposit {
                error,
                bounty_restored,
            });
        }

        log::info!(
            "{} claimed {}'s bounty of {bounty}",
            killer.display_name,
            event.victim.display_name
        );
        self.broadcast.broadcast(&format!(
            "{} has claimed {}'s bounty!",
            killer.display_name, event.victim.display_name
        ));
        SettlementOutcome::Paid {
            killer,
            amount: bounty,
        }
    }

    /// Raise `target`'s bounty by `amount`, funded from `contributor`'s
    /// account. The ledger write lands before the withdrawal, so money only
    /// moves once the increase is durable; a failed withdrawal rolls the
    /// ledger back.
    pub fn add_bounty(
        &mut self,
        target: &PlayerRef,
        contributor: &PlayerRef,
        amount: u64,
    ) -> Result<u64, AddBountyError> {
        if amount == 0 {
            return Err(AddBountyError::InvalidAmount);
        }
        let current = self.ledger.get(&target.player_id)?;
        let total = current
            .checked_add(amount)
            .ok_or(AddBountyError::Overflow)?;
        let Some(account) = self.economy.get_or_create_account(contributor) else {
            return Err(AddBountyError::UnresolvedAccount(contributor.player_id.clone()));
        };

        let currency = self.economy.default_currency();
        let balance = self.economy.balance(&account, &currency);
        let needed = i64::try_from(amount).unwrap_or(i64::MAX);
        if balance < needed {
            return Err(AddBountyError::InsufficientBalance { balance, needed: amount });
        }

        self.ledger.set(&target.player_id, total)?;

        let cause = TransferCause::funding(
            self.config.feature_id.clone(),
            contributor.player_id.clone(),
            target.player_id.clone(),
        );
        if let Err(error) = self.economy.withdraw(&account, &currency, amount, &cause) {
            let rolled_back = self.ledger.set(&target.player_id, current).is_ok();
            if !rolled_back {
                log::error!(
                    "unfunded bounty of {amount} left on {}: withdrawal failed and the rollback write failed too",
                    target.player_id
                );
            }
            return Err(AddBountyError::Withdraw { error, rolled_back });
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PlayerId;

    fn player(id: &str, name: &str) -> PlayerRef {
        PlayerRef::new(PlayerId::new(id), name)
    }

    fn victim() -> PlayerRef {
        player("p:alice", "Alice")
    }

    #[test]
    fn prefers_primary_source_over_earlier_others() {
        let event = KillEvent::new(
            victim(),
            vec![
                KillParticipant::other(player("p:bob", "Bob")),
                KillParticipant::primary(player("p:carol", "Carol")),
            ],
        );
        let killer = select_killer(&event).expect("killer found");
        assert_eq!(killer.player.player_id, PlayerId::new("p:carol"));
    }

    #[test]
    fn falls_back_to_first_distinct_participant_in_order() {
        let event = KillEvent::new(
            victim(),
            vec![
                KillParticipant::other(player("p:bob", "Bob")),
                KillParticipant::other(player("p:carol", "Carol")),
            ],
        );
        let killer = select_killer(&event).expect("killer found");
        assert_eq!(killer.player.player_id, PlayerId::new("p:bob"));
    }

    #[test]
    fn never_credits_synthetic_participants() {
        let event = KillEvent::new(
            victim(),
            vec![KillParticipant::synthetic(
                player("p:turret", "Turret"),
                ParticipantRole::PrimarySource,
            )],
        );
        assert!(select_killer(&event).is_none());

        let mixed = KillEvent::new(
            victim(),
            vec![
                KillParticipant::synthetic(
                    player("p:turret", "Turret"),
                    ParticipantRole::PrimarySource,
                ),
                KillParticipant::other(player("p:bob", "Bob")),
            ],
        );
        let killer = select_killer(&mixed).expect("real participant wins");
        assert_eq!(killer.player.player_id, PlayerId::new("p:bob"));
    }

    #[test]
    fn never_credits_the_victim() {
        let event = KillEvent::new(
            victim(),
            vec![KillParticipant::primary(victim())],
        );
        assert!(select_killer(&event).is_none());
    }

    #[test]
    fn empty_cause_chain_yields_no_killer() {
        let event = KillEvent::new(victim(), Vec::new());
        assert!(select_killer(&event).is_none());
    }
}
