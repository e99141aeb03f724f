//! Cross-boundary contracts shared by the bounty ledger, settlement engine,
//! host adapters, and CLI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, globally unique identifier for a game account. Display names are
/// derived and time-varying; lookups always key on this.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory enumeration record. A missing display name marks a profile the
/// host knows about but cannot resolve to a live player record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerProfile {
    pub player_id: PlayerId,
    pub display_name: Option<String>,
}

impl PlayerProfile {
    pub fn new(player_id: PlayerId, display_name: Option<String>) -> Self {
        Self {
            player_id,
            display_name,
        }
    }
}

/// A resolved player: identity plus the display name current at resolution
/// time. The name is for messages only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerRef {
    pub player_id: PlayerId,
    pub display_name: String,
}

impl PlayerRef {
    pub fn new(player_id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            player_id,
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Currency {
    pub code: String,
    pub symbol: String,
}

impl Currency {
    pub fn new(code: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// Role of a participant in a kill event's cause chain, as attributed by the
/// host's event-translation boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// The actor the host credits as the live damage source.
    PrimarySource,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KillParticipant {
    pub player: PlayerRef,
    pub role: ParticipantRole,
    /// Simulated or otherwise non-real actors never collect a bounty.
    #[serde(default)]
    pub synthetic: bool,
}

impl KillParticipant {
    pub fn primary(player: PlayerRef) -> Self {
        Self {
            player,
            role: ParticipantRole::PrimarySource,
            synthetic: false,
        }
    }

    pub fn other(player: PlayerRef) -> Self {
        Self {
            player,
            role: ParticipantRole::Other,
            synthetic: false,
        }
    }

    pub fn synthetic(player: PlayerRef, role: ParticipantRole) -> Self {
        Self {
            player,
            role,
            synthetic: true,
        }
    }
}

/// A player death as delivered by the host. `participants` is the ordered
/// cause chain; only player victims produce an event at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KillEvent {
    pub victim: PlayerRef,
    #[serde(default)]
    pub cancelled: bool,
    pub participants: Vec<KillParticipant>,
}

impl KillEvent {
    pub fn new(victim: PlayerRef, participants: Vec<KillParticipant>) -> Self {
        Self {
            victim,
            cancelled: false,
            participants,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferReason {
    BountyClaim {
        victim: PlayerId,
        killer: PlayerId,
    },
    BountyFunding {
        contributor: PlayerId,
        target: PlayerId,
    },
}

/// Causal tag attached to every economy transfer this feature issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferCause {
    pub issuer: String,
    pub reason: TransferReason,
}

impl TransferCause {
    pub fn claim(issuer: impl Into<String>, victim: PlayerId, killer: PlayerId) -> Self {
        Self {
            issuer: issuer.into(),
            reason: TransferReason::BountyClaim { victim, killer },
        }
    }

    pub fn funding(issuer: impl Into<String>, contributor: PlayerId, target: PlayerId) -> Self {
        Self {
            issuer: issuer.into(),
            reason: TransferReason::BountyFunding {
                contributor,
                target,
            },
        }
    }
}

impl fmt::Display for TransferCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            TransferReason::BountyClaim { victim, killer } => {
                write!(f, "{}: claim of {}'s bounty by {}", self.issuer, victim, killer)
            }
            TransferReason::BountyFunding {
                contributor,
                target,
            } => {
                write!(
                    f,
                    "{}: funding of {}'s bounty by {}",
                    self.issuer, target, contributor
                )
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BountyConfig {
    /// Issuer tag stamped into transfer causes and log lines.
    #[serde(default = "default_feature_id")]
    pub feature_id: String,
    /// Name of the per-player persisted slot the store adapters write under.
    #[serde(default = "default_attribute_key")]
    pub attribute_key: String,
}

fn default_feature_id() -> String {
    "bounty".to_string()
}

fn default_attribute_key() -> String {
    "bounty".to_string()
}

impl Default for BountyConfig {
    fn default() -> Self {
        Self {
            feature_id: default_feature_id(),
            attribute_key: default_attribute_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BountyCommand {
    /// Overwrite a player's bounty. Admin only.
    Set { target: PlayerRef, amount: i64 },
    /// Read a player's bounty; a player caller may omit the target.
    Get { target: Option<PlayerRef> },
    /// Raise a player's bounty, funded from the caller's own account.
    Add { target: PlayerRef, amount: i64 },
}

/// Who issued a command. Permission registration stays with the host; by the
/// time a command reaches this feature it carries a resolved caller and an
/// admin flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandSource {
    pub player: Option<PlayerRef>,
    #[serde(default)]
    pub admin: bool,
}

impl CommandSource {
    pub fn console() -> Self {
        Self {
            player: None,
            admin: true,
        }
    }

    pub fn player(player: PlayerRef) -> Self {
        Self {
            player: Some(player),
            admin: false,
        }
    }

    pub fn admin(player: PlayerRef) -> Self {
        Self {
            player: Some(player),
            admin: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandReply {
    pub accepted: bool,
    pub message: String,
}

impl CommandReply {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: message.into(),
        }
    }
}
