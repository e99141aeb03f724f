use std::fmt;
use std::path::Path;

use bounty_core::host::{BountyStore, ProfileDirectory, StoreError};
use contracts::{PlayerId, PlayerProfile, PlayerRef};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Durable bounty slots, one row per (player, attribute) pair. The attribute
/// name comes from configuration so several features can share the table
/// without colliding.
#[derive(Debug)]
pub struct SqlitePlayerStore {
    conn: Connection,
    attribute: String,
}

impl SqlitePlayerStore {
    pub fn open(path: impl AsRef<Path>, attribute_key: &str) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        configure(&conn)?;
        migrate(&conn)?;
        Ok(Self {
            conn,
            attribute: attribute_key.to_string(),
        })
    }
}

impl BountyStore for SqlitePlayerStore {
    fn read(&self, player: &PlayerId) -> Result<Option<u64>, StoreError> {
        let value: Option<i64> = self
            .conn
            .query_row(
                "SELECT value FROM player_attributes
                 WHERE player_id = ?1 AND attribute = ?2",
                params![player.as_str(), self.attribute.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| StoreError::Read {
                player: player.clone(),
                detail: err.to_string(),
            })?;

        match value {
            Some(raw) => u64::try_from(raw).map(Some).map_err(|_| StoreError::Read {
                player: player.clone(),
                detail: format!("negative value {raw} in slot {}", self.attribute),
            }),
            None => Ok(None),
        }
    }

    fn write(&mut self, player: &PlayerId, amount: u64) -> Result<(), StoreError> {
        let value = i64::try_from(amount).map_err(|_| StoreError::Write {
            player: player.clone(),
            detail: format!("value {amount} exceeds the storable range"),
        })?;

        self.conn
            .execute(
                "INSERT INTO player_attributes (player_id, attribute, value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(player_id, attribute) DO UPDATE SET value = excluded.value",
                params![player.as_str(), self.attribute.as_str(), value],
            )
            .map(|_| ())
            .map_err(|err| StoreError::Write {
                player: player.clone(),
                detail: err.to_string(),
            })
    }
}

/// Profile table backing directory enumeration. A NULL display name marks a
/// profile the host knows but cannot resolve.
#[derive(Debug)]
pub struct SqliteProfileDirectory {
    conn: Connection,
}

impl SqliteProfileDirectory {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        configure(&conn)?;
        migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn upsert_profile(
        &mut self,
        player_id: &PlayerId,
        display_name: Option<&str>,
    ) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO player_profiles (player_id, display_name)
             VALUES (?1, ?2)
             ON CONFLICT(player_id) DO UPDATE SET display_name = excluded.display_name",
            params![player_id.as_str(), display_name],
        )?;
        Ok(())
    }
}

impl ProfileDirectory for SqliteProfileDirectory {
    fn list_all_profiles(&self) -> Vec<PlayerProfile> {
        let mut stmt = match self.conn.prepare(
            "SELECT player_id, display_name FROM player_profiles ORDER BY player_id ASC",
        ) {
            Ok(stmt) => stmt,
            Err(err) => {
                log::error!("profile enumeration failed: {err}");
                return Vec::new();
            }
        };

        let rows = match stmt.query_map([], |row| {
            Ok(PlayerProfile::new(
                PlayerId::new(row.get::<_, String>(0)?),
                row.get::<_, Option<String>>(1)?,
            ))
        }) {
            Ok(rows) => rows,
            Err(err) => {
                log::error!("profile enumeration failed: {err}");
                return Vec::new();
            }
        };

        let mut profiles = Vec::new();
        for row in rows {
            match row {
                Ok(profile) => profiles.push(profile),
                Err(err) => log::warn!("skipping unreadable profile row: {err}"),
            }
        }
        profiles
    }

    fn resolve(&self, profile: &PlayerProfile) -> Option<PlayerRef> {
        if let Some(name) = &profile.display_name {
            return Some(PlayerRef::new(profile.player_id.clone(), name.clone()));
        }

        let looked_up: Result<Option<Option<String>>, rusqlite::Error> = self
            .conn
            .query_row(
                "SELECT display_name FROM player_profiles WHERE player_id = ?1",
                params![profile.player_id.as_str()],
                |row| row.get(0),
            )
            .optional();

        match looked_up {
            Ok(Some(Some(name))) => Some(PlayerRef::new(profile.player_id.clone(), name)),
            Ok(_) => None,
            Err(err) => {
                log::warn!("profile lookup failed for {}: {err}", profile.player_id);
                None
            }
        }
    }
}

fn configure(conn: &Connection) -> Result<(), PersistenceError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

fn migrate(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS player_profiles (
            player_id TEXT PRIMARY KEY,
            display_name TEXT
        );

        CREATE TABLE IF NOT EXISTS player_attributes (
            player_id TEXT NOT NULL,
            attribute TEXT NOT NULL,
            value INTEGER NOT NULL,
            PRIMARY KEY (player_id, attribute)
        );

        CREATE INDEX IF NOT EXISTS idx_player_attributes_attribute
            ON player_attributes(attribute, player_id);
        ",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
         VALUES(1, 'initial_v1', ?1)",
        params![epoch_stamp()],
    )?;

    Ok(())
}

fn epoch_stamp() -> String {
    let seconds = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    format!("epoch-{seconds}")
}
