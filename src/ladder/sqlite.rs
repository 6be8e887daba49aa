//! SQLite ladder storage
//!
//! Teams and matches are stored one row each, next to a small metadata table
//! for the week counter. The summary columns make the tables queryable from
//! outside the service; the `record` column holds the full JSON of the row so
//! history and timestamps load back unchanged. Every save replaces all rows
//! inside one transaction.

use crate::error::{LadderError, Result};
use crate::ladder::storage::{storage_error, JsonFileStorage, LadderSnapshot, LadderStorage};
use crate::types::{Match, Team};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS teams (
    name TEXT PRIMARY KEY,
    rating INTEGER NOT NULL,
    matches_played INTEGER NOT NULL,
    wins INTEGER NOT NULL,
    losses INTEGER NOT NULL,
    active INTEGER NOT NULL,
    provisional INTEGER NOT NULL,
    record TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS matches (
    id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    team_a TEXT NOT NULL,
    team_b TEXT NOT NULL,
    week INTEGER NOT NULL,
    completed INTEGER NOT NULL,
    record TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS ladder_meta (
    key TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
";

const WEEK_KEY: &str = "current_week";

/// Ladder stored in a SQLite database file
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStorage {
    /// Open (or create) the database and make sure the schema exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error("create", parent, e))?;
        }

        let conn = Connection::open(&path).map_err(|e| storage_error("open", &path, e))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| storage_error("initialize", &path, e))?;

        info!("Opened SQLite ladder database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Import a legacy JSON ladder document into an empty database.
    ///
    /// Returns whether anything was imported. A database that already holds a
    /// ladder is never overwritten.
    pub fn migrate_from_json(&self, legacy: &Path) -> Result<bool> {
        if self.load()?.is_some() {
            return Ok(false);
        }

        let snapshot = match JsonFileStorage::new(legacy).load()? {
            Some(snapshot) => snapshot,
            None => return Ok(false),
        };

        self.save(&snapshot)?;
        info!(
            "Migrated {} teams and {} matches from {} into {}",
            snapshot.teams.len(),
            snapshot.matches.len(),
            legacy.display(),
            self.path.display()
        );
        Ok(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            LadderError::Internal {
                message: "Failed to acquire database lock".to_string(),
            }
            .into()
        })
    }

    fn records(&self, conn: &Connection, sql: &str) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| storage_error("query", &self.path, e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| storage_error("query", &self.path, e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| storage_error("read", &self.path, e))?;
        Ok(rows)
    }
}

impl LadderStorage for SqliteStorage {
    fn load(&self) -> Result<Option<LadderSnapshot>> {
        let conn = self.lock()?;

        let week: Option<u32> = conn
            .query_row(
                "SELECT value FROM ladder_meta WHERE key = ?1",
                params![WEEK_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| storage_error("read", &self.path, e))?;

        let teams = self
            .records(&conn, "SELECT record FROM teams ORDER BY name")?
            .iter()
            .map(|record| serde_json::from_str::<Team>(record))
            .collect::<serde_json::Result<Vec<_>>>()
            .map_err(|e| storage_error("parse", &self.path, e))?;
        let matches = self
            .records(&conn, "SELECT record FROM matches ORDER BY position")?
            .iter()
            .map(|record| serde_json::from_str::<Match>(record))
            .collect::<serde_json::Result<Vec<_>>>()
            .map_err(|e| storage_error("parse", &self.path, e))?;

        if week.is_none() && teams.is_empty() && matches.is_empty() {
            return Ok(None);
        }

        Ok(Some(LadderSnapshot {
            teams,
            matches,
            current_week: week.unwrap_or(0),
        }))
    }

    fn save(&self, snapshot: &LadderSnapshot) -> Result<()> {
        let mut conn = self.lock()?;
        let db = |e: rusqlite::Error| storage_error("write", &self.path, e);

        let tx = conn.transaction().map_err(db)?;
        tx.execute("DELETE FROM teams", []).map_err(db)?;
        tx.execute("DELETE FROM matches", []).map_err(db)?;
        {
            let mut insert_team = tx
                .prepare(
                    "INSERT INTO teams (name, rating, matches_played, wins, losses, active, provisional, record) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(db)?;
            for team in &snapshot.teams {
                let record = serde_json::to_string(team)
                    .map_err(|e| storage_error("serialize", &self.path, e))?;
                insert_team
                    .execute(params![
                        team.name,
                        team.rating,
                        team.matches_played,
                        team.wins,
                        team.losses,
                        team.active,
                        team.provisional,
                        record
                    ])
                    .map_err(db)?;
            }

            let mut insert_match = tx
                .prepare(
                    "INSERT INTO matches (id, position, team_a, team_b, week, completed, record) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(db)?;
            for (position, m) in snapshot.matches.iter().enumerate() {
                let record = serde_json::to_string(m)
                    .map_err(|e| storage_error("serialize", &self.path, e))?;
                insert_match
                    .execute(params![
                        m.id.to_string(),
                        position as i64,
                        m.team_a,
                        m.team_b,
                        m.week,
                        m.completed,
                        record
                    ])
                    .map_err(db)?;
            }
        }
        tx.execute(
            "INSERT INTO ladder_meta (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![WEEK_KEY, snapshot.current_week],
        )
        .map_err(db)?;
        tx.commit().map_err(db)?;

        debug!(
            "Saved {} teams and {} matches to {}",
            snapshot.teams.len(),
            snapshot.matches.len(),
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}
