//! Ladder persistence interface and implementations
//!
//! The ladder is saved as a whole snapshot on every committed write. Besides
//! the SQLite backend in [`sqlite`](crate::ladder::sqlite) there is an
//! in-memory one for tests and ephemeral runs, and a flat JSON file written
//! atomically via rename.

use crate::error::{LadderError, Result};
use crate::types::{Match, Team};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

/// Complete persisted state of a ladder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LadderSnapshot {
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
    /// Zero when the stored document predates the week counter
    #[serde(default)]
    pub current_week: u32,
}

impl LadderSnapshot {
    /// Week counter to resume from: the stored one, else one past the latest match week
    pub fn resolved_week(&self) -> u32 {
        if self.current_week > 0 {
            return self.current_week;
        }
        self.matches
            .iter()
            .map(|m| m.week + 1)
            .max()
            .unwrap_or(1)
    }
}

/// Trait for ladder storage operations
#[cfg_attr(test, mockall::automock)]
pub trait LadderStorage: Send + Sync {
    /// Load the stored ladder, `None` if nothing was saved yet
    fn load(&self) -> Result<Option<LadderSnapshot>>;

    /// Durably replace the stored ladder
    fn save(&self, snapshot: &LadderSnapshot) -> Result<()>;

    /// Human-readable backend description for logs and health checks
    fn describe(&self) -> String;
}

/// In-memory ladder storage implementation
#[derive(Debug, Default)]
pub struct InMemoryLadderStorage {
    snapshot: RwLock<Option<LadderSnapshot>>,
}

impl InMemoryLadderStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LadderStorage for InMemoryLadderStorage {
    fn load(&self) -> Result<Option<LadderSnapshot>> {
        let snapshot = self.snapshot.read().map_err(|_| LadderError::Internal {
            message: "Failed to acquire snapshot read lock".to_string(),
        })?;

        Ok(snapshot.clone())
    }

    fn save(&self, snapshot: &LadderSnapshot) -> Result<()> {
        let mut stored = self.snapshot.write().map_err(|_| LadderError::Internal {
            message: "Failed to acquire snapshot write lock".to_string(),
        })?;

        *stored = Some(snapshot.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Single JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

pub(crate) fn storage_error(action: &str, path: &Path, err: impl std::fmt::Display) -> LadderError {
    LadderError::Storage {
        message: format!("Failed to {} {}: {}", action, path.display(), err),
    }
}

impl LadderStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<LadderSnapshot>> {
        if !self.path.exists() {
            info!("No ladder data at {}, starting empty", self.path.display());
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| storage_error("read", &self.path, e))?;
        let snapshot: LadderSnapshot =
            serde_json::from_str(&raw).map_err(|e| storage_error("parse", &self.path, e))?;

        info!(
            "Loaded {} teams and {} matches from {}",
            snapshot.teams.len(),
            snapshot.matches.len(),
            self.path.display()
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &LadderSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| storage_error("serialize", &self.path, e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error("create", parent, e))?;
        }

        // Write-then-rename keeps the previous document intact on failure.
        let tmp = self.temp_path();
        {
            use std::io::Write;
            let mut file =
                std::fs::File::create(&tmp).map_err(|e| storage_error("create", &tmp, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| storage_error("write", &tmp, e))?;
            file.sync_all().map_err(|e| storage_error("sync", &tmp, e))?;
        }
        std::fs::rename(&tmp, &self.path).map_err(|e| storage_error("replace", &self.path, e))?;

        debug!("Saved ladder snapshot to {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}
