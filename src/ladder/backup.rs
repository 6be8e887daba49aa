//! Timestamped ladder backups
//!
//! A backup is a JSON snapshot named `ladder_backup_<UTC timestamp>.json`
//! inside the backup directory. Names sort in creation order, so the latest
//! backup is the greatest name.

use crate::error::{LadderError, Result};
use crate::ladder::storage::{storage_error, JsonFileStorage, LadderSnapshot, LadderStorage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const PREFIX: &str = "ladder_backup_";
const EXTENSION: &str = ".json";

/// A backup written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub file: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub teams: usize,
    pub matches: usize,
    pub current_week: u32,
}

/// Ladder state after a restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub file: String,
    pub teams: usize,
    pub matches: usize,
    pub current_week: u32,
}

pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("{}{}{}", PREFIX, at.format("%Y%m%d_%H%M%S_%3f"), EXTENSION)
}

fn is_backup_name(name: &str) -> bool {
    name.starts_with(PREFIX)
        && name.ends_with(EXTENSION)
        && !name.contains('/')
        && !name.contains('\\')
}

/// Write `snapshot` to a new backup file in `dir`
pub fn write_backup(dir: &Path, snapshot: &LadderSnapshot) -> Result<BackupInfo> {
    let created_at = Utc::now();
    let file = backup_file_name(created_at);
    let path = dir.join(&file);
    if path.exists() {
        return Err(LadderError::invalid_state(format!("Backup {} already exists", file)).into());
    }

    JsonFileStorage::new(&path).save(snapshot)?;
    info!(
        "Backed up {} teams and {} matches to {}",
        snapshot.teams.len(),
        snapshot.matches.len(),
        path.display()
    );

    Ok(BackupInfo {
        file,
        path,
        created_at,
        teams: snapshot.teams.len(),
        matches: snapshot.matches.len(),
        current_week: snapshot.current_week,
    })
}

/// Backup file names in `dir`, oldest first. A missing directory has none.
pub fn list_backups(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| storage_error("list", dir, e))? {
        let entry = entry.map_err(|e| storage_error("list", dir, e))?;
        if let Some(name) = entry.file_name().to_str() {
            if is_backup_name(name) && entry.path().is_file() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Load a backup by file name, or the latest one when `file` is `None`
pub fn read_backup(dir: &Path, file: Option<&str>) -> Result<(String, LadderSnapshot)> {
    let name = match file {
        Some(name) if is_backup_name(name) => name.to_string(),
        Some(name) => {
            return Err(
                LadderError::invalid_input(format!("'{}' is not a backup file name", name)).into(),
            )
        }
        None => list_backups(dir)?.pop().ok_or_else(|| LadderError::NotFound {
            entity: "Backup",
            id: dir.display().to_string(),
        })?,
    };

    let snapshot = JsonFileStorage::new(dir.join(&name))
        .load()?
        .ok_or_else(|| LadderError::NotFound {
            entity: "Backup",
            id: name.clone(),
        })?;
    Ok((name, snapshot))
}
