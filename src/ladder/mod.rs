//! Ladder store: teams, matches, weekly pairing and persistence

pub mod backup;
pub mod manager;
pub mod pairing;
pub mod sqlite;
pub mod storage;

pub use backup::{BackupInfo, RestoreReport};
pub use manager::{InactivityReport, LadderManager, LadderStats, SubmittedResult};
pub use pairing::pair_teams;
pub use sqlite::SqliteStorage;
pub use storage::{InMemoryLadderStorage, JsonFileStorage, LadderSnapshot, LadderStorage};
