//! Test fixtures shared by the integration suites
#![allow(dead_code)]

use ladder_room::config::{LadderConfig, RatingConfig};
use ladder_room::error::{LadderError, Result};
use ladder_room::ladder::{
    InMemoryLadderStorage, JsonFileStorage, LadderManager, LadderSnapshot, LadderStorage,
    SqliteStorage, SubmittedResult,
};
use ladder_room::rating::EloMmrCalculator;
use ladder_room::types::MatchType;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Ladder on in-memory storage with default settings
pub fn memory_ladder() -> LadderManager {
    ladder_on(Arc::new(InMemoryLadderStorage::new()), LadderConfig::default())
}

/// Ladder persisted to a JSON file at `path`
pub fn json_ladder(path: &Path) -> LadderManager {
    ladder_on(Arc::new(JsonFileStorage::new(path)), LadderConfig::default())
}

/// Ladder persisted to a SQLite database at `path`
pub fn sqlite_ladder(path: &Path) -> LadderManager {
    ladder_on(
        Arc::new(SqliteStorage::open(path).unwrap()),
        LadderConfig::default(),
    )
}

pub fn ladder_on(storage: Arc<dyn LadderStorage>, config: LadderConfig) -> LadderManager {
    let calculator = EloMmrCalculator::new(RatingConfig::default()).unwrap();
    LadderManager::new(storage, Arc::new(calculator), config).unwrap()
}

/// Schedule and immediately record a regular match
pub fn play(
    ladder: &LadderManager,
    team_a: &str,
    team_b: &str,
    games: (u8, u8),
    points: (u32, u32),
) -> SubmittedResult {
    let week = ladder.current_week().unwrap();
    let scheduled = ladder
        .schedule_match(team_a, team_b, week, MatchType::Regular)
        .unwrap();
    ladder
        .submit_result(scheduled.id, games.0, games.1, points.0, points.1)
        .unwrap()
}

pub fn team_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("Team {:02}", i + 1)).collect()
}

/// In-memory storage whose saves can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyStorage {
    inner: InMemoryLadderStorage,
    failing: AtomicBool,
    saves: AtomicUsize,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl LadderStorage for FlakyStorage {
    fn load(&self) -> Result<Option<LadderSnapshot>> {
        self.inner.load()
    }

    fn save(&self, snapshot: &LadderSnapshot) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LadderError::Storage {
                message: "simulated write failure".to_string(),
            }
            .into());
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(snapshot)
    }

    fn describe(&self) -> String {
        "flaky in-memory storage".to_string()
    }
}
