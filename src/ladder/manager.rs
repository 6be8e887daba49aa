//! Ladder manager: the authoritative team and match store
//!
//! All mutations go through a single write lock. Each one works on a copy of
//! the ladder, persists the copy, and only then publishes it, so readers see
//! either the old ladder or the fully updated one and a failed save changes
//! nothing.

use crate::config::LadderConfig;
use crate::error::{error_kind, LadderError, Result};
use crate::ladder::backup::{self, BackupInfo, RestoreReport};
use crate::ladder::pairing::pair_teams;
use crate::ladder::storage::{LadderSnapshot, LadderStorage};
use crate::metrics::MetricsCollector;
use crate::rating::{MatchResultInput, RatingCalculator, RatingOutcome, SideInput};
use crate::types::{
    GameScore, HistoryEntry, Match, MatchId, MatchType, Outcome, PointTotals, Rating, Side, Team,
    TeamName, TeamProfile,
};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Result of a submitted match: the completed match and both updated teams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedResult {
    #[serde(rename = "match")]
    pub match_record: Match,
    pub team_a: Team,
    pub team_b: Team,
    pub rating: RatingOutcome,
}

/// Per-team outcome of an inactivity sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InactivityReport {
    pub team: TeamName,
    pub weeks_charged: u32,
    pub rating_before: Rating,
    pub rating_after: Rating,
    /// The sweep moved the team to inactive
    pub deactivated: bool,
}

/// Summary counts for health checks and metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderStats {
    pub teams: usize,
    pub active_teams: usize,
    pub matches: usize,
    pub scheduled_matches: usize,
    pub completed_matches: usize,
    pub current_week: u32,
}

#[derive(Debug, Clone, Default)]
struct LadderState {
    teams: BTreeMap<TeamName, Team>,
    matches: Vec<Match>,
    current_week: u32,
}

impl LadderState {
    fn empty() -> Self {
        Self {
            current_week: 1,
            ..Self::default()
        }
    }

    /// Rebuild state from a stored snapshot; `provisional` follows matches played
    fn from_snapshot(snapshot: LadderSnapshot, placement_matches: u32) -> Self {
        let current_week = snapshot.resolved_week();
        Self {
            teams: snapshot
                .teams
                .into_iter()
                .map(|mut team| {
                    team.provisional = team.is_in_placement(placement_matches);
                    (team.name.clone(), team)
                })
                .collect(),
            matches: snapshot.matches,
            current_week,
        }
    }

    fn to_snapshot(&self) -> LadderSnapshot {
        LadderSnapshot {
            teams: self.teams.values().cloned().collect(),
            matches: self.matches.clone(),
            current_week: self.current_week,
        }
    }

    fn team(&self, name: &str) -> Result<&Team> {
        self.teams
            .get(name)
            .ok_or_else(|| LadderError::team_not_found(name).into())
    }

    fn team_mut(&mut self, name: &str) -> Result<&mut Team> {
        self.teams
            .get_mut(name)
            .ok_or_else(|| LadderError::team_not_found(name).into())
    }

    fn match_index(&self, id: MatchId) -> Result<usize> {
        self.matches
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| LadderError::match_not_found(id).into())
    }

    fn ensure_team(&mut self, name: &str, initial_rating: Rating) -> Result<()> {
        let team = Team::new(name, initial_rating, self.current_week)?;
        if !self.teams.contains_key(&team.name) {
            info!("Registering team '{}' on first scheduled match", team.name);
            self.teams.insert(team.name.clone(), team);
        }
        Ok(())
    }
}

/// Owner of the ladder's teams and matches
pub struct LadderManager {
    state: RwLock<LadderState>,
    storage: Arc<dyn LadderStorage>,
    calculator: Arc<dyn RatingCalculator>,
    config: LadderConfig,
    metrics: Option<Arc<MetricsCollector>>,
}

impl LadderManager {
    /// Create a manager, loading whatever the storage already holds
    pub fn new(
        storage: Arc<dyn LadderStorage>,
        calculator: Arc<dyn RatingCalculator>,
        config: LadderConfig,
    ) -> Result<Self> {
        config.validate()?;

        let state = match storage.load()? {
            Some(snapshot) => LadderState::from_snapshot(snapshot, calculator.placement_matches()),
            None => LadderState::empty(),
        };

        info!(
            "Ladder loaded from {}: {} teams, {} matches, week {}",
            storage.describe(),
            state.teams.len(),
            state.matches.len(),
            state.current_week
        );

        Ok(Self {
            state: RwLock::new(state),
            storage,
            calculator,
            config,
            metrics: None,
        })
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        if let Ok(stats) = self.stats() {
            if let Some(metrics) = &self.metrics {
                metrics.update_from_ladder_stats(&stats);
            }
        }
        self
    }

    /// Run a mutation on a working copy, persist it, then publish it
    fn commit<T, F>(&self, operation: &str, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut LadderState) -> Result<T>,
    {
        let timer = self.metrics.as_ref().map(|m| m.start_timer());

        let result = self.apply(mutate);

        match result {
            Ok((value, stats)) => {
                if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
                    metrics.record_operation(operation, timer.stop());
                    metrics.update_from_ladder_stats(&stats);
                }
                Ok(value)
            }
            Err(e) => {
                warn!("Ladder operation '{}' failed: {}", operation, e);
                if let Some(metrics) = &self.metrics {
                    metrics.record_operation_error(operation, error_kind(&e));
                }
                Err(e)
            }
        }
    }

    fn apply<T, F>(&self, mutate: F) -> Result<(T, LadderStats)>
    where
        F: FnOnce(&mut LadderState) -> Result<T>,
    {
        let mut guard = self.state.write().map_err(|_| LadderError::Internal {
            message: "Failed to acquire ladder write lock".to_string(),
        })?;

        let mut working = guard.clone();
        let value = mutate(&mut working)?;
        self.storage.save(&working.to_snapshot())?;
        *guard = working;
        Ok((value, Self::stats_of(&guard)))
    }

    fn read<T, F>(&self, query: F) -> Result<T>
    where
        F: FnOnce(&LadderState) -> Result<T>,
    {
        let guard = self.state.read().map_err(|_| LadderError::Internal {
            message: "Failed to acquire ladder read lock".to_string(),
        })?;
        query(&guard)
    }

    fn stats_of(state: &LadderState) -> LadderStats {
        let completed = state.matches.iter().filter(|m| m.completed).count();
        LadderStats {
            teams: state.teams.len(),
            active_teams: state.teams.values().filter(|t| t.active).count(),
            matches: state.matches.len(),
            scheduled_matches: state.matches.len() - completed,
            completed_matches: completed,
            current_week: state.current_week,
        }
    }

    /// Register a new team at the configured initial rating
    pub fn register_team(&self, name: &str) -> Result<Team> {
        self.register_team_with(name, TeamProfile::default())
    }

    /// Register a new team with its roster, logo and colour
    pub fn register_team_with(&self, name: &str, profile: TeamProfile) -> Result<Team> {
        let initial_rating = self.calculator.initial_rating();
        self.commit("register_team", |state| {
            let mut team = Team::new(name, initial_rating, state.current_week)?;
            team.apply_profile(profile)?;
            if state.teams.contains_key(&team.name) {
                return Err(LadderError::invalid_input(format!(
                    "Team '{}' already exists",
                    team.name
                ))
                .into());
            }
            info!("Registered team '{}' at {}", team.name, team.rating);
            state.teams.insert(team.name.clone(), team.clone());
            Ok(team)
        })
    }

    /// Schedule a single match, registering unknown teams on the way
    pub fn schedule_match(
        &self,
        team_a: &str,
        team_b: &str,
        week: u32,
        match_type: MatchType,
    ) -> Result<Match> {
        let initial_rating = self.calculator.initial_rating();
        let scheduled = self.commit("schedule_match", |state| {
            if week == 0 {
                return Err(LadderError::invalid_input("Week numbers start at 1").into());
            }
            let new_match = Match::scheduled(team_a, team_b, week, match_type)?;
            state.ensure_team(&new_match.team_a, initial_rating)?;
            state.ensure_team(&new_match.team_b, initial_rating)?;
            info!(
                "Scheduled {} match {}: '{}' vs '{}' (week {})",
                match_type, new_match.id, new_match.team_a, new_match.team_b, week
            );
            state.matches.push(new_match.clone());
            Ok(new_match)
        })?;

        if let Some(metrics) = &self.metrics {
            metrics.record_match_scheduled();
        }
        Ok(scheduled)
    }

    /// Pair active teams at random for `week`; see [`pair_teams`]
    pub fn generate_matches(&self, matches_per_team: u32, week: u32) -> Result<Vec<Match>> {
        self.generate_matches_with_rng(matches_per_team, week, &mut rand::thread_rng())
    }

    /// [`generate_matches`](Self::generate_matches) with a caller-supplied RNG
    pub fn generate_matches_with_rng<R: Rng + ?Sized>(
        &self,
        matches_per_team: u32,
        week: u32,
        rng: &mut R,
    ) -> Result<Vec<Match>> {
        let generated = self.commit("generate_matches", |state| {
            if matches_per_team == 0 {
                return Err(LadderError::invalid_input("Matches per team must be at least 1").into());
            }
            if week == 0 {
                return Err(LadderError::invalid_input("Week numbers start at 1").into());
            }

            let active: Vec<TeamName> = state
                .teams
                .values()
                .filter(|team| team.active)
                .map(|team| team.name.clone())
                .collect();
            if active.len() < 2 {
                warn!(
                    "Not enough active teams to generate matches ({} active)",
                    active.len()
                );
                return Ok(Vec::new());
            }

            // Matches already in the week use up quota and may not be repeated
            let scheduled: Vec<(TeamName, TeamName)> = state
                .matches
                .iter()
                .filter(|m| m.week == week)
                .map(|m| (m.team_a.clone(), m.team_b.clone()))
                .collect();

            let created = pair_teams(&active, matches_per_team, &scheduled, rng)
                .into_iter()
                .map(|(a, b)| Match::scheduled(&a, &b, week, MatchType::Regular))
                .collect::<Result<Vec<_>>>()?;

            info!(
                "Generated {} matches for week {} from {} active teams ({} already scheduled)",
                created.len(),
                week,
                active.len(),
                scheduled.len()
            );
            state.matches.extend(created.iter().cloned());
            Ok(created)
        })?;

        if let Some(metrics) = &self.metrics {
            metrics.record_matches_generated(generated.len());
        }
        Ok(generated)
    }

    /// Record the result of a scheduled match and rate both teams.
    ///
    /// Fails with `NotFound` for an unknown match or team, `InvalidState` when
    /// the match is already completed or an inactive team is involved, and
    /// `InvalidInput` for a malformed score. Nothing changes on failure.
    pub fn submit_result(
        &self,
        match_id: MatchId,
        games_a: u8,
        games_b: u8,
        points_a: u32,
        points_b: u32,
    ) -> Result<SubmittedResult> {
        let placement_matches = self.calculator.placement_matches();
        let allow_inactive = self.config.allow_inactive_results;

        let submitted = self.commit("submit_result", |state| {
            let index = state.match_index(match_id)?;
            let scheduled = state.matches[index].clone();
            if scheduled.completed {
                return Err(LadderError::invalid_state(format!(
                    "Match {} is already completed",
                    match_id
                ))
                .into());
            }

            let score = GameScore::new(games_a, games_b)?;
            let points = PointTotals {
                a: points_a,
                b: points_b,
            };

            let team_a = state.team(&scheduled.team_a)?;
            let team_b = state.team(&scheduled.team_b)?;
            if !allow_inactive {
                if let Some(inactive) = [team_a, team_b].into_iter().find(|t| !t.active) {
                    return Err(LadderError::invalid_state(format!(
                        "Team '{}' is inactive",
                        inactive.name
                    ))
                    .into());
                }
            }

            // Placement is decided from matches played before this one.
            let input = MatchResultInput {
                side_a: SideInput {
                    team: team_a.name.clone(),
                    rating: team_a.rating as f64,
                    games_won: score.a,
                    points: points.a,
                    is_placement: team_a.is_in_placement(placement_matches),
                },
                side_b: SideInput {
                    team: team_b.name.clone(),
                    rating: team_b.rating as f64,
                    games_won: score.b,
                    points: points.b,
                    is_placement: team_b.is_in_placement(placement_matches),
                },
                match_type: scheduled.match_type,
            };
            let rating_before = (team_a.rating, team_b.rating);

            let outcome = self.calculator.apply_result(&input)?;
            let now = Utc::now();

            for (side, name, opponent, before, delta) in [
                (
                    Side::A,
                    &scheduled.team_a,
                    &scheduled.team_b,
                    rating_before.0,
                    &outcome.side_a,
                ),
                (
                    Side::B,
                    &scheduled.team_b,
                    &scheduled.team_a,
                    rating_before.1,
                    &outcome.side_b,
                ),
            ] {
                let (games_for, games_against) = score.for_side(side);
                let entry = HistoryEntry {
                    match_id: Some(match_id),
                    opponent: Some(opponent.clone()),
                    outcome: if outcome.winner == side {
                        Outcome::Win
                    } else {
                        Outcome::Loss
                    },
                    games_for: Some(games_for),
                    games_against: Some(games_against),
                    rating_before: before,
                    rating_after: delta.new_rating,
                    rating_delta: delta.new_rating - before,
                    week: scheduled.week,
                    recorded_at: now,
                };
                let team = state.team_mut(name)?;
                team.record_match(entry);
                team.provisional = team.is_in_placement(placement_matches);
            }

            state.matches[index].complete(score, points, now)?;

            let result = SubmittedResult {
                match_record: state.matches[index].clone(),
                team_a: state.team(&scheduled.team_a)?.clone(),
                team_b: state.team(&scheduled.team_b)?.clone(),
                rating: outcome,
            };

            info!(
                "Result {} for match {}: '{}' {} -> {}, '{}' {} -> {}",
                score,
                match_id,
                result.team_a.name,
                rating_before.0,
                result.team_a.rating,
                result.team_b.name,
                rating_before.1,
                result.team_b.rating
            );
            Ok(result)
        })?;

        if let Some(metrics) = &self.metrics {
            metrics.record_result(
                submitted.match_record.match_type,
                submitted.rating.side_a.applied_delta(),
                submitted.rating.side_b.applied_delta(),
            );
        }
        Ok(submitted)
    }

    /// Replace a team's roster, logo or colour
    pub fn update_team_profile(&self, name: &str, profile: TeamProfile) -> Result<Team> {
        self.commit("update_team_profile", |state| {
            let team = state.team_mut(name)?;
            team.apply_profile(profile)?;
            info!("Updated profile of team '{}'", name);
            Ok(team.clone())
        })
    }

    /// Remove a match that has not been played yet
    pub fn delete_match(&self, match_id: MatchId) -> Result<Match> {
        self.commit("delete_match", |state| {
            let index = state.match_index(match_id)?;
            if state.matches[index].completed {
                return Err(LadderError::invalid_state(format!(
                    "Match {} is completed and cannot be deleted",
                    match_id
                ))
                .into());
            }
            info!("Deleted scheduled match {}", match_id);
            Ok(state.matches.remove(index))
        })
    }

    /// Mark a team inactive by hand
    pub fn deactivate_team(&self, name: &str) -> Result<Team> {
        self.commit("deactivate_team", |state| {
            let team = state.team_mut(name)?;
            if !team.active {
                return Err(
                    LadderError::invalid_state(format!("Team '{}' is already inactive", name))
                        .into(),
                );
            }
            team.active = false;
            team.updated_at = Utc::now();
            info!("Team '{}' deactivated", name);
            Ok(team.clone())
        })
    }

    /// Bring an inactive team back; inactivity is counted afresh from this week
    pub fn reactivate_team(&self, name: &str) -> Result<Team> {
        self.commit("reactivate_team", |state| {
            let week = state.current_week;
            let team = state.team_mut(name)?;
            if team.active {
                return Err(
                    LadderError::invalid_state(format!("Team '{}' is already active", name)).into(),
                );
            }
            team.active = true;
            team.reactivated_week = Some(week);
            team.updated_at = Utc::now();
            info!("Team '{}' reactivated in week {}", name, week);
            Ok(team.clone())
        })
    }

    /// Charge inactivity penalties for every active team through `through_week`.
    ///
    /// Each team pays for the weeks after its last activity (or last sweep)
    /// and is marked inactive once it has gone the configured number of weeks
    /// without a completed match. The sweep applies to all teams or to none.
    pub fn apply_inactivity_sweep(&self, through_week: u32) -> Result<Vec<InactivityReport>> {
        let inactive_after = self.config.inactive_after_weeks;

        let reports = self.commit("inactivity_sweep", |state| {
            if through_week > state.current_week {
                return Err(LadderError::invalid_input(format!(
                    "Cannot sweep through week {} while the ladder is in week {}",
                    through_week, state.current_week
                ))
                .into());
            }

            let now = Utc::now();
            let mut reports = Vec::new();
            for team in state.teams.values_mut().filter(|team| team.active) {
                let weeks_charged = through_week.saturating_sub(team.inactivity_baseline());
                let rating_before = team.rating;

                if weeks_charged > 0 {
                    let rating_after = self.calculator.apply_inactivity(team.rating, weeks_charged);
                    team.history.push(HistoryEntry {
                        match_id: None,
                        opponent: None,
                        outcome: Outcome::InactivityPenalty,
                        games_for: None,
                        games_against: None,
                        rating_before,
                        rating_after,
                        rating_delta: rating_after - rating_before,
                        week: through_week,
                        recorded_at: now,
                    });
                    team.rating = rating_after;
                    team.penalized_through_week = Some(through_week);
                    team.updated_at = now;
                }

                let idle_weeks = through_week.saturating_sub(team.activity_baseline());
                let deactivated = idle_weeks >= inactive_after;
                if deactivated {
                    team.active = false;
                    team.updated_at = now;
                }

                if weeks_charged > 0 || deactivated {
                    debug!(
                        "Inactivity for '{}': {} weeks charged, {} -> {}{}",
                        team.name,
                        weeks_charged,
                        rating_before,
                        team.rating,
                        if deactivated { ", now inactive" } else { "" }
                    );
                    reports.push(InactivityReport {
                        team: team.name.clone(),
                        weeks_charged,
                        rating_before,
                        rating_after: team.rating,
                        deactivated,
                    });
                }
            }

            info!(
                "Inactivity sweep through week {}: {} teams affected",
                through_week,
                reports.len()
            );
            Ok(reports)
        })?;

        if let Some(metrics) = &self.metrics {
            metrics.record_inactivity_sweep(
                reports.iter().filter(|r| r.weeks_charged > 0).count(),
                reports.iter().filter(|r| r.deactivated).count(),
            );
        }
        Ok(reports)
    }

    pub fn current_week(&self) -> Result<u32> {
        self.read(|state| Ok(state.current_week))
    }

    /// Move the ladder to the next week
    pub fn advance_week(&self) -> Result<u32> {
        self.commit("advance_week", |state| {
            state.current_week += 1;
            info!("Ladder advanced to week {}", state.current_week);
            Ok(state.current_week)
        })
    }

    pub fn set_week(&self, week: u32) -> Result<u32> {
        self.commit("set_week", |state| {
            if week == 0 {
                return Err(LadderError::invalid_input("Week numbers start at 1").into());
            }
            state.current_week = week;
            info!("Ladder week set to {}", week);
            Ok(week)
        })
    }

    /// Teams by rating, highest first; equal ratings by name
    pub fn standings(&self) -> Result<Vec<Team>> {
        self.read(|state| {
            let mut teams: Vec<Team> = state.teams.values().cloned().collect();
            teams.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.name.cmp(&b.name)));
            Ok(teams)
        })
    }

    /// All teams ordered by name
    pub fn list_teams(&self) -> Result<Vec<Team>> {
        self.read(|state| Ok(state.teams.values().cloned().collect()))
    }

    pub fn get_team(&self, name: &str) -> Result<Team> {
        self.read(|state| state.team(name).cloned())
    }

    /// A team's history in the order it was recorded
    pub fn team_history(&self, name: &str) -> Result<Vec<HistoryEntry>> {
        self.read(|state| Ok(state.team(name)?.history.clone()))
    }

    pub fn get_match(&self, match_id: MatchId) -> Result<Match> {
        self.read(|state| {
            let index = state.match_index(match_id)?;
            Ok(state.matches[index].clone())
        })
    }

    /// Matches in creation order, optionally limited to one week
    pub fn list_matches(&self, week: Option<u32>) -> Result<Vec<Match>> {
        self.read(|state| {
            Ok(state
                .matches
                .iter()
                .filter(|m| week.map_or(true, |w| m.week == w))
                .cloned()
                .collect())
        })
    }

    /// Full export of the ladder
    pub fn snapshot(&self) -> Result<LadderSnapshot> {
        self.read(|state| Ok(state.to_snapshot()))
    }

    pub fn stats(&self) -> Result<LadderStats> {
        self.read(|state| Ok(Self::stats_of(state)))
    }

    /// Write the current ladder to a timestamped backup file in `dir`
    pub fn backup(&self, dir: &Path) -> Result<BackupInfo> {
        let snapshot = self.snapshot()?;
        let written = backup::write_backup(dir, &snapshot);
        if let Err(e) = &written {
            warn!("Backup to {} failed: {}", dir.display(), e);
        }
        written
    }

    /// Backup file names in `dir`, oldest first
    pub fn list_backups(&self, dir: &Path) -> Result<Vec<String>> {
        backup::list_backups(dir)
    }

    /// Replace the whole ladder with a backup: the named file, else the latest.
    ///
    /// The restored ladder is saved to the primary storage before it becomes
    /// visible, like any other write.
    pub fn restore(&self, dir: &Path, file: Option<&str>) -> Result<RestoreReport> {
        let (file, snapshot) = backup::read_backup(dir, file)?;
        let placement_matches = self.calculator.placement_matches();

        self.commit("restore", move |state| {
            *state = LadderState::from_snapshot(snapshot, placement_matches);
            info!(
                "Restored ladder from {}: {} teams, {} matches, week {}",
                file,
                state.teams.len(),
                state.matches.len(),
                state.current_week
            );
            Ok(RestoreReport {
                file,
                teams: state.teams.len(),
                matches: state.matches.len(),
                current_week: state.current_week,
            })
        })
    }

    /// Discard in-memory state and reload whatever the storage holds
    pub fn refresh(&self) -> Result<LadderStats> {
        let mut guard = self.state.write().map_err(|_| LadderError::Internal {
            message: "Failed to acquire ladder write lock".to_string(),
        })?;

        *guard = match self.storage.load()? {
            Some(snapshot) => {
                LadderState::from_snapshot(snapshot, self.calculator.placement_matches())
            }
            None => LadderState::empty(),
        };
        let stats = Self::stats_of(&guard);
        drop(guard);

        info!(
            "Reloaded ladder from {}: {} teams, {} matches, week {}",
            self.storage.describe(),
            stats.teams,
            stats.matches,
            stats.current_week
        );
        if let Some(metrics) = &self.metrics {
            metrics.update_from_ladder_stats(&stats);
        }
        Ok(stats)
    }
}
