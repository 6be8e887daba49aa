//! JSON API over the ladder
//!
//! Handlers are thin: they resolve defaults from ladder state, call the
//! [`LadderManager`], and let [`ApiError`] map failures onto status codes.
//! Writes run on the blocking pool since every commit saves to storage while
//! holding the ladder's write lock.

use crate::error::LadderError;
use crate::http::error::ApiError;
use crate::ladder::{
    BackupInfo, InactivityReport, LadderManager, LadderSnapshot, LadderStats, RestoreReport,
    SubmittedResult,
};
use crate::service::app::AppState;
use crate::types::{HistoryEntry, Match, MatchId, MatchType, Rating, Team, TeamName, TeamProfile};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run a ladder write on the blocking pool
async fn write<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&LadderManager) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let ladder = state.ladder();
    let result = tokio::task::spawn_blocking(move || op(&ladder))
        .await
        .map_err(|e| {
            anyhow::Error::from(LadderError::Internal {
                message: format!("Ladder task failed: {}", e),
            })
        })?;
    Ok(result?)
}

/// One row of the standings table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingRow {
    pub rank: usize,
    pub name: TeamName,
    pub rating: Rating,
    pub matches_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub active: bool,
    pub in_placement: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(flatten)]
    pub profile: TeamProfile,
}

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    pub team_a: String,
    pub team_b: String,
    pub week: Option<u32>,
    #[serde(default)]
    pub match_type: MatchType,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResultRequest {
    pub games_a: u8,
    pub games_b: u8,
    pub points_a: u32,
    pub points_b: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub matches_per_team: Option<u32>,
    pub week: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SweepRequest {
    pub through_week: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SetWeekRequest {
    pub week: u32,
}

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub week: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RestoreRequest {
    /// Backup file name; the latest backup when absent
    pub file: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WeekResponse {
    pub current_week: u32,
}

pub async fn standings(State(state): State<Arc<AppState>>) -> ApiResult<Vec<StandingRow>> {
    let placement_matches = state.config().rating.placement_matches;
    let rows = state
        .ladder()
        .standings()?
        .into_iter()
        .enumerate()
        .map(|(index, team)| StandingRow {
            rank: index + 1,
            in_placement: team.is_in_placement(placement_matches),
            name: team.name,
            rating: team.rating,
            matches_played: team.matches_played,
            wins: team.wins,
            losses: team.losses,
            active: team.active,
        })
        .collect();
    Ok(Json(rows))
}

pub async fn list_teams(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Team>> {
    Ok(Json(state.ladder().list_teams()?))
}

pub async fn create_team(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTeamRequest>,
) -> Result<(StatusCode, Json<Team>), ApiError> {
    let team = write(&state, move |ladder| {
        ladder.register_team_with(&request.name, request.profile)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Team> {
    Ok(Json(state.ladder().get_team(&name)?))
}

pub async fn update_team(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(profile): Json<TeamProfile>,
) -> ApiResult<Team> {
    let team = write(&state, move |ladder| ladder.update_team_profile(&name, profile)).await?;
    Ok(Json(team))
}

pub async fn team_history(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Vec<HistoryEntry>> {
    Ok(Json(state.ladder().team_history(&name)?))
}

pub async fn deactivate_team(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Team> {
    let team = write(&state, move |ladder| ladder.deactivate_team(&name)).await?;
    Ok(Json(team))
}

pub async fn reactivate_team(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Team> {
    let team = write(&state, move |ladder| ladder.reactivate_team(&name)).await?;
    Ok(Json(team))
}

pub async fn list_matches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchQuery>,
) -> ApiResult<Vec<Match>> {
    Ok(Json(state.ladder().list_matches(query.week)?))
}

pub async fn create_match(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<Match>), ApiError> {
    let scheduled = write(&state, move |ladder| {
        let week = match request.week {
            Some(week) => week,
            None => ladder.current_week()?,
        };
        ladder.schedule_match(&request.team_a, &request.team_b, week, request.match_type)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(scheduled)))
}

pub async fn get_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
) -> ApiResult<Match> {
    Ok(Json(state.ladder().get_match(id)?))
}

pub async fn delete_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
) -> ApiResult<Match> {
    let deleted = write(&state, move |ladder| ladder.delete_match(id)).await?;
    Ok(Json(deleted))
}

pub async fn submit_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
    Json(request): Json<SubmitResultRequest>,
) -> ApiResult<SubmittedResult> {
    let submitted = write(&state, move |ladder| {
        ladder.submit_result(
            id,
            request.games_a,
            request.games_b,
            request.points_a,
            request.points_b,
        )
    })
    .await?;
    Ok(Json(submitted))
}

pub async fn generate_matches(
    State(state): State<Arc<AppState>>,
    request: Option<Json<GenerateRequest>>,
) -> Result<(StatusCode, Json<Vec<Match>>), ApiError> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let matches_per_team = request
        .matches_per_team
        .unwrap_or(state.config().ladder.default_matches_per_team);
    let generated = write(&state, move |ladder| {
        let week = match request.week {
            Some(week) => week,
            None => ladder.current_week()?,
        };
        ladder.generate_matches(matches_per_team, week)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(generated)))
}

pub async fn inactivity_sweep(
    State(state): State<Arc<AppState>>,
    request: Option<Json<SweepRequest>>,
) -> ApiResult<Vec<InactivityReport>> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let reports = write(&state, move |ladder| {
        let through_week = match request.through_week {
            Some(week) => week,
            None => ladder.current_week()?,
        };
        ladder.apply_inactivity_sweep(through_week)
    })
    .await?;
    Ok(Json(reports))
}

pub async fn current_week(State(state): State<Arc<AppState>>) -> ApiResult<WeekResponse> {
    let current_week = state.ladder().current_week()?;
    Ok(Json(WeekResponse { current_week }))
}

pub async fn set_week(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetWeekRequest>,
) -> ApiResult<WeekResponse> {
    let current_week = write(&state, move |ladder| ladder.set_week(request.week)).await?;
    Ok(Json(WeekResponse { current_week }))
}

pub async fn advance_week(State(state): State<Arc<AppState>>) -> ApiResult<WeekResponse> {
    let current_week = write(&state, |ladder| ladder.advance_week()).await?;
    Ok(Json(WeekResponse { current_week }))
}

pub async fn export(State(state): State<Arc<AppState>>) -> ApiResult<LadderSnapshot> {
    Ok(Json(state.ladder().snapshot()?))
}

pub async fn list_backups(State(state): State<Arc<AppState>>) -> ApiResult<Vec<String>> {
    let dir = state.config().storage.backup_dir.clone();
    Ok(Json(write(&state, move |ladder| ladder.list_backups(&dir)).await?))
}

pub async fn create_backup(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<BackupInfo>), ApiError> {
    let dir = state.config().storage.backup_dir.clone();
    let info = write(&state, move |ladder| ladder.backup(&dir)).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

pub async fn restore_backup(
    State(state): State<Arc<AppState>>,
    request: Option<Json<RestoreRequest>>,
) -> ApiResult<RestoreReport> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let dir = state.config().storage.backup_dir.clone();
    let report = write(&state, move |ladder| {
        ladder.restore(&dir, request.file.as_deref())
    })
    .await?;
    Ok(Json(report))
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> ApiResult<LadderStats> {
    Ok(Json(write(&state, |ladder| ladder.refresh()).await?))
}
