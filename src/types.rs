//! Common types used throughout the ladder service

use crate::error::{LadderError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique team identifier (the team's display name)
pub type TeamName = String;

/// Unique identifier for matches
pub type MatchId = Uuid;

/// Integer MMR value. Unbounded in both directions.
pub type Rating = i64;

/// Games a side must win to take a best-of-5 match
pub const GAMES_TO_WIN: u8 = 3;

/// Team colour used until one is chosen
pub const DEFAULT_HEXCOLOR: &str = "#374151";

/// Kind of match, which decides how much it moves ratings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Regular,
    Challenge,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Regular => write!(f, "regular"),
            MatchType::Challenge => write!(f, "challenge"),
        }
    }
}

/// One of the two sides of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

/// Games won by each side in a best-of-5 match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    pub a: u8,
    pub b: u8,
}

impl GameScore {
    /// Build a completed best-of-5 score: exactly one side on three games,
    /// the other on zero to two.
    pub fn new(a: u8, b: u8) -> Result<Self> {
        let valid = (a == GAMES_TO_WIN && b < GAMES_TO_WIN) || (b == GAMES_TO_WIN && a < GAMES_TO_WIN);
        if !valid {
            return Err(LadderError::invalid_input(format!(
                "{}-{} is not a completed best-of-5 result",
                a, b
            ))
            .into());
        }
        Ok(Self { a, b })
    }

    pub fn winner(&self) -> Side {
        if self.a > self.b {
            Side::A
        } else {
            Side::B
        }
    }

    /// Score line from the winner's perspective, e.g. `(3, 1)`
    pub fn winner_line(&self) -> (u8, u8) {
        (self.a.max(self.b), self.a.min(self.b))
    }

    pub fn for_side(&self, side: Side) -> (u8, u8) {
        match side {
            Side::A => (self.a, self.b),
            Side::B => (self.b, self.a),
        }
    }
}

impl std::fmt::Display for GameScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

/// Total rally points scored by each side across all games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTotals {
    pub a: u32,
    pub b: u32,
}

impl PointTotals {
    pub fn for_side(&self, side: Side) -> (u32, u32) {
        match side {
            Side::A => (self.a, self.b),
            Side::B => (self.b, self.a),
        }
    }
}

/// What a history entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    InactivityPenalty,
}

/// Structured result summary appended to a team's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub match_id: Option<MatchId>,
    pub opponent: Option<TeamName>,
    pub outcome: Outcome,
    pub games_for: Option<u8>,
    pub games_against: Option<u8>,
    pub rating_before: Rating,
    pub rating_after: Rating,
    pub rating_delta: Rating,
    pub week: u32,
    pub recorded_at: DateTime<Utc>,
}

/// A ladder team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub name: TeamName,
    pub rating: Rating,
    pub matches_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub active: bool,
    pub history: Vec<HistoryEntry>,
    /// Week the team joined the ladder
    pub registered_week: u32,
    /// Week of the team's latest completed match
    pub last_active_week: Option<u32>,
    /// Last week already charged by an inactivity sweep
    pub penalized_through_week: Option<u32>,
    /// Week of the latest manual reactivation
    pub reactivated_week: Option<u32>,
    /// Still playing placement matches
    #[serde(default = "default_provisional")]
    pub provisional: bool,
    /// Player names
    #[serde(default)]
    pub roster: Vec<String>,
    /// Logo URL or data URI, empty when unset
    #[serde(default)]
    pub logo: String,
    #[serde(default = "default_hexcolor")]
    pub hexcolor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_provisional() -> bool {
    true
}

fn default_hexcolor() -> String {
    DEFAULT_HEXCOLOR.to_string()
}

/// Display metadata for a team; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamProfile {
    pub roster: Option<Vec<String>>,
    pub logo: Option<String>,
    pub hexcolor: Option<String>,
}

impl TeamProfile {
    pub fn is_empty(&self) -> bool {
        self.roster.is_none() && self.logo.is_none() && self.hexcolor.is_none()
    }
}

/// `#rrggbb`
fn is_hexcolor(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

impl Team {
    /// Create a new active team with no matches played
    pub fn new(name: &str, initial_rating: Rating, registered_week: u32) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LadderError::invalid_input("Team name cannot be empty").into());
        }

        let now = Utc::now();
        Ok(Self {
            name: name.to_string(),
            rating: initial_rating,
            matches_played: 0,
            wins: 0,
            losses: 0,
            active: true,
            history: Vec::new(),
            registered_week,
            last_active_week: None,
            penalized_through_week: None,
            reactivated_week: None,
            provisional: true,
            roster: Vec::new(),
            logo: String::new(),
            hexcolor: default_hexcolor(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Update display metadata; nothing changes if the colour is malformed
    pub fn apply_profile(&mut self, profile: TeamProfile) -> Result<()> {
        if let Some(hexcolor) = &profile.hexcolor {
            if !is_hexcolor(hexcolor.trim()) {
                return Err(LadderError::invalid_input(format!(
                    "'{}' is not a #rrggbb colour",
                    hexcolor
                ))
                .into());
            }
        }

        if let Some(roster) = profile.roster {
            self.roster = roster
                .into_iter()
                .map(|player| player.trim().to_string())
                .filter(|player| !player.is_empty())
                .collect();
        }
        if let Some(logo) = profile.logo {
            self.logo = logo.trim().to_string();
        }
        if let Some(hexcolor) = profile.hexcolor {
            self.hexcolor = hexcolor.trim().to_lowercase();
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether the team's next match still counts as a placement match
    pub fn is_in_placement(&self, placement_matches: u32) -> bool {
        self.matches_played < placement_matches
    }

    /// Latest week the team is known to have been active
    pub fn activity_baseline(&self) -> u32 {
        [self.last_active_week, self.reactivated_week]
            .into_iter()
            .flatten()
            .fold(self.registered_week, u32::max)
    }

    /// Week after which inactivity penalties are still owed
    pub fn inactivity_baseline(&self) -> u32 {
        self.penalized_through_week
            .map_or(self.activity_baseline(), |week| {
                week.max(self.activity_baseline())
            })
    }

    /// Apply a finished match to this team's record
    pub(crate) fn record_match(&mut self, entry: HistoryEntry) {
        self.rating = entry.rating_after;
        self.matches_played += 1;
        match entry.outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::InactivityPenalty => {}
        }
        self.last_active_week = Some(
            self.last_active_week
                .map_or(entry.week, |week| week.max(entry.week)),
        );
        self.updated_at = entry.recorded_at;
        self.history.push(entry);
    }
}

/// A scheduled or completed match between two teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub team_a: TeamName,
    pub team_b: TeamName,
    pub week: u32,
    pub match_type: MatchType,
    pub score: Option<GameScore>,
    pub points: Option<PointTotals>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Create a match in the scheduled state
    pub fn scheduled(team_a: &str, team_b: &str, week: u32, match_type: MatchType) -> Result<Self> {
        let team_a = team_a.trim();
        let team_b = team_b.trim();
        if team_a.is_empty() || team_b.is_empty() {
            return Err(LadderError::invalid_input("Team name cannot be empty").into());
        }
        if team_a == team_b {
            return Err(LadderError::invalid_input(format!(
                "A team cannot play itself: '{}'",
                team_a
            ))
            .into());
        }

        Ok(Self {
            id: Uuid::new_v4(),
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            week,
            match_type,
            score: None,
            points: None,
            completed: false,
            completed_at: None,
            created_at: Utc::now(),
        })
    }

    pub fn involves(&self, team: &str) -> bool {
        self.team_a == team || self.team_b == team
    }

    /// One-way transition to the completed state
    pub(crate) fn complete(
        &mut self,
        score: GameScore,
        points: PointTotals,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if self.completed {
            return Err(LadderError::invalid_state(format!(
                "Match {} is already completed",
                self.id
            ))
            .into());
        }
        self.score = Some(score);
        self.points = Some(points);
        self.completed = true;
        self.completed_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_kind, ErrorKind};

    #[test]
    fn test_game_score_validation() {
        for (a, b) in [(3, 0), (3, 1), (3, 2), (0, 3), (1, 3), (2, 3)] {
            assert!(GameScore::new(a, b).is_ok(), "{}-{} should be valid", a, b);
        }
        for (a, b) in [(0, 0), (2, 2), (3, 3), (4, 1), (2, 1), (1, 5)] {
            let err = GameScore::new(a, b).unwrap_err();
            assert_eq!(error_kind(&err), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_game_score_perspectives() {
        let score = GameScore::new(1, 3).unwrap();
        assert_eq!(score.winner(), Side::B);
        assert_eq!(score.winner_line(), (3, 1));
        assert_eq!(score.for_side(Side::A), (1, 3));
        assert_eq!(score.for_side(Side::B), (3, 1));
    }

    #[test]
    fn test_team_creation() {
        let team = Team::new("  Spikers ", 1000, 2).unwrap();
        assert_eq!(team.name, "Spikers");
        assert_eq!(team.rating, 1000);
        assert!(team.active);
        assert!(team.is_in_placement(3));
        assert_eq!(team.inactivity_baseline(), 2);

        let mut team = team;
        team.last_active_week = Some(5);
        team.penalized_through_week = Some(7);
        assert_eq!(team.activity_baseline(), 5);
        assert_eq!(team.inactivity_baseline(), 7);

        assert!(Team::new("   ", 1000, 1).is_err());
    }

    #[test]
    fn test_team_profile() {
        let mut team = Team::new("Spikers", 1000, 1).unwrap();
        assert_eq!(team.hexcolor, DEFAULT_HEXCOLOR);
        assert!(team.provisional);

        team.apply_profile(TeamProfile {
            roster: Some(vec![" Ana ".to_string(), "".to_string(), "Bo".to_string()]),
            hexcolor: Some("#1A2B3C".to_string()),
            ..TeamProfile::default()
        })
        .unwrap();
        assert_eq!(team.roster, vec!["Ana", "Bo"]);
        assert_eq!(team.hexcolor, "#1a2b3c");
        assert_eq!(team.logo, "");

        let before = team.clone();
        let err = team
            .apply_profile(TeamProfile {
                roster: Some(Vec::new()),
                hexcolor: Some("blue".to_string()),
                ..TeamProfile::default()
            })
            .unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::InvalidInput);
        assert_eq!(team, before);
    }

    #[test]
    fn test_team_metadata_defaults_for_older_documents() {
        let mut value = serde_json::to_value(Team::new("Spikers", 1000, 1).unwrap()).unwrap();
        let object = value.as_object_mut().unwrap();
        for field in ["provisional", "roster", "logo", "hexcolor"] {
            object.remove(field);
        }

        let team: Team = serde_json::from_value(value).unwrap();
        assert!(team.provisional);
        assert!(team.roster.is_empty());
        assert_eq!(team.hexcolor, DEFAULT_HEXCOLOR);
    }

    #[test]
    fn test_match_rejects_self_pairing() {
        let err = Match::scheduled("A", "A", 1, MatchType::Regular).unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_match_completion_is_one_way() {
        let mut m = Match::scheduled("A", "B", 1, MatchType::Regular).unwrap();
        let score = GameScore::new(3, 0).unwrap();
        let points = PointTotals { a: 75, b: 50 };
        m.complete(score, points, Utc::now()).unwrap();
        assert!(m.completed);

        let err = m
            .complete(GameScore::new(0, 3).unwrap(), PointTotals { a: 1, b: 2 }, Utc::now())
            .unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::InvalidState);
        assert_eq!(m.score, Some(score));
        assert_eq!(m.points, Some(points));
    }
}
