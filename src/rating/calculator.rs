//! Rating calculator trait and the data it exchanges
//!
//! The ladder store decides placement and match type from its own records and
//! hands them to a [`RatingCalculator`]; the calculator itself never looks at
//! history.

use crate::error::Result;
use crate::types::{MatchType, Rating, Side, TeamName};
use serde::{Deserialize, Serialize};

/// One side of a finished match as seen by the rating engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideInput {
    pub team: TeamName,
    pub rating: f64,
    pub games_won: u8,
    pub points: u32,
    /// The team is still inside its placement window
    pub is_placement: bool,
}

/// Everything needed to rate one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResultInput {
    pub side_a: SideInput,
    pub side_b: SideInput,
    pub match_type: MatchType,
}

/// Breakdown of one side's rating change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideDelta {
    pub expected_score: f64,
    pub effective_k: f64,
    pub base_delta: f64,
    pub margin_bonus: f64,
    pub point_bonus: f64,
    /// Match-type multiplier applied to the sum of the above
    pub multiplier: f64,
    /// Unrounded change
    pub total_delta: f64,
    pub old_rating: f64,
    pub new_rating: Rating,
}

impl SideDelta {
    /// Change actually applied after rounding
    pub fn applied_delta(&self) -> Rating {
        self.new_rating - self.old_rating.round() as Rating
    }
}

/// Result of a rating calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingOutcome {
    pub winner: Side,
    pub side_a: SideDelta,
    pub side_b: SideDelta,
}

impl RatingOutcome {
    pub fn new_ratings(&self) -> (Rating, Rating) {
        (self.side_a.new_rating, self.side_b.new_rating)
    }
}

/// Trait for calculating rating changes after matches
#[cfg_attr(test, mockall::automock)]
pub trait RatingCalculator: Send + Sync {
    /// Rate a finished best-of-5 match. Pure: nothing is persisted.
    fn apply_result(&self, input: &MatchResultInput) -> Result<RatingOutcome>;

    /// Rating after `weeks_inactive` weeks of inactivity penalties
    fn apply_inactivity(&self, rating: Rating, weeks_inactive: u32) -> Rating;

    /// Get the initial rating for new teams
    fn initial_rating(&self) -> Rating;

    /// Number of leading matches that count as placement
    fn placement_matches(&self) -> u32;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;
}
