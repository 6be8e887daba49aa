//! Rating system configuration

use crate::error::{LadderError, Result};
use crate::types::Rating;
use serde::{Deserialize, Serialize};

/// Fixed bonus added to the winner's delta, keyed by the exact score line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginBonus {
    pub three_nil: f64,
    pub three_one: f64,
    pub three_two: f64,
}

impl Default for MarginBonus {
    fn default() -> Self {
        Self {
            three_nil: 5.0,
            three_one: 3.0,
            three_two: 1.0,
        }
    }
}

impl MarginBonus {
    /// Bonus for a `(winner_games, loser_games)` line; lines outside the table earn nothing
    pub fn lookup(&self, winner_games: u8, loser_games: u8) -> f64 {
        match (winner_games, loser_games) {
            (3, 0) => self.three_nil,
            (3, 1) => self.three_one,
            (3, 2) => self.three_two,
            _ => 0.0,
        }
    }
}

/// MMR engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Rating given to newly registered teams
    pub initial_rating: Rating,
    /// Number of leading matches that count as placement matches
    pub placement_matches: u32,
    pub k_factor: f64,
    /// K multiplier for a side still in placement
    pub placement_k_multiplier: f64,
    /// Scale applied to the whole delta of a challenge match
    pub challenge_multiplier: f64,
    /// Rating lost per inactive week
    pub inactivity_penalty: Rating,
    pub margin_bonus: MarginBonus,
    /// Winner bonus per point of point differential
    pub point_diff_multiplier: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial_rating: 1000,
            placement_matches: 3,
            k_factor: 20.0,
            placement_k_multiplier: 2.0,
            challenge_multiplier: 0.5,
            inactivity_penalty: 10,
            margin_bonus: MarginBonus::default(),
            point_diff_multiplier: 0.1,
        }
    }
}

impl RatingConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("k_factor", self.k_factor),
            ("placement_k_multiplier", self.placement_k_multiplier),
            ("challenge_multiplier", self.challenge_multiplier),
            ("point_diff_multiplier", self.point_diff_multiplier),
            ("margin_bonus.three_nil", self.margin_bonus.three_nil),
            ("margin_bonus.three_one", self.margin_bonus.three_one),
            ("margin_bonus.three_two", self.margin_bonus.three_two),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, value)| !value.is_finite()) {
            return Err(LadderError::Configuration {
                message: format!("{} must be a finite number", name),
            }
            .into());
        }

        if self.k_factor <= 0.0 {
            return Err(LadderError::Configuration {
                message: "K-factor must be positive".to_string(),
            }
            .into());
        }

        if self.placement_k_multiplier <= 0.0 {
            return Err(LadderError::Configuration {
                message: "Placement K multiplier must be positive".to_string(),
            }
            .into());
        }

        if self.challenge_multiplier < 0.0 {
            return Err(LadderError::Configuration {
                message: "Challenge multiplier must be non-negative".to_string(),
            }
            .into());
        }

        if self.inactivity_penalty < 0 {
            return Err(LadderError::Configuration {
                message: "Inactivity penalty must be non-negative".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
