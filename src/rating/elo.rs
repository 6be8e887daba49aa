//! Margin-adjusted Elo rating engine
//!
//! Each match moves both ratings by the classic Elo delta, then the winner
//! collects a fixed bonus for the score line and a small bonus for the point
//! differential. Challenge matches scale the whole change down.

use crate::config::RatingConfig;
use crate::error::{LadderError, Result};
use crate::rating::calculator::{
    MatchResultInput, RatingCalculator, RatingOutcome, SideDelta, SideInput,
};
use crate::types::{GameScore, MatchType, Rating, Side};
use skillratings::elo::{expected_score, EloRating};
use tracing::debug;

/// Rate a single finished match.
///
/// Fails with `InvalidInput` when the games do not form a completed best-of-5
/// result, when either rating is non-finite, when both sides name the same
/// team or when `k_factor` is not a positive finite number.
pub fn apply_result(
    input: &MatchResultInput,
    k_factor: f64,
    config: &RatingConfig,
) -> Result<RatingOutcome> {
    let (a, b) = (&input.side_a, &input.side_b);

    if a.team == b.team {
        return Err(LadderError::invalid_input(format!(
            "Both sides of the match are '{}'",
            a.team
        ))
        .into());
    }
    if !a.rating.is_finite() || !b.rating.is_finite() {
        return Err(LadderError::invalid_input(format!(
            "Ratings must be finite (got {} and {})",
            a.rating, b.rating
        ))
        .into());
    }
    if !k_factor.is_finite() || k_factor <= 0.0 {
        return Err(LadderError::invalid_input(format!(
            "K-factor must be positive and finite (got {})",
            k_factor
        ))
        .into());
    }
    let score = GameScore::new(a.games_won, b.games_won)?;

    let (expected_a, expected_b) = expected_score(
        &EloRating { rating: a.rating },
        &EloRating { rating: b.rating },
    );

    let multiplier = match input.match_type {
        MatchType::Regular => 1.0,
        MatchType::Challenge => config.challenge_multiplier,
    };

    let winner = score.winner();
    let (winner_games, loser_games) = score.winner_line();
    let margin_bonus = config.margin_bonus.lookup(winner_games, loser_games);

    let side_a = side_delta(
        a,
        b,
        expected_a,
        winner == Side::A,
        k_factor,
        margin_bonus,
        multiplier,
        config,
    );
    let side_b = side_delta(
        b,
        a,
        expected_b,
        winner == Side::B,
        k_factor,
        margin_bonus,
        multiplier,
        config,
    );

    debug!(
        "Rated {} {} {}: {} {:+.2} -> {}, {} {:+.2} -> {}",
        a.team,
        score,
        b.team,
        a.team,
        side_a.total_delta,
        side_a.new_rating,
        b.team,
        side_b.total_delta,
        side_b.new_rating
    );

    Ok(RatingOutcome {
        winner,
        side_a,
        side_b,
    })
}

#[allow(clippy::too_many_arguments)]
fn side_delta(
    side: &SideInput,
    opponent: &SideInput,
    expected: f64,
    won: bool,
    k_factor: f64,
    margin_bonus: f64,
    multiplier: f64,
    config: &RatingConfig,
) -> SideDelta {
    let effective_k = if side.is_placement {
        k_factor * config.placement_k_multiplier
    } else {
        k_factor
    };
    let actual = if won { 1.0 } else { 0.0 };
    let base_delta = effective_k * (actual - expected);

    // Bonuses belong to the winner only, and are never scaled by K.
    let (margin_bonus, point_bonus) = if won {
        let differential = side.points as f64 - opponent.points as f64;
        (margin_bonus, differential * config.point_diff_multiplier)
    } else {
        (0.0, 0.0)
    };

    let total_delta = (base_delta + margin_bonus + point_bonus) * multiplier;
    // The change is rounded on its own, half away from zero.
    let new_rating = side.rating.round() as Rating + total_delta.round() as Rating;

    SideDelta {
        expected_score: expected,
        effective_k,
        base_delta,
        margin_bonus,
        point_bonus,
        multiplier,
        total_delta,
        old_rating: side.rating,
        new_rating,
    }
}

/// Flat inactivity decay: `penalty_per_week` for every inactive week, no floor
pub fn apply_inactivity(rating: Rating, weeks_inactive: u32, penalty_per_week: Rating) -> Rating {
    rating.saturating_sub(penalty_per_week.saturating_mul(weeks_inactive as Rating))
}

/// [`RatingCalculator`] backed by [`apply_result`] and a fixed configuration
#[derive(Debug, Clone)]
pub struct EloMmrCalculator {
    config: RatingConfig,
}

impl EloMmrCalculator {
    /// Create a new calculator, rejecting invalid parameters
    pub fn new(config: RatingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Default for EloMmrCalculator {
    fn default() -> Self {
        Self {
            config: RatingConfig::default(),
        }
    }
}

impl RatingCalculator for EloMmrCalculator {
    fn apply_result(&self, input: &MatchResultInput) -> Result<RatingOutcome> {
        apply_result(input, self.config.k_factor, &self.config)
    }

    fn apply_inactivity(&self, rating: Rating, weeks_inactive: u32) -> Rating {
        apply_inactivity(rating, weeks_inactive, self.config.inactivity_penalty)
    }

    fn initial_rating(&self) -> Rating {
        self.config.initial_rating
    }

    fn placement_matches(&self) -> u32 {
        self.config.placement_matches
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "margin_elo",
            "settings": self.config,
        })
    }
}
