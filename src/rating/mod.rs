//! MMR rating engine
//!
//! This module provides the rating calculator interface and the
//! margin-adjusted Elo implementation used by the ladder.

pub mod calculator;
pub mod elo;

// Re-export commonly used types
pub use calculator::{MatchResultInput, RatingCalculator, RatingOutcome, SideDelta, SideInput};
pub use elo::{apply_inactivity, apply_result, EloMmrCalculator};
