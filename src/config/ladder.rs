//! Ladder bookkeeping configuration

use crate::error::{LadderError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    /// Weeks without a completed match before a sweep marks a team inactive
    pub inactive_after_weeks: u32,
    /// Accept results for matches involving an inactive team
    pub allow_inactive_results: bool,
    /// Matches per team when generation is requested without a count
    pub default_matches_per_team: u32,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            inactive_after_weeks: 4,
            allow_inactive_results: false,
            default_matches_per_team: 1,
        }
    }
}

impl LadderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.inactive_after_weeks == 0 {
            return Err(LadderError::Configuration {
                message: "Inactive-after weeks must be greater than 0".to_string(),
            }
            .into());
        }
        if self.default_matches_per_team == 0 {
            return Err(LadderError::Configuration {
                message: "Matches per team must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
