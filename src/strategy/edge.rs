//! Edge estimation.
//!
//! Turns a qualitative confidence tier into a numeric win-probability
//! estimate: market-implied probability of the underdog's price plus the
//! tier's assumed edge, clamped strictly inside (0, 1). The floor never
//! lifts an estimate above the market-implied probability.

use tracing::debug;

use crate::config::StakingConfig;
use crate::types::{Candidate, ConfidenceTier, UnderdogError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EdgeConfig {
    /// Remove the bookmaker margin when the favorite's price is known.
    pub devig: bool,
    pub probability_floor: f64,
    pub probability_ceiling: f64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            devig: false,
            probability_floor: 0.01,
            probability_ceiling: 0.99,
        }
    }
}

impl From<&StakingConfig> for EdgeConfig {
    fn from(config: &StakingConfig) -> Self {
        Self {
            devig: config.devig,
            probability_floor: config.probability_floor,
            probability_ceiling: config.probability_ceiling,
        }
    }
}

// ---------------------------------------------------------------------------
// Estimate
// ---------------------------------------------------------------------------

/// Numeric view of a candidate's price under a given confidence tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeEstimate {
    pub tier: ConfidenceTier,
    pub edge: f64,
    pub decimal_odds: f64,
    pub implied_probability: f64,
    pub win_probability: f64,
    pub devigged: bool,
}

pub struct EdgeEstimator {
    config: EdgeConfig,
}

impl EdgeEstimator {
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }

    /// Estimate the underdog's win probability for a candidate.
    ///
    /// Fails only on a malformed underdog price. A malformed favorite price
    /// just disables de-vig for this candidate.
    pub fn estimate(
        &self,
        candidate: &Candidate,
        tier: ConfidenceTier,
    ) -> Result<EdgeEstimate, UnderdogError> {
        let decimal_odds = candidate.price.to_decimal()?;
        let raw_implied = 1.0 / decimal_odds;

        let fair = if self.config.devig {
            candidate
                .opposing_price
                .and_then(|p| p.to_decimal().ok())
                .map(|fav_odds| devig(decimal_odds, fav_odds))
        } else {
            None
        };

        // Never let de-vig push the implied probability above the raw price,
        // so a zero-edge tier stays at or below break-even.
        let (implied_probability, devigged) = match fair {
            Some(p) => (p.min(raw_implied), true),
            None => (raw_implied, false),
        };

        let edge = tier.edge();
        let floor = self.config.probability_floor.min(implied_probability);
        let win_probability = (implied_probability + edge)
            .min(self.config.probability_ceiling)
            .max(floor);

        if !(win_probability > 0.0 && win_probability < 1.0) {
            return Err(UnderdogError::InvalidProbability(format!(
                "estimate for {} fell outside (0, 1): {win_probability}",
                candidate.id
            )));
        }

        debug!(
            candidate = %candidate.id,
            tier = %tier,
            implied = format!("{:.2}%", implied_probability * 100.0),
            estimated = format!("{:.2}%", win_probability * 100.0),
            devigged,
            "Edge estimated"
        );

        Ok(EdgeEstimate {
            tier,
            edge,
            decimal_odds,
            implied_probability,
            win_probability,
            devigged,
        })
    }
}

/// Proportional de-vig of a two-way market.
fn devig(dog_odds: f64, fav_odds: f64) -> f64 {
    let dog = 1.0 / dog_odds;
    let fav = 1.0 / fav_odds;
    dog / (dog + fav)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
