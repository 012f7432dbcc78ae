//! Kelly criterion stake sizing.
//!
//! Fractional Kelly with a configurable multiplier, a minimum stake below
//! which the pick is passed, and a hard cap. Works purely in bankroll
//! fractions; dollar amounts are applied by the assembler.

use tracing::debug;

use crate::config::StakingConfig;
use crate::types::{NoBetReason, UnderdogError};

/// Full-Kelly values within this distance of zero count as zero, so
/// floating-point residue on a break-even price never becomes a stake.
const KELLY_EPSILON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Kelly sizing configuration.
#[derive(Debug, Clone)]
pub struct KellyConfig {
    /// Fractional Kelly multiplier (0.25 = quarter-Kelly).
    pub multiplier: f64,
    /// Maximum stake as a fraction of bankroll.
    pub max_bet_pct: f64,
    /// Minimum stake as a fraction of bankroll (below this, no bet).
    pub min_bet_pct: f64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            multiplier: 0.25,
            max_bet_pct: 0.05,
            min_bet_pct: 0.005,
        }
    }
}

impl From<&StakingConfig> for KellyConfig {
    fn from(config: &StakingConfig) -> Self {
        Self {
            multiplier: config.kelly_fraction,
            max_bet_pct: config.max_bet_pct,
            min_bet_pct: config.min_bet_pct,
        }
    }
}

// ---------------------------------------------------------------------------
// Kelly sizer
// ---------------------------------------------------------------------------

/// Outcome of sizing one pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakeDecision {
    /// Full Kelly fraction f* (may be negative).
    pub full_kelly: f64,
    /// f* times the multiplier, before the floor and cap.
    pub raw_fraction: f64,
    /// Emitted fraction: 0, the cap, or a value in [min, max).
    pub fraction: f64,
    pub capped: bool,
    pub no_bet: Option<NoBetReason>,
}

impl StakeDecision {
    pub fn is_bet(&self) -> bool {
        self.no_bet.is_none()
    }

    fn pass(full_kelly: f64, raw_fraction: f64, reason: NoBetReason) -> Self {
        Self {
            full_kelly,
            raw_fraction,
            fraction: 0.0,
            capped: false,
            no_bet: Some(reason),
        }
    }
}

pub struct KellySizer {
    config: KellyConfig,
}

impl KellySizer {
    pub fn new(config: KellyConfig) -> Self {
        Self { config }
    }

    /// Size a stake from decimal odds and an estimated win probability.
    ///
    /// Kelly formula: f* = (bp - q) / b
    /// where:
    ///   b = decimal odds - 1 (net odds)
    ///   p = estimated win probability
    ///   q = 1 - p
    pub fn size(&self, decimal_odds: f64, win_prob: f64) -> Result<StakeDecision, UnderdogError> {
        if !(win_prob.is_finite() && win_prob > 0.0 && win_prob < 1.0) {
            return Err(UnderdogError::InvalidProbability(format!(
                "win probability must be in (0, 1), got {win_prob}"
            )));
        }
        if !(decimal_odds.is_finite() && decimal_odds >= 1.0) {
            return Err(UnderdogError::InvalidOdds(format!(
                "decimal odds must be >= 1.0, got {decimal_odds}"
            )));
        }

        let b = decimal_odds - 1.0;
        if b <= 0.0 {
            debug!(decimal_odds, "Zero net odds, no bet");
            return Ok(StakeDecision::pass(0.0, 0.0, NoBetReason::EvenMoney));
        }

        let p = win_prob;
        let q = 1.0 - p;
        let kelly = (b * p - q) / b;

        if kelly <= KELLY_EPSILON {
            debug!(kelly, "Non-positive Kelly, no bet");
            return Ok(StakeDecision::pass(kelly, 0.0, NoBetReason::NonPositiveKelly));
        }

        let raw = kelly * self.config.multiplier;

        if raw < self.config.min_bet_pct {
            debug!(
                raw = format!("{:.3}%", raw * 100.0),
                min = format!("{:.3}%", self.config.min_bet_pct * 100.0),
                "Stake below minimum, no bet"
            );
            return Ok(StakeDecision::pass(kelly, raw, NoBetReason::BelowMinimum));
        }

        let capped = raw > self.config.max_bet_pct;
        let fraction = if capped { self.config.max_bet_pct } else { raw };

        debug!(
            full_kelly = format!("{:.2}%", kelly * 100.0),
            fraction = format!("{:.2}%", fraction * 100.0),
            capped,
            "Stake sized"
        );

        Ok(StakeDecision {
            full_kelly: kelly,
            raw_fraction: raw,
            fraction,
            capped,
            no_bet: None,
        })
    }
}

/// Expected value of staking `amount` at `decimal_odds` with win
/// probability `win_prob`: p * b * amount - q * amount.
pub fn expected_value(win_prob: f64, decimal_odds: f64, amount: f64) -> f64 {
    let b = decimal_odds - 1.0;
    win_prob * b * amount - (1.0 - win_prob) * amount
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
