//! Strategy engine: edge estimation, Kelly sizing, and recommendation assembly.

pub mod edge;
pub mod kelly;

use rust_decimal::prelude::*;
use std::cmp::Ordering;
use tracing::debug;

use crate::config::StakingConfig;
use crate::types::{
    Candidate, ConfidenceTier, EnrichmentSignals, NoBetReason, Recommendation, UnderdogError,
};
use edge::{EdgeConfig, EdgeEstimate, EdgeEstimator};
use kelly::{expected_value, KellyConfig, KellySizer, StakeDecision};

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Builds the terminal `Recommendation` for a candidate. The only component
/// that knows the bankroll.
#[derive(Debug, Clone)]
pub struct RecommendationAssembler {
    bankroll: Decimal,
}

impl RecommendationAssembler {
    pub fn new(bankroll: Decimal) -> Self {
        Self { bankroll }
    }

    /// Combine a candidate, its signals, the edge estimate and the stake
    /// decision into one recommendation.
    pub fn assemble(
        &self,
        candidate: &Candidate,
        signals: EnrichmentSignals,
        estimate: &EdgeEstimate,
        stake: &StakeDecision,
    ) -> Recommendation {
        let mut stake = *stake;
        let mut stake_amount = self.stake_amount(stake.fraction);
        if stake.is_bet() && stake_amount.is_zero() {
            debug!(
                candidate = %candidate.id,
                fraction = stake.fraction,
                "Stake rounds to zero cents, no bet"
            );
            stake.fraction = 0.0;
            stake.capped = false;
            stake.no_bet = Some(NoBetReason::BelowMinimum);
            stake_amount = Decimal::ZERO;
        }
        let ev = expected_value(
            estimate.win_probability,
            estimate.decimal_odds,
            stake_amount.to_f64().unwrap_or(0.0),
        );
        let expected_value = Decimal::from_f64_retain(ev)
            .unwrap_or(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        let stake_description = match stake.no_bet {
            Some(reason) => format!("PASS ({reason})"),
            None => format!("{:.2}% (${:.2})", stake.fraction * 100.0, stake_amount),
        };

        Recommendation {
            candidate_id: candidate.id.clone(),
            game_id: candidate.game_id.clone(),
            tipoff: candidate.tipoff,
            matchup: candidate.matchup.clone(),
            underdog: candidate.underdog,
            underdog_team: candidate.underdog_team.clone(),
            favorite_team: candidate.favorite_team.clone(),
            bet_type: candidate.bet_type,
            line: candidate.line,
            price: candidate.price,
            decimal_odds: estimate.decimal_odds,
            confidence: estimate.tier,
            edge: estimate.edge,
            implied_probability: estimate.implied_probability,
            win_probability: estimate.win_probability,
            devigged: estimate.devigged,
            full_kelly: stake.full_kelly,
            stake_fraction: stake.fraction,
            stake_amount,
            expected_value,
            actionable: stake.is_bet(),
            no_bet_reason: stake.no_bet,
            stake_description,
            signals,
            reasoning: None,
        }
    }

    /// Bankroll times fraction, rounded to cents.
    pub fn stake_amount(&self, fraction: f64) -> Decimal {
        if fraction <= 0.0 {
            return Decimal::ZERO;
        }
        let fraction = Decimal::from_f64_retain(fraction).unwrap_or(Decimal::ZERO);
        (self.bankroll * fraction).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Order recommendations: confidence tier descending, expected value
    /// descending, tip-off ascending, then game id and candidate id.
    pub fn rank(recommendations: &mut [Recommendation]) {
        recommendations.sort_by(compare_recommendations);
    }
}

fn compare_recommendations(a: &Recommendation, b: &Recommendation) -> Ordering {
    b.confidence
        .cmp(&a.confidence)
        .then_with(|| b.expected_value.cmp(&a.expected_value))
        .then_with(|| a.tipoff.cmp(&b.tipoff))
        .then_with(|| a.game_id.cmp(&b.game_id))
        .then_with(|| a.candidate_id.cmp(&b.candidate_id))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Edge estimation, Kelly sizing and assembly for a single candidate.
///
/// Holds no per-run state, so one instance can be shared across threads.
pub struct StrategyPipeline {
    estimator: EdgeEstimator,
    sizer: KellySizer,
    assembler: RecommendationAssembler,
}

impl StrategyPipeline {
    pub fn new(
        estimator: EdgeEstimator,
        sizer: KellySizer,
        assembler: RecommendationAssembler,
    ) -> Self {
        Self {
            estimator,
            sizer,
            assembler,
        }
    }

    pub fn from_config(config: &StakingConfig) -> Self {
        Self::new(
            EdgeEstimator::new(EdgeConfig::from(config)),
            KellySizer::new(KellyConfig::from(config)),
            RecommendationAssembler::new(config.bankroll),
        )
    }

    /// Estimate, size and assemble one candidate.
    pub fn recommend(
        &self,
        candidate: &Candidate,
        signals: EnrichmentSignals,
        tier: ConfidenceTier,
    ) -> Result<Recommendation, UnderdogError> {
        let estimate = self.estimator.estimate(candidate, tier)?;
        let stake = self.sizer.size(estimate.decimal_odds, estimate.win_probability)?;
        let rec = self.assembler.assemble(candidate, signals, &estimate, &stake);

        debug!(
            candidate = %rec.candidate_id,
            tier = %rec.confidence,
            stake = %rec.stake_description,
            ev = %rec.expected_value,
            "Recommendation assembled"
        );

        Ok(rec)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
