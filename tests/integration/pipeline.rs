//! End-to-end runs of `compute_recommendations` over small slates.

use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};

use underdog::config::StakingConfig;
use underdog::engine::{compute_recommendations, screen_slate};
use underdog::llm::{attach_reasoning, classify_all, tiers, FixedTierClassifier};
use underdog::strategy::StrategyPipeline;
use underdog::types::{
    BetType, Candidate, CandidateId, ConfidenceTier, EnrichmentSignals, NoBetReason, Price,
    QualityNote, Side,
};

use crate::{by_game, game, moneyline_quote, spread_quote};

fn high(game_id: &str) -> (CandidateId, ConfidenceTier) {
    (CandidateId::new(game_id, Side::Away), ConfidenceTier::High)
}

#[test]
fn test_high_confidence_plus_200_stakes_thirty_dollars() {
    let games = vec![game("g1", 0, ("Boston Celtics", "BOS"), ("Charlotte Hornets", "CHA"))];
    let odds = by_game(vec![moneyline_quote("g1", -250, 200)]);
    let conf = BTreeMap::from([high("g1")]);

    let batch =
        compute_recommendations(&games, &odds, &HashMap::new(), &conf, &StakingConfig::default())
            .unwrap();

    assert_eq!(batch.recommendations.len(), 1);
    let rec = &batch.recommendations[0];
    assert_eq!(rec.bet_type, BetType::Moneyline);
    assert_eq!(rec.underdog_team, "Charlotte Hornets");
    assert!(rec.actionable);
    assert_eq!(rec.stake_amount, dec!(30.00));
    assert_eq!(rec.expected_value, dec!(7.20));
    assert_eq!(rec.stake_description, "3.00% ($30.00)");
    assert!(rec.signals.notes.contains(&QualityNote::MissingInjuryReport));
}

#[test]
fn test_low_confidence_is_reported_as_pass() {
    let games = vec![game("g1", 0, ("Boston Celtics", "BOS"), ("Charlotte Hornets", "CHA"))];
    let odds = by_game(vec![moneyline_quote("g1", -250, 200)]);
    let conf = BTreeMap::from([(CandidateId::new("g1", Side::Away), ConfidenceTier::Low)]);

    let batch =
        compute_recommendations(&games, &odds, &HashMap::new(), &conf, &StakingConfig::default())
            .unwrap();

    let rec = &batch.recommendations[0];
    assert!(!rec.actionable);
    assert_eq!(rec.no_bet_reason, Some(NoBetReason::NonPositiveKelly));
    assert_eq!(rec.stake_amount, dec!(0));
    assert_eq!(rec.stake_description, "PASS (no edge)");
    assert_eq!(batch.actionable().count(), 0);
}

#[test]
fn test_heavy_price_is_capped_at_max_stake() {
    let candidate = Candidate {
        id: CandidateId::new("g1", Side::Away),
        game_id: "g1".into(),
        tipoff: crate::tipoff(0),
        matchup: "CHA @ BOS".into(),
        underdog: Side::Away,
        underdog_team: "Charlotte Hornets".into(),
        favorite_team: "Boston Celtics".into(),
        bet_type: BetType::Moneyline,
        line: -2000.0,
        price: Price::Decimal(1.05),
        opposing_price: None,
    };
    let pipeline = StrategyPipeline::from_config(&StakingConfig::default());
    let rec = pipeline
        .recommend(&candidate, EnrichmentSignals::default(), ConfidenceTier::High)
        .unwrap();

    assert!(rec.actionable);
    assert_eq!(rec.win_probability, 0.99);
    assert_eq!(rec.stake_fraction, 0.05);
    assert_eq!(rec.stake_amount, dec!(50.00));
    assert!((rec.expected_value - dec!(1.98)).abs() <= dec!(0.01));
}

#[test]
fn test_low_long_shot_never_staked_without_minimum() {
    let games = vec![game("g1", 0, ("Boston Celtics", "BOS"), ("Charlotte Hornets", "CHA"))];
    let odds = by_game(vec![moneyline_quote("g1", -100000, 19900)]);
    let conf = BTreeMap::from([(CandidateId::new("g1", Side::Away), ConfidenceTier::Low)]);
    let cfg = StakingConfig {
        min_bet_pct: 0.0,
        moneyline_range: (150.0, 20000.0),
        ..StakingConfig::default()
    };

    let batch = compute_recommendations(&games, &odds, &HashMap::new(), &conf, &cfg).unwrap();

    let rec = &batch.recommendations[0];
    assert!(rec.implied_probability < cfg.probability_floor);
    assert!(rec.win_probability <= rec.implied_probability);
    assert!(!rec.actionable);
    assert_eq!(rec.stake_amount, dec!(0));
}

#[test]
fn test_spread_candidate_preferred_over_moneyline() {
    let games = vec![game("g1", 0, ("Denver Nuggets", "DEN"), ("Utah Jazz", "UTA"))];
    let mut quote = spread_quote("g1", 5.5);
    quote.home.moneyline = Some(Price::American(-240));
    quote.away.moneyline = Some(Price::American(200));
    let odds = by_game(vec![quote]);
    let conf = BTreeMap::from([(CandidateId::new("g1", Side::Away), ConfidenceTier::Medium)]);

    let batch =
        compute_recommendations(&games, &odds, &HashMap::new(), &conf, &StakingConfig::default())
            .unwrap();

    let rec = &batch.recommendations[0];
    assert_eq!(rec.bet_type, BetType::Spread);
    assert_eq!(rec.line, 5.5);
    assert!(rec.actionable);
}

#[test]
fn test_bad_game_does_not_affect_others() {
    let games = vec![
        game("g1", 0, ("Boston Celtics", "BOS"), ("Charlotte Hornets", "CHA")),
        game("g2", 1, ("Denver Nuggets", "DEN"), ("Utah Jazz", "UTA")),
        game("g3", 2, ("Miami Heat", "MIA"), ("Detroit Pistons", "DET")),
    ];
    let odds = by_game(vec![
        moneyline_quote("g1", -250, 200),
        // +50 is not a valid American price
        moneyline_quote("g2", -250, 50),
    ]);
    let conf = BTreeMap::from([high("g1"), high("g2")]);

    let batch =
        compute_recommendations(&games, &odds, &HashMap::new(), &conf, &StakingConfig::default())
            .unwrap();

    assert_eq!(batch.recommendations.len(), 1);
    assert_eq!(batch.recommendations[0].game_id, "g1");
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].game_id, "g2");
}

#[test]
fn test_repeated_runs_are_identical() {
    let games = vec![
        game("g1", 0, ("Boston Celtics", "BOS"), ("Charlotte Hornets", "CHA")),
        game("g2", 1, ("Denver Nuggets", "DEN"), ("Utah Jazz", "UTA")),
        game("g3", 2, ("Miami Heat", "MIA"), ("Detroit Pistons", "DET")),
    ];
    let odds = by_game(vec![
        moneyline_quote("g1", -250, 200),
        spread_quote("g2", 6.5),
        moneyline_quote("g3", -180, 160),
    ]);
    let conf = BTreeMap::from([high("g1"), high("g3")]);
    let cfg = StakingConfig::default();

    let first = compute_recommendations(&games, &odds, &HashMap::new(), &conf, &cfg).unwrap();
    let mut reversed = games.clone();
    reversed.reverse();
    let second = compute_recommendations(&reversed, &odds, &HashMap::new(), &conf, &cfg).unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    // HIGH picks first, then the LOW pass
    assert_eq!(first.recommendations[2].game_id, "g2");
    assert_eq!(first.recommendations[2].confidence, ConfidenceTier::Low);
}

#[tokio::test]
async fn test_screen_classify_then_recommend() {
    let games = vec![
        game("g1", 0, ("Boston Celtics", "BOS"), ("Charlotte Hornets", "CHA")),
        game("g2", 1, ("Denver Nuggets", "DEN"), ("Utah Jazz", "UTA")),
    ];
    let odds = by_game(vec![moneyline_quote("g1", -250, 200), spread_quote("g2", 4.5)]);
    let cfg = StakingConfig::default();

    let screening = screen_slate(&games, &odds, &HashMap::new(), &cfg).unwrap();
    assert_eq!(screening.candidates.len(), 2);

    let classifier = FixedTierClassifier::new(ConfidenceTier::Medium)
        .with_overrides(BTreeMap::from([high("g2")]));
    let classifications = classify_all(&classifier, &screening.candidates, 2).await;

    let mut batch =
        compute_recommendations(&games, &odds, &HashMap::new(), &tiers(&classifications), &cfg)
            .unwrap();
    attach_reasoning(&mut batch, &classifications);
    assert_eq!(batch.recommendations[0].game_id, "g2");
    assert_eq!(batch.recommendations[0].confidence, ConfidenceTier::High);
    assert_eq!(batch.recommendations[1].confidence, ConfidenceTier::Medium);
    assert!(batch
        .recommendations
        .iter()
        .all(|r| !r.signals.notes.contains(&QualityNote::MissingConfidence)));
    // a fixed tier carries no reasoning
    assert!(batch.recommendations.iter().all(|r| r.reasoning.is_none()));
}

#[test]
fn test_invalid_config_rejected() {
    let cfg = StakingConfig {
        kelly_fraction: 0.0,
        ..StakingConfig::default()
    };
    assert!(compute_recommendations(&[], &HashMap::new(), &HashMap::new(), &BTreeMap::new(), &cfg)
        .is_err());
}
