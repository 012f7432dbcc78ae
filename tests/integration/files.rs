//! Slate in, CSV and JSON history out, through the storage and export layers.

use std::path::PathBuf;

use chrono::FixedOffset;
use rust_decimal_macros::dec;
use underdog::config::{AppConfig, StakingConfig};
use underdog::engine::compute_recommendations;
use underdog::export::{render_table, write_csv};
use underdog::storage::{load_batch, load_confidences, load_slate, save_batch};
use underdog::types::{CandidateId, ConfidenceTier, QualityNote, Side};

const SLATE: &str = r#"{
    "games": [
        {
            "id": "0022400555",
            "tipoff": "2025-01-15T00:30:00Z",
            "home": { "name": "Boston Celtics", "abbreviation": "BOS", "last_played": "2025-01-13" },
            "away": { "name": "Charlotte Hornets", "abbreviation": "CHA", "rest_days": 2 }
        },
        {
            "id": "0022400556",
            "tipoff": "2025-01-15T03:00:00Z",
            "home": { "name": "Denver Nuggets", "abbreviation": "DEN", "rest_days": 1 },
            "away": { "name": "Utah Jazz", "abbreviation": "UTA", "rest_days": 1 }
        }
    ],
    "odds": [
        {
            "game_id": "0022400555",
            "bookmaker": "draftkings",
            "home": { "moneyline": { "american": -250 } },
            "away": { "moneyline": { "american": 200 } },
            "timestamp": "2025-01-14T18:00:00Z"
        },
        {
            "game_id": "0022400556",
            "bookmaker": "draftkings",
            "home": { "spread": { "points": -6.5, "price": { "american": -110 } } },
            "away": { "spread": { "points": 6.5, "price": { "american": -110 } } },
            "timestamp": "2025-01-14T18:00:00Z"
        }
    ],
    "injuries": [
        {
            "game_id": "0022400555",
            "home": { "players": { "Jayson Tatum": { "tier": "out" } } }
        }
    ]
}"#;

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("underdog_it_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_slate_file_to_outputs() {
    let dir = scratch_dir();
    let slate_path = dir.join("slate.json");
    let conf_path = dir.join("confidence.json");
    std::fs::write(&slate_path, SLATE).unwrap();
    std::fs::write(&conf_path, r#"{ "0022400555:away": "high" }"#).unwrap();

    let slate = load_slate(&slate_path).unwrap();
    let conf = load_confidences(&conf_path).unwrap();
    let cfg = StakingConfig::default();
    let batch = compute_recommendations(
        &slate.games,
        &slate.odds_by_game(),
        &slate.injuries_by_game(),
        &conf,
        &cfg,
    )
    .unwrap();

    assert_eq!(batch.recommendations.len(), 2);
    let top = &batch.recommendations[0];
    assert_eq!(top.candidate_id, CandidateId::new("0022400555", Side::Away));
    assert_eq!(top.stake_amount, dec!(30.00));
    // Favorite played the night before tip-off (Eastern calendar)
    assert!(top.signals.favorite_back_to_back);
    assert!(top.signals.favorite_injury_impact > 0.0);
    assert!(!top
        .signals
        .notes
        .iter()
        .any(|n| matches!(n, QualityNote::MissingInjuryReport)));

    let csv_path = dir.join("out").join("picks.csv");
    write_csv(&batch, &csv_path, FixedOffset::west_opt(5 * 3600).unwrap()).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("Charlotte Hornets"));

    let json_path = dir.join("out").join("history.json");
    assert_eq!(save_batch(&batch, &json_path, false).unwrap(), 1);
    let loaded = load_batch(&json_path).unwrap().unwrap();
    assert_eq!(loaded.recommendations[0].confidence, ConfidenceTier::High);
    assert_eq!(loaded.recommendations[0].expected_value, dec!(7.20));

    let table = render_table(&batch, cfg.bankroll);
    assert!(table.contains("3.00% ($30.00)"));
    assert!(table.contains("Summary: 1/2 bets recommended"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_partial_config_file_uses_defaults() {
    let dir = scratch_dir();
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        "[staking]\nbankroll = 2500.0\nkelly_fraction = 0.5\n\n[output]\npersist_low = true\n",
    )
    .unwrap();

    let cfg = AppConfig::load(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.staking.bankroll, dec!(2500));
    assert_eq!(cfg.staking.kelly_fraction, 0.5);
    assert_eq!(cfg.staking.max_bet_pct, 0.05);
    assert!(cfg.output.persist_low);
    assert!(!cfg.llm.enabled);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_confidence_file_is_error() {
    let dir = scratch_dir();
    assert!(load_confidences(&dir.join("absent.json")).is_err());
    std::fs::remove_dir_all(&dir).ok();
}
