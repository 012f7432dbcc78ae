//! UNDERDOG: NBA underdog recommendation engine.
//!
//! Entry point. Loads configuration, initialises structured logging, reads
//! the day's slate, gathers confidence tiers (file, AI classifier, or a
//! fixed tier), then computes, prints and exports the recommendations.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use rust_decimal::Decimal;
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use underdog::config::AppConfig;
use underdog::engine::{compute_recommendations, screen_slate, ScreenedCandidate};
use underdog::export::{render_table, write_csv, BatchSummary};
use underdog::llm::openrouter::OpenRouterClassifier;
use underdog::llm::{
    attach_reasoning, classify_all, tiers, Classification, ConfidenceClassifier,
    FixedTierClassifier,
};
use underdog::storage;
use underdog::types::{CandidateId, ConfidenceTier};

#[derive(Parser, Debug)]
#[command(name = "underdog", version, about = "NBA underdog picks with fractional Kelly staking")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "UNDERDOG_CONFIG", default_value = "config.toml")]
    config: String,

    /// JSON slate with games, odds and injuries.
    #[arg(long)]
    slate: PathBuf,

    /// JSON map of candidate id to confidence tier.
    #[arg(long)]
    confidences: Option<PathBuf>,

    /// Classify unrated candidates with the AI model, even if disabled in config.
    #[arg(long)]
    classify: bool,

    /// Tier for candidates still unrated after the file and the classifier.
    #[arg(long)]
    default_tier: Option<ConfidenceTier>,

    /// Override the configured bankroll.
    #[arg(long)]
    bankroll: Option<Decimal>,

    /// Override the output directory.
    #[arg(long)]
    out_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    let mut cfg = AppConfig::load_or_default(&cli.config)?;
    if let Some(bankroll) = cli.bankroll {
        cfg.staking.bankroll = bankroll;
    }
    if let Some(dir) = &cli.out_dir {
        cfg.output.dir = dir.clone();
    }
    if cli.classify {
        cfg.llm.enabled = true;
    }

    init_logging();

    info!(
        config = %cli.config,
        bankroll = %cfg.staking.bankroll,
        kelly_fraction = cfg.staking.kelly_fraction,
        "UNDERDOG starting up"
    );

    // -- Inputs ----------------------------------------------------------

    let slate = storage::load_slate(&cli.slate)?;
    let odds = slate.odds_by_game();
    let injuries = slate.injuries_by_game();

    let mut confidences = match &cli.confidences {
        Some(path) => storage::load_confidences(path)?,
        None => BTreeMap::new(),
    };

    // -- Classification --------------------------------------------------

    let mut classifications: BTreeMap<CandidateId, Classification> = BTreeMap::new();
    let needs_tiers = cfg.llm.enabled || cli.default_tier.is_some();
    if needs_tiers {
        let screening = screen_slate(&slate.games, &odds, &injuries, &cfg.staking)?;
        let unrated: Vec<ScreenedCandidate> = screening
            .candidates
            .into_iter()
            .filter(|s| !confidences.contains_key(&s.candidate.id))
            .collect();

        if cfg.llm.enabled && !unrated.is_empty() {
            match AppConfig::resolve_env(&cfg.llm.api_key_env) {
                Ok(key) => {
                    let classifier =
                        OpenRouterClassifier::from_config(&cfg.llm, SecretString::new(key))?;
                    classifications
                        .extend(classify_all(&classifier, &unrated, cfg.llm.concurrency).await);
                }
                Err(e) => warn!(error = %e, "No AI classifier key, skipping classification"),
            }
        }

        if let Some(tier) = cli.default_tier {
            let still_unrated: Vec<ScreenedCandidate> = unrated
                .into_iter()
                .filter(|s| !classifications.contains_key(&s.candidate.id))
                .collect();
            let classifier = FixedTierClassifier::new(tier);
            info!(model = classifier.model_name(), tier = %tier, count = still_unrated.len(), "Applying default tier");
            classifications.extend(classify_all(&classifier, &still_unrated, 1).await);
        }
    }

    for (id, tier) in tiers(&classifications) {
        confidences.entry(id).or_insert(tier);
    }

    // -- Recommendations -------------------------------------------------

    let mut batch =
        compute_recommendations(&slate.games, &odds, &injuries, &confidences, &cfg.staking)?;
    attach_reasoning(&mut batch, &classifications);

    println!("{}", render_table(&batch, cfg.staking.bankroll));

    // -- Outputs ---------------------------------------------------------

    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let out_dir = Path::new(&cfg.output.dir);

    if cfg.output.csv {
        write_csv(
            &batch,
            &out_dir.join(format!("underdog_{stamp}.csv")),
            cfg.staking.schedule_offset(),
        )?;
    }
    if cfg.output.json {
        let path = out_dir.join(format!("recommendations_{stamp}.json"));
        let written = storage::save_batch(&batch, &path, cfg.output.persist_low)?;
        info!(path = %path.display(), written, "Recommendations persisted");
    }

    let summary = BatchSummary::from_batch(&batch);
    info!(
        recommendations = summary.total,
        actionable = summary.actionable,
        skipped = summary.failures,
        exposure = format!("{:.1}%", summary.exposure_pct),
        ev = %summary.total_ev,
        "UNDERDOG run complete"
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("underdog=info"));

    let json_logging = std::env::var("UNDERDOG_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
