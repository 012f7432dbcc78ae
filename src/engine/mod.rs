//! Core engine: screen a slate for underdog spots and turn them into
//! ranked, stake-sized recommendations.
//!
//! Each game runs through filter -> enrich -> estimate -> size -> assemble
//! independently. Games are processed in parallel and the results are
//! collected before the single final sort, so output order never depends on
//! scheduling.

pub mod enricher;
pub mod filter;

use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::config::StakingConfig;
use crate::strategy::{RecommendationAssembler, StrategyPipeline};
use crate::types::{
    Candidate, CandidateFailure, CandidateId, ConfidenceTier, EnrichmentSignals, Game,
    InjuryReport, OddsQuote, QualityNote, Recommendation, RecommendationBatch, UnderdogError,
};
use enricher::Enricher;
use filter::UnderdogFilter;

// ---------------------------------------------------------------------------
// Screening
// ---------------------------------------------------------------------------

/// A candidate with its signals and the source records it came from.
/// This is what the confidence classifier sees.
#[derive(Debug, Clone)]
pub struct ScreenedCandidate {
    pub game: Game,
    pub candidate: Candidate,
    pub signals: EnrichmentSignals,
    pub injuries: Option<InjuryReport>,
}

/// Result of screening a slate: candidates in input order plus failures.
#[derive(Debug, Clone, Default)]
pub struct Screening {
    pub candidates: Vec<ScreenedCandidate>,
    pub failures: Vec<CandidateFailure>,
}

/// Run the filter and enricher over a slate without estimating or sizing.
pub fn screen_slate(
    games: &[Game],
    odds_by_game: &HashMap<String, OddsQuote>,
    injuries_by_game: &HashMap<String, InjuryReport>,
    config: &StakingConfig,
) -> Result<Screening, UnderdogError> {
    config.validate()?;
    let filter = UnderdogFilter::new(config);
    let enricher = Enricher::new(config.schedule_offset());

    let outcomes: Vec<_> = games
        .par_iter()
        .map(|game| screen_game(game, odds_by_game, injuries_by_game, &filter, &enricher))
        .collect();

    let mut screening = Screening::default();
    for outcome in outcomes {
        match outcome {
            Ok(Some(screened)) => screening.candidates.push(screened),
            Ok(None) => {}
            Err(failure) => screening.failures.push(failure),
        }
    }

    info!(
        games = games.len(),
        candidates = screening.candidates.len(),
        failures = screening.failures.len(),
        "Slate screened"
    );

    Ok(screening)
}

fn screen_game(
    game: &Game,
    odds_by_game: &HashMap<String, OddsQuote>,
    injuries_by_game: &HashMap<String, InjuryReport>,
    filter: &UnderdogFilter,
    enricher: &Enricher,
) -> Result<Option<ScreenedCandidate>, CandidateFailure> {
    let Some(quote) = odds_by_game.get(&game.id) else {
        debug!(game_id = %game.id, "No odds for game, skipping");
        return Ok(None);
    };

    let candidate = match filter.find_candidate(game, quote) {
        Ok(Some(c)) => c,
        Ok(None) => return Ok(None),
        Err(e) => {
            warn!(game_id = %game.id, error = %e, "Malformed odds, game skipped");
            return Err(CandidateFailure {
                candidate_id: None,
                game_id: game.id.clone(),
                reason: e.to_string(),
            });
        }
    };

    let injuries = injuries_by_game.get(&game.id);
    let signals = enricher.enrich(&candidate, game, injuries);

    Ok(Some(ScreenedCandidate {
        game: game.clone(),
        candidate,
        signals,
        injuries: injuries.cloned(),
    }))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Compute ranked recommendations for a slate.
///
/// Fails as a whole only when `config` is invalid. Bad odds or estimates
/// for one game are reported in `failures` and never affect other games.
/// Candidates without a confidence tier are treated as LOW and carry a
/// `MissingConfidence` note.
pub fn compute_recommendations(
    games: &[Game],
    odds_by_game: &HashMap<String, OddsQuote>,
    injuries_by_game: &HashMap<String, InjuryReport>,
    confidence_by_candidate: &BTreeMap<CandidateId, ConfidenceTier>,
    config: &StakingConfig,
) -> Result<RecommendationBatch, UnderdogError> {
    config.validate()?;
    let filter = UnderdogFilter::new(config);
    let enricher = Enricher::new(config.schedule_offset());
    let pipeline = StrategyPipeline::from_config(config);

    let outcomes: Vec<_> = games
        .par_iter()
        .map(|game| -> Result<Option<Recommendation>, CandidateFailure> {
            let screened =
                screen_game(game, odds_by_game, injuries_by_game, &filter, &enricher)?;
            match screened {
                Some(s) => recommend(&pipeline, s, confidence_by_candidate).map(Some),
                None => Ok(None),
            }
        })
        .collect();

    let mut batch = RecommendationBatch::default();
    for outcome in outcomes {
        match outcome {
            Ok(Some(rec)) => batch.recommendations.push(rec),
            Ok(None) => {}
            Err(failure) => batch.failures.push(failure),
        }
    }

    RecommendationAssembler::rank(&mut batch.recommendations);

    let actionable = batch.actionable().count();
    info!(
        games = games.len(),
        recommendations = batch.recommendations.len(),
        actionable,
        failures = batch.failures.len(),
        "Recommendations computed"
    );

    Ok(batch)
}

fn recommend(
    pipeline: &StrategyPipeline,
    screened: ScreenedCandidate,
    confidence_by_candidate: &BTreeMap<CandidateId, ConfidenceTier>,
) -> Result<Recommendation, CandidateFailure> {
    let ScreenedCandidate {
        candidate,
        mut signals,
        ..
    } = screened;

    let tier = match confidence_by_candidate.get(&candidate.id) {
        Some(tier) => *tier,
        None => {
            debug!(candidate = %candidate.id, "No confidence tier, treating as LOW");
            signals.notes.push(QualityNote::MissingConfidence);
            ConfidenceTier::Low
        }
    };

    pipeline.recommend(&candidate, signals, tier).map_err(|e| {
        warn!(candidate = %candidate.id, error = %e, "Candidate failed");
        CandidateFailure {
            candidate_id: Some(candidate.id.clone()),
            game_id: candidate.game_id.clone(),
            reason: e.to_string(),
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
