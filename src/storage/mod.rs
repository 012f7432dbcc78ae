//! Persistence layer.
//!
//! JSON files in, JSON files out: the slate (games, odds, injuries) the
//! fetch collaborators produce, an optional confidence map, and the
//! recommendation history written after each run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::types::{
    CandidateId, ConfidenceTier, Game, InjuryReport, OddsQuote, RecommendationBatch,
};

// ---------------------------------------------------------------------------
// Slate
// ---------------------------------------------------------------------------

/// Already-fetched inputs for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slate {
    pub games: Vec<Game>,
    #[serde(default)]
    pub odds: Vec<OddsQuote>,
    #[serde(default)]
    pub injuries: Vec<InjuryReport>,
}

impl Slate {
    /// Odds keyed by game id. A later quote for the same game replaces an
    /// earlier one.
    pub fn odds_by_game(&self) -> HashMap<String, OddsQuote> {
        let mut map = HashMap::with_capacity(self.odds.len());
        for quote in &self.odds {
            if map.insert(quote.game_id.clone(), quote.clone()).is_some() {
                warn!(game_id = %quote.game_id, "Duplicate odds quote, keeping the later one");
            }
        }
        map
    }

    pub fn injuries_by_game(&self) -> HashMap<String, InjuryReport> {
        self.injuries
            .iter()
            .map(|r| (r.game_id.clone(), r.clone()))
            .collect()
    }
}

/// Load a slate from a JSON file.
pub fn load_slate(path: &Path) -> Result<Slate> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read slate from {}", path.display()))?;
    let slate: Slate = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse slate from {}", path.display()))?;

    info!(
        path = %path.display(),
        games = slate.games.len(),
        odds = slate.odds.len(),
        injuries = slate.injuries.len(),
        "Slate loaded"
    );
    Ok(slate)
}

/// Load a `{ "<candidate id>": "high" }` confidence map.
pub fn load_confidences(path: &Path) -> Result<BTreeMap<CandidateId, ConfidenceTier>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read confidences from {}", path.display()))?;
    let map: BTreeMap<CandidateId, ConfidenceTier> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse confidences from {}", path.display()))?;

    debug!(path = %path.display(), count = map.len(), "Confidences loaded");
    Ok(map)
}

// ---------------------------------------------------------------------------
// Recommendation history
// ---------------------------------------------------------------------------

/// Write a batch to JSON. Unless `persist_low` is set, LOW-confidence
/// recommendations are left out. Returns the number written.
pub fn save_batch(batch: &RecommendationBatch, path: &Path, persist_low: bool) -> Result<usize> {
    let kept = RecommendationBatch {
        recommendations: batch
            .recommendations
            .iter()
            .filter(|r| persist_low || r.confidence > ConfidenceTier::Low)
            .cloned()
            .collect(),
        failures: batch.failures.clone(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(&kept).context("Failed to serialise batch")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write batch to {}", path.display()))?;

    debug!(
        path = %path.display(),
        written = kept.recommendations.len(),
        dropped = batch.recommendations.len() - kept.recommendations.len(),
        "Batch saved"
    );
    Ok(kept.recommendations.len())
}

/// Load a previously saved batch. Returns None if the file doesn't exist.
pub fn load_batch(path: &Path) -> Result<Option<RecommendationBatch>> {
    if !path.exists() {
        debug!(path = %path.display(), "No saved batch");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch from {}", path.display()))?;
    let batch = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse batch from {}", path.display()))?;
    Ok(Some(batch))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
