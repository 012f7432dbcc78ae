//! AI confidence classification.
//!
//! Defines the `ConfidenceClassifier` trait the engine treats as an opaque
//! collaborator (candidate + signals in, one confidence tier out), a fixed
//! tier stub, and an OpenRouter-backed implementation.

pub mod openrouter;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::engine::ScreenedCandidate;
use crate::types::{CandidateId, ConfidenceTier, RecommendationBatch};

/// A classifier's verdict on one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tier: ConfidenceTier,
    pub reasoning: String,
}

/// Abstraction over confidence classifiers.
///
/// Implementors receive a screened candidate and must return exactly one
/// of HIGH, MEDIUM or LOW.
#[async_trait]
pub trait ConfidenceClassifier: Send + Sync {
    async fn classify(&self, screened: &ScreenedCandidate) -> Result<Classification>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Fixed-tier stub
// ---------------------------------------------------------------------------

/// Returns a configured tier for every candidate, with optional per-candidate
/// overrides. Used when AI analysis is disabled and in tests.
#[derive(Debug, Clone)]
pub struct FixedTierClassifier {
    default_tier: ConfidenceTier,
    overrides: BTreeMap<CandidateId, ConfidenceTier>,
}

impl FixedTierClassifier {
    pub fn new(default_tier: ConfidenceTier) -> Self {
        Self {
            default_tier,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: BTreeMap<CandidateId, ConfidenceTier>) -> Self {
        self.overrides = overrides;
        self
    }
}

#[async_trait]
impl ConfidenceClassifier for FixedTierClassifier {
    async fn classify(&self, screened: &ScreenedCandidate) -> Result<Classification> {
        let tier = self
            .overrides
            .get(&screened.candidate.id)
            .copied()
            .unwrap_or(self.default_tier);
        Ok(Classification {
            tier,
            reasoning: String::new(),
        })
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

// ---------------------------------------------------------------------------
// Batch classification
// ---------------------------------------------------------------------------

/// Classify every candidate with at most `concurrency` requests in flight.
///
/// A candidate whose classification fails is left out of the map; the
/// engine then treats it as LOW with a quality note.
pub async fn classify_all(
    classifier: &dyn ConfidenceClassifier,
    candidates: &[ScreenedCandidate],
    concurrency: usize,
) -> BTreeMap<CandidateId, Classification> {
    let results: Vec<_> = stream::iter(candidates)
        .map(|screened| async move {
            let outcome = classifier.classify(screened).await;
            (screened.candidate.id.clone(), outcome)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut tiers = BTreeMap::new();
    let mut failed = 0usize;
    for (id, outcome) in results {
        match outcome {
            Ok(classification) => {
                tiers.insert(id, classification);
            }
            Err(e) => {
                failed += 1;
                warn!(candidate = %id, error = %e, "Classification failed, candidate left unclassified");
            }
        }
    }

    info!(
        model = classifier.model_name(),
        classified = tiers.len(),
        failed,
        "Classification complete"
    );

    tiers
}

/// The tier of each classification, as the engine consumes them.
pub fn tiers(
    classifications: &BTreeMap<CandidateId, Classification>,
) -> BTreeMap<CandidateId, ConfidenceTier> {
    classifications
        .iter()
        .map(|(id, c)| (id.clone(), c.tier))
        .collect()
}

/// Copy non-empty classifier reasoning onto the matching recommendations.
pub fn attach_reasoning(
    batch: &mut RecommendationBatch,
    classifications: &BTreeMap<CandidateId, Classification>,
) {
    for rec in &mut batch.recommendations {
        let Some(c) = classifications.get(&rec.candidate_id) else {
            continue;
        };
        let reasoning = c.reasoning.trim();
        if !reasoning.is_empty() {
            rec.reasoning = Some(reasoning.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
