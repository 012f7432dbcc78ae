//! Output rendering: CSV export, console table, and batch summary.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::types::{Recommendation, RecommendationBatch};

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Totals over the actionable recommendations of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub actionable: usize,
    pub failures: usize,
    /// Sum of actionable stake fractions, as a percentage of bankroll.
    pub exposure_pct: f64,
    pub total_amount: Decimal,
    pub total_ev: Decimal,
}

impl BatchSummary {
    pub fn from_batch(batch: &RecommendationBatch) -> Self {
        let mut summary = Self {
            total: batch.recommendations.len(),
            actionable: 0,
            failures: batch.failures.len(),
            exposure_pct: 0.0,
            total_amount: Decimal::ZERO,
            total_ev: Decimal::ZERO,
        };
        for rec in batch.actionable() {
            summary.actionable += 1;
            summary.exposure_pct += rec.stake_fraction * 100.0;
            summary.total_amount += rec.stake_amount;
            summary.total_ev += rec.expected_value;
        }
        summary
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} bets recommended | exposure {:.1}% (${:.2}) | EV ${:+.2}",
            self.actionable, self.total, self.exposure_pct, self.total_amount, self.total_ev,
        )?;
        if self.failures > 0 {
            write!(f, " | {} skipped", self.failures)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    date: String,
    time: String,
    game: &'a str,
    underdog: &'a str,
    favorite: &'a str,
    bet_type: String,
    line: f64,
    odds: String,
    confidence: String,
    actionable: bool,
    stake_pct: String,
    amount: Decimal,
    implied_prob: String,
    est_prob: String,
    expected_value: Decimal,
    underdog_b2b: bool,
    favorite_b2b: bool,
    rest_diff: i32,
    favorite_injury_impact: String,
    notes: String,
    reasoning: &'a str,
}

impl<'a> CsvRow<'a> {
    fn new(rec: &'a Recommendation, offset: &FixedOffset) -> Self {
        let local = rec.tipoff.with_timezone(offset);
        Self {
            date: local.format("%Y-%m-%d").to_string(),
            time: local.format("%H:%M").to_string(),
            game: &rec.matchup,
            underdog: &rec.underdog_team,
            favorite: &rec.favorite_team,
            bet_type: rec.bet_type.to_string(),
            line: rec.line,
            odds: rec.price.to_string(),
            confidence: rec.confidence.to_string(),
            actionable: rec.actionable,
            stake_pct: format!("{:.2}", rec.stake_fraction * 100.0),
            amount: rec.stake_amount,
            implied_prob: format!("{:.4}", rec.implied_probability),
            est_prob: format!("{:.4}", rec.win_probability),
            expected_value: rec.expected_value,
            underdog_b2b: rec.signals.underdog_back_to_back,
            favorite_b2b: rec.signals.favorite_back_to_back,
            rest_diff: rec.signals.rest_differential,
            favorite_injury_impact: format!("{:.2}", rec.signals.favorite_injury_impact),
            notes: rec
                .signals
                .notes
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join("; "),
            reasoning: rec.reasoning.as_deref().unwrap_or(""),
        }
    }
}

/// Write one CSV row per recommendation, in batch order. Dates and times
/// are rendered in `offset`.
pub fn write_csv(batch: &RecommendationBatch, path: &Path, offset: FixedOffset) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    for rec in &batch.recommendations {
        writer
            .serialize(CsvRow::new(rec, &offset))
            .with_context(|| format!("Failed to write CSV row for {}", rec.candidate_id))?;
    }
    writer.flush().context("Failed to flush CSV file")?;

    info!(path = %path.display(), rows = batch.recommendations.len(), "CSV exported");
    Ok(())
}

// ---------------------------------------------------------------------------
// Console table
// ---------------------------------------------------------------------------

/// Plain-text table of the batch, followed by skipped-candidate notices
/// and the summary line.
pub fn render_table(batch: &RecommendationBatch, bankroll: Decimal) -> String {
    let headers = ["Game", "Pick", "Type", "Line", "Odds", "Confidence", "Kelly Bet", "EV"];
    let rows: Vec<[String; 8]> = batch
        .recommendations
        .iter()
        .map(|r| {
            [
                r.matchup.clone(),
                r.underdog_team.clone(),
                r.bet_type.to_string(),
                format!("{:+}", r.line),
                r.price.to_string(),
                r.confidence.to_string(),
                r.stake_description.clone(),
                format!("${:+.2}", r.expected_value),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "Underdog Recommendations (Bankroll: ${bankroll:.2})");
    write_row(&mut out, &headers.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &rows {
        write_row(&mut out, row, &widths);
    }

    if !batch.failures.is_empty() {
        let _ = writeln!(out);
        for failure in &batch.failures {
            let _ = writeln!(out, "! {failure}");
        }
    }

    let _ = writeln!(out);
    let _ = write!(out, "Summary: {}", BatchSummary::from_batch(batch));
    out
}

fn write_row(out: &mut String, cells: &[String; 8], widths: &[usize; 8]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, w)| format!("{cell:<w$}"))
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
