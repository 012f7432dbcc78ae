//! Shared types for the UNDERDOG engine.
//!
//! These types form the data model used across all modules: the game and
//! odds snapshot supplied by the fetch collaborators, the intermediate
//! candidate/signal records, and the terminal `Recommendation` consumed by
//! the export and persistence layers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which team of a game a quote or pick refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "home"),
            Side::Away => write!(f, "away"),
        }
    }
}

/// Market the candidate qualified through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Spread,
    Moneyline,
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetType::Spread => write!(f, "SPREAD"),
            BetType::Moneyline => write!(f, "MONEYLINE"),
        }
    }
}

/// Qualitative confidence produced by the AI-analysis collaborator.
///
/// Ordering is `Low < Medium < High`, so sorting descending puts the
/// strongest picks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// Assumed edge over the market-implied probability for this tier.
    pub fn edge(&self) -> f64 {
        match self {
            ConfidenceTier::High => 0.08,
            ConfidenceTier::Medium => 0.04,
            ConfidenceTier::Low => 0.0,
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTier::High => write!(f, "HIGH"),
            ConfidenceTier::Medium => write!(f, "MEDIUM"),
            ConfidenceTier::Low => write!(f, "LOW"),
        }
    }
}

/// Parse a tier label (case-insensitive).
impl std::str::FromStr for ConfidenceTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(ConfidenceTier::High),
            "medium" | "med" => Ok(ConfidenceTier::Medium),
            "low" => Ok(ConfidenceTier::Low),
            _ => Err(anyhow::anyhow!("Unknown confidence tier: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// A quoted price, as supplied by the odds provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Price {
    /// American odds (+150, -110, ...). Valid values satisfy |x| >= 100.
    American(i32),
    /// Decimal odds (2.50 returns 2.50 per unit staked, stake included).
    Decimal(f64),
}

impl Price {
    /// Normalise to decimal odds.
    ///
    /// A decimal price of exactly 1.0 is accepted (zero net odds); the
    /// stake sizer turns it into a no-bet.
    pub fn to_decimal(&self) -> Result<f64, UnderdogError> {
        match *self {
            Price::American(odds) if odds >= 100 => Ok(odds as f64 / 100.0 + 1.0),
            Price::American(odds) if odds <= -100 => Ok(100.0 / odds.unsigned_abs() as f64 + 1.0),
            Price::American(odds) => Err(UnderdogError::InvalidOdds(format!(
                "American odds must satisfy |x| >= 100, got {odds}"
            ))),
            Price::Decimal(d) if d.is_finite() && d >= 1.0 => Ok(d),
            Price::Decimal(d) => Err(UnderdogError::InvalidOdds(format!(
                "decimal odds must be >= 1.0, got {d}"
            ))),
        }
    }

    /// American-equivalent value, used for moneyline range checks and display.
    pub fn to_american(&self) -> Result<f64, UnderdogError> {
        match *self {
            Price::American(odds) => {
                self.to_decimal()?;
                Ok(odds as f64)
            }
            Price::Decimal(_) => {
                let d = self.to_decimal()?;
                if d >= 2.0 {
                    Ok((d - 1.0) * 100.0)
                } else if d > 1.0 {
                    Ok(-100.0 / (d - 1.0))
                } else {
                    Err(UnderdogError::InvalidOdds(
                        "decimal odds of 1.0 have no American equivalent".to_string(),
                    ))
                }
            }
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::American(odds) => write!(f, "{odds:+}"),
            Price::Decimal(d) => write!(f, "{d:.2}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Games & odds
// ---------------------------------------------------------------------------

/// One team's slot in a scheduled game, with its schedule situation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSlot {
    pub name: String,
    pub abbreviation: String,
    /// Calendar days since the previous game (1 = played yesterday).
    #[serde(default)]
    pub rest_days: Option<u32>,
    #[serde(default)]
    pub back_to_back: Option<bool>,
    #[serde(default)]
    pub last_played: Option<NaiveDate>,
    /// Free-form recent record, e.g. "3-2 L5". Prompt context only.
    #[serde(default)]
    pub recent_record: Option<String>,
}

/// A scheduled game. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub tipoff: DateTime<Utc>,
    pub home: TeamSlot,
    pub away: TeamSlot,
}

impl Game {
    pub fn team(&self, side: Side) -> &TeamSlot {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    /// "AWY @ HOM" label.
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away.abbreviation, self.home.abbreviation)
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ {} ({})",
            self.id,
            self.away.name,
            self.home.name,
            self.tipoff.format("%Y-%m-%d %H:%M UTC"),
        )
    }
}

/// A spread line: handicap points plus the price to bet it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadLine {
    pub points: f64,
    pub price: Price,
}

/// Everything quoted for one side of a game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideQuote {
    #[serde(default)]
    pub spread: Option<SpreadLine>,
    #[serde(default)]
    pub moneyline: Option<Price>,
}

impl SideQuote {
    pub fn is_empty(&self) -> bool {
        self.spread.is_none() && self.moneyline.is_none()
    }
}

/// Odds snapshot for one game. Never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsQuote {
    pub game_id: String,
    #[serde(default)]
    pub bookmaker: String,
    #[serde(default)]
    pub home: SideQuote,
    #[serde(default)]
    pub away: SideQuote,
    pub timestamp: DateTime<Utc>,
}

impl OddsQuote {
    pub fn side(&self, side: Side) -> &SideQuote {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    /// Whether the quote carries nothing usable for either side.
    pub fn is_empty(&self) -> bool {
        self.home.is_empty() && self.away.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Injuries
// ---------------------------------------------------------------------------

/// Reported availability of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjuryTier {
    Out,
    Doubtful,
    Questionable,
    Probable,
}

impl InjuryTier {
    /// Contribution of one player at this tier to the team impact score.
    pub fn weight(&self) -> f64 {
        match self {
            InjuryTier::Out => 1.0,
            InjuryTier::Doubtful => 0.75,
            InjuryTier::Questionable => 0.5,
            InjuryTier::Probable => 0.1,
        }
    }
}

impl fmt::Display for InjuryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjuryTier::Out => write!(f, "out"),
            InjuryTier::Doubtful => write!(f, "doubtful"),
            InjuryTier::Questionable => write!(f, "questionable"),
            InjuryTier::Probable => write!(f, "probable"),
        }
    }
}

fn default_importance() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub tier: InjuryTier,
    /// Relative importance of the player to the rotation (1.0 = starter).
    #[serde(default = "default_importance")]
    pub importance: f64,
}

/// Injured players of one team, keyed by player name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamInjuries {
    #[serde(default)]
    pub players: BTreeMap<String, PlayerStatus>,
}

impl TeamInjuries {
    /// Aggregate impact: sum of tier weight x importance over listed players.
    pub fn impact_score(&self) -> f64 {
        self.players
            .values()
            .map(|p| p.tier.weight() * p.importance.max(0.0))
            .sum()
    }

    /// "Name (out), Name (questionable)" summary for prompts.
    pub fn summary(&self) -> String {
        if self.players.is_empty() {
            return "None reported".to_string();
        }
        self.players
            .iter()
            .map(|(name, status)| format!("{name} ({})", status.tier))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryReport {
    pub game_id: String,
    #[serde(default)]
    pub home: TeamInjuries,
    #[serde(default)]
    pub away: TeamInjuries,
}

impl InjuryReport {
    pub fn team(&self, side: Side) -> &TeamInjuries {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }
}

// ---------------------------------------------------------------------------
// Candidates & signals
// ---------------------------------------------------------------------------

/// Identifier of a candidate: `"{game_id}:{side}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn new(game_id: &str, side: Side) -> Self {
        CandidateId(format!("{game_id}:{side}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A (game, underdog side) pair that passed the underdog filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub game_id: String,
    pub tipoff: DateTime<Utc>,
    pub matchup: String,
    pub underdog: Side,
    pub underdog_team: String,
    pub favorite_team: String,
    pub bet_type: BetType,
    /// Spread points, or the American moneyline value, that qualified the pick.
    pub line: f64,
    /// Price to bet the qualifying market on the underdog side.
    pub price: Price,
    /// Price of the same market on the favorite side, when quoted.
    pub opposing_price: Option<Price>,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {:+} @ {}",
            self.matchup, self.underdog_team, self.bet_type, self.line, self.price,
        )
    }
}

/// Data-quality note attached when an input was absent and a neutral value
/// was substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityNote {
    MissingInjuryReport,
    MissingRestDays { team: String },
    MissingBackToBack { team: String },
    MissingConfidence,
}

impl fmt::Display for QualityNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityNote::MissingInjuryReport => write!(f, "no injury report; impact treated as 0"),
            QualityNote::MissingRestDays { team } => {
                write!(f, "no rest-day data for {team}; differential treated as 0")
            }
            QualityNote::MissingBackToBack { team } => {
                write!(f, "no schedule data for {team}; assumed not back-to-back")
            }
            QualityNote::MissingConfidence => write!(f, "no confidence tier; treated as LOW"),
        }
    }
}

/// Situational signals attached to a candidate by the enricher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentSignals {
    pub underdog_back_to_back: bool,
    pub favorite_back_to_back: bool,
    pub underdog_rest_days: Option<u32>,
    pub favorite_rest_days: Option<u32>,
    /// Favorite rest days minus underdog rest days (positive favors the underdog).
    pub rest_differential: i32,
    /// Higher = weaker favorite.
    pub favorite_injury_impact: f64,
    pub underdog_injury_impact: f64,
    pub notes: Vec<QualityNote>,
}

impl fmt::Display for EnrichmentSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "b2b(dog={}, fav={}) rest_diff={:+} fav_injury={:.2} dog_injury={:.2}",
            self.underdog_back_to_back,
            self.favorite_back_to_back,
            self.rest_differential,
            self.favorite_injury_impact,
            self.underdog_injury_impact,
        )
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// Why a recommendation carries a zero stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoBetReason {
    /// Full Kelly fraction is zero or negative.
    NonPositiveKelly,
    /// Net odds of zero.
    EvenMoney,
    /// Fractional Kelly below the minimum stake.
    BelowMinimum,
}

impl fmt::Display for NoBetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoBetReason::NonPositiveKelly => write!(f, "no edge"),
            NoBetReason::EvenMoney => write!(f, "zero net odds"),
            NoBetReason::BelowMinimum => write!(f, "below minimum stake"),
        }
    }
}

/// Terminal record of the engine. Created once per candidate per run and
/// never mutated after assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub candidate_id: CandidateId,
    pub game_id: String,
    pub tipoff: DateTime<Utc>,
    pub matchup: String,
    pub underdog: Side,
    pub underdog_team: String,
    pub favorite_team: String,
    pub bet_type: BetType,
    pub line: f64,
    pub price: Price,
    pub decimal_odds: f64,
    pub confidence: ConfidenceTier,
    /// Assumed edge added to the implied probability (0.08 = 8%).
    pub edge: f64,
    pub implied_probability: f64,
    pub win_probability: f64,
    /// Whether `implied_probability` had the bookmaker margin removed.
    pub devigged: bool,
    pub full_kelly: f64,
    pub stake_fraction: f64,
    pub stake_amount: Decimal,
    pub expected_value: Decimal,
    pub actionable: bool,
    pub no_bet_reason: Option<NoBetReason>,
    pub stake_description: String,
    pub signals: EnrichmentSignals,
    /// Classifier's explanation for the tier, when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {:+} ({}) | {} | implied={:.1}% est={:.1}% | {} | EV=${:+.2}",
            self.matchup,
            self.underdog_team,
            self.bet_type,
            self.line,
            self.price,
            self.confidence,
            self.implied_probability * 100.0,
            self.win_probability * 100.0,
            self.stake_description,
            self.expected_value,
        )
    }
}

/// A candidate that could not be turned into a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFailure {
    /// Absent when the failure happened before the underdog side was known.
    pub candidate_id: Option<CandidateId>,
    pub game_id: String,
    pub reason: String,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.candidate_id {
            Some(id) => write!(f, "skipped {id}: {}", self.reason),
            None => write!(f, "skipped game {}: {}", self.game_id, self.reason),
        }
    }
}

/// Output of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBatch {
    pub recommendations: Vec<Recommendation>,
    pub failures: Vec<CandidateFailure>,
}

impl RecommendationBatch {
    pub fn actionable(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(|r| r.actionable)
    }
}

// ---------------------------------------------------------------------------
// Money helpers
// ---------------------------------------------------------------------------

/// Convert an f64 dollar figure to a cent-rounded `Decimal`.
pub fn to_cents(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for UNDERDOG.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnderdogError {
    #[error("Invalid odds: {0}")]
    InvalidOdds(String),

    #[error("Invalid probability: {0}")]
    InvalidProbability(String),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
