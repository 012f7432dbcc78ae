//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! field has a default, so a partial (or missing) file still yields a
//! usable configuration. Secrets (API keys) are referenced by env-var name
//! in the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::types::UnderdogError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub staking: StakingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Staking
// ---------------------------------------------------------------------------

/// Run-wide staking and filter configuration, passed explicitly into the
/// engine entry point.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StakingConfig {
    /// Bankroll in dollars; the only place fractions become amounts.
    pub bankroll: Decimal,
    /// Fractional Kelly multiplier (0.25 = quarter-Kelly).
    pub kelly_fraction: f64,
    /// Maximum stake as a fraction of bankroll.
    pub max_bet_pct: f64,
    /// Minimum stake as a fraction of bankroll; anything smaller is a no-bet.
    pub min_bet_pct: f64,
    /// Inclusive underdog spread range, in points.
    pub spread_range: (f64, f64),
    /// Inclusive underdog moneyline range, in American odds.
    pub moneyline_range: (f64, f64),
    /// Remove the bookmaker margin when both sides of the market are quoted.
    pub devig: bool,
    pub probability_floor: f64,
    pub probability_ceiling: f64,
    /// Offset of the league's schedule calendar (US Eastern = -5), used to
    /// decide which calendar day a tip-off falls on.
    pub schedule_utc_offset_hours: i32,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            bankroll: dec!(1000.0),
            kelly_fraction: 0.25,
            max_bet_pct: 0.05,
            min_bet_pct: 0.005,
            spread_range: (3.5, 7.5),
            moneyline_range: (150.0, 300.0),
            devig: false,
            probability_floor: 0.01,
            probability_ceiling: 0.99,
            schedule_utc_offset_hours: -5,
        }
    }
}

impl StakingConfig {
    /// Check every bound the engine relies on.
    pub fn validate(&self) -> Result<(), UnderdogError> {
        let fail = |msg: String| Err(UnderdogError::InvalidConfig(msg));

        if self.bankroll <= Decimal::ZERO {
            return fail(format!("bankroll must be positive, got {}", self.bankroll));
        }
        if !(self.kelly_fraction > 0.0 && self.kelly_fraction <= 1.0) {
            return fail(format!("kelly_fraction must be in (0, 1], got {}", self.kelly_fraction));
        }
        if !(self.max_bet_pct > 0.0 && self.max_bet_pct <= 1.0) {
            return fail(format!("max_bet_pct must be in (0, 1], got {}", self.max_bet_pct));
        }
        if !(self.min_bet_pct >= 0.0 && self.min_bet_pct < self.max_bet_pct) {
            return fail(format!(
                "min_bet_pct must be in [0, max_bet_pct), got {} (max {})",
                self.min_bet_pct, self.max_bet_pct
            ));
        }
        let (lo, hi) = self.spread_range;
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return fail(format!("spread_range must be an ordered pair, got ({lo}, {hi})"));
        }
        let (lo, hi) = self.moneyline_range;
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return fail(format!("moneyline_range must be an ordered pair, got ({lo}, {hi})"));
        }
        if !(self.probability_floor > 0.0
            && self.probability_floor < self.probability_ceiling
            && self.probability_ceiling < 1.0)
        {
            return fail(format!(
                "probability bounds must satisfy 0 < floor < ceiling < 1, got [{}, {}]",
                self.probability_floor, self.probability_ceiling
            ));
        }
        if !(-12..=14).contains(&self.schedule_utc_offset_hours) {
            return fail(format!(
                "schedule_utc_offset_hours must be in [-12, 14], got {}",
                self.schedule_utc_offset_hours
            ));
        }
        Ok(())
    }

    /// Calendar offset for schedule-day arithmetic.
    pub fn schedule_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.schedule_utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

// ---------------------------------------------------------------------------
// LLM classifier
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub model: String,
    pub fallback_model: Option<String>,
    pub api_key_env: String,
    pub max_tokens: u32,
    /// Candidates classified in flight at once.
    pub concurrency: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "anthropic/claude-3.5-sonnet".to_string(),
            fallback_model: None,
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            max_tokens: 1024,
            concurrency: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub csv: bool,
    pub json: bool,
    /// Persist LOW-confidence recommendations to the JSON history too.
    pub persist_low: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            csv: true,
            json: true,
            persist_low: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config
            .staking
            .validate()
            .with_context(|| format!("Invalid [staking] section in {path}"))?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
