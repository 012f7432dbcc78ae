//! OpenRouter confidence classifier.
//!
//! Sends the candidate's matchup context to a chat model through
//! OpenRouter's OpenAI-compatible API and parses a HIGH / MEDIUM / LOW
//! verdict from the reply. Retries with exponential backoff and falls back
//! to a secondary model when the primary fails.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, info, warn};

use super::{Classification, ConfidenceClassifier};
use crate::config::LlmConfig;
use crate::engine::ScreenedCandidate;
use crate::types::{ConfidenceTier, Side, TeamSlot};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Maximum retries on rate limit / server errors per model attempt.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// API types (OpenAI-compatible)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OpenRouterClassifier {
    http: Client,
    api_key: SecretString,
    primary_model: String,
    fallback_model: Option<String>,
    max_tokens: u32,
}

impl OpenRouterClassifier {
    pub fn new(
        api_key: SecretString,
        primary_model: String,
        fallback_model: Option<String>,
        max_tokens: u32,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to build OpenRouter HTTP client")?;

        Ok(Self {
            http,
            api_key,
            primary_model,
            fallback_model,
            max_tokens,
        })
    }

    pub fn from_config(config: &LlmConfig, api_key: SecretString) -> Result<Self> {
        Self::new(
            api_key,
            config.model.clone(),
            config.fallback_model.clone(),
            config.max_tokens,
        )
    }

    /// Send a chat completion request for a specific model, with retry +
    /// exponential backoff.
    async fn call_model(&self, model: &str, system: &str, user_message: &str) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_message.to_string(),
                },
            ],
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, model, "Retrying OpenRouter API call");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let resp = self
                .http
                .post(OPENROUTER_API_URL)
                .bearer_auth(self.api_key.expose_secret())
                .header("X-Title", "UNDERDOG")
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: ChatResponse = response
                            .json()
                            .await
                            .context("Failed to parse OpenRouter response")?;

                        return Ok(body
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|c| c.message)
                            .map(|m| m.content)
                            .unwrap_or_default());
                    }

                    // 429 and 5xx are worth another attempt
                    if status.as_u16() == 429 || status.is_server_error() {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, model, error = %error_text, "Retryable OpenRouter error");
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("OpenRouter API error {status} (model={model}): {error_text}");
                }
                Err(e) => {
                    warn!(attempt, model, error = %e, "OpenRouter request failed");
                    last_error = Some(format!("Request error: {e}"));
                }
            }
        }

        anyhow::bail!(
            "OpenRouter API failed after {MAX_RETRIES} retries (model={model}): {}",
            last_error.unwrap_or_default()
        )
    }

    /// Call the primary model, falling back to the secondary if configured.
    async fn call_api(&self, system: &str, user_message: &str) -> Result<String> {
        match self.call_model(&self.primary_model, system, user_message).await {
            Ok(text) => Ok(text),
            Err(primary_err) => match &self.fallback_model {
                Some(fallback) => {
                    warn!(
                        primary = %self.primary_model,
                        fallback = %fallback,
                        error = %primary_err,
                        "Primary model failed, falling back"
                    );
                    self.call_model(fallback, system, user_message)
                        .await
                        .with_context(|| {
                            format!(
                                "Both primary ({}) and fallback ({fallback}) models failed. Primary error: {primary_err}",
                                self.primary_model
                            )
                        })
                }
                None => Err(primary_err),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Prompting
    // -----------------------------------------------------------------------

    pub fn system_prompt() -> &'static str {
        "You are an expert NBA betting analyst specializing in underdog value plays. \
         Your job is to judge whether a pre-selected underdog spread or moneyline bet \
         has a real edge.\n\n\
         Key principles:\n\
         1. Contrarian approach: fade public heavy favorites when data supports it.\n\
         2. Focus on situational advantages: back-to-back fatigue, rest advantages, \
            injuries to key players.\n\
         3. Road underdogs in the +3.5 to +7.5 spread range and moneyline underdogs \
            from +150 to +300 offer the best risk/reward.\n\
         4. Be conservative: only rate HIGH when the edge is clear and concrete.\n\n\
         Your answer MUST end with exactly these two lines:\n\
         REASONING: <one or two sentences citing concrete factors>\n\
         CONFIDENCE: HIGH | MEDIUM | LOW"
    }

    /// Build the user prompt for one candidate.
    pub fn build_prompt(screened: &ScreenedCandidate) -> String {
        let ScreenedCandidate {
            game,
            candidate,
            signals,
            injuries,
        } = screened;
        let dog_side = candidate.underdog;
        let fav_side = dog_side.opposite();

        let injury_summary = |side: Side| {
            injuries
                .as_ref()
                .map(|r| r.team(side).summary())
                .unwrap_or_else(|| "No report".to_string())
        };

        let mut out = String::new();
        let _ = writeln!(out, "GAME: {} @ {}", game.away.name, game.home.name);
        let _ = writeln!(out, "DATE: {}", game.tipoff.format("%Y-%m-%d %H:%M UTC"));
        let _ = writeln!(out);
        let _ = writeln!(out, "UNDERDOG: {}", candidate.underdog_team);
        let _ = writeln!(
            out,
            "- Position: {}",
            if dog_side == Side::Home { "Home" } else { "Road" }
        );
        let _ = writeln!(out, "- Line: {:+} ({})", candidate.line, candidate.bet_type);
        let _ = writeln!(out, "- Odds: {}", candidate.price);
        write_team_lines(
            &mut out,
            game.team(dog_side),
            signals.underdog_rest_days,
            signals.underdog_back_to_back,
            &injury_summary(dog_side),
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "FAVORITE: {}", candidate.favorite_team);
        write_team_lines(
            &mut out,
            game.team(fav_side),
            signals.favorite_rest_days,
            signals.favorite_back_to_back,
            &injury_summary(fav_side),
        );
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "REST EDGE: {:+} days for the underdog; favorite injury impact {:.2}",
            signals.rest_differential, signals.favorite_injury_impact
        );
        let _ = writeln!(out, "BET TYPE: {}", candidate.bet_type);
        let _ = write!(out, "Analyze this underdog opportunity and rate your confidence.");
        out
    }

    /// Parse the tier and reasoning from a model reply.
    ///
    /// Looks for a `CONFIDENCE:` line from the bottom up; failing that, a
    /// bare tier word on one of the last few lines.
    pub fn parse_classification(text: &str) -> Result<Classification> {
        let lines: Vec<&str> = text.lines().collect();

        let labelled = lines.iter().rev().find_map(|line| {
            let upper = line.to_uppercase();
            let idx = upper.find("CONFIDENCE:")?;
            first_tier_word(&upper[idx + "CONFIDENCE:".len()..])
        });

        let tier = labelled
            .or_else(|| {
                lines
                    .iter()
                    .rev()
                    .take(3)
                    .find_map(|line| first_tier_word(&line.to_uppercase()))
            })
            .ok_or_else(|| anyhow::anyhow!("Could not parse confidence tier from LLM response"))?;

        Ok(Classification {
            tier,
            reasoning: extract_reasoning(text),
        })
    }
}

fn write_team_lines(
    out: &mut String,
    team: &TeamSlot,
    rest_days: Option<u32>,
    back_to_back: bool,
    injuries: &str,
) {
    let rest = rest_days.map_or_else(|| "unknown".to_string(), |d| d.to_string());
    let _ = writeln!(out, "- Rest days: {rest}");
    let _ = writeln!(out, "- Back-to-back: {}", if back_to_back { "YES" } else { "No" });
    let _ = writeln!(
        out,
        "- Recent form: {}",
        team.recent_record.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(out, "- Key injuries: {injuries}");
}

/// First HIGH / MEDIUM / LOW word in an upper-cased string.
fn first_tier_word(upper: &str) -> Option<ConfidenceTier> {
    upper
        .split(|c: char| !c.is_ascii_alphabetic())
        .find_map(|word| match word {
            "HIGH" => Some(ConfidenceTier::High),
            "MEDIUM" | "MED" => Some(ConfidenceTier::Medium),
            "LOW" => Some(ConfidenceTier::Low),
            _ => None,
        })
}

/// Text after the last `REASONING:` label, or everything before the
/// `CONFIDENCE:` line when no label is present.
fn extract_reasoning(text: &str) -> String {
    let upper = text.to_ascii_uppercase();
    if let Some(idx) = upper.rfind("REASONING:") {
        let rest = &text[idx + "REASONING:".len()..];
        let rest_upper = &upper[idx + "REASONING:".len()..];
        let end = rest_upper.find("CONFIDENCE:").unwrap_or(rest.len());
        return rest[..end].trim().to_string();
    }
    text.lines()
        .take_while(|l| !l.to_ascii_uppercase().contains("CONFIDENCE:"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// ConfidenceClassifier implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ConfidenceClassifier for OpenRouterClassifier {
    async fn classify(&self, screened: &ScreenedCandidate) -> Result<Classification> {
        let prompt = Self::build_prompt(screened);

        debug!(
            candidate = %screened.candidate.id,
            model = %self.primary_model,
            "Requesting confidence classification via OpenRouter"
        );

        let text = self
            .call_api(Self::system_prompt(), &prompt)
            .await
            .context("OpenRouter API call failed")?;

        let classification = Self::parse_classification(&text)
            .with_context(|| format!("Unparseable reply for {}", screened.candidate.id))?;

        info!(
            candidate = %screened.candidate.id,
            tier = %classification.tier,
            "Candidate classified"
        );

        Ok(classification)
    }

    fn model_name(&self) -> &str {
        &self.primary_model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
