//! Context enrichment.
//!
//! Attaches situational signals to a candidate: back-to-back status for
//! both teams, the rest-day differential, and injury impact on either side.
//! Missing inputs degrade to neutral values plus a `QualityNote`; the
//! enricher never fails and never touches the candidate's line or identity.

use chrono::{Duration, FixedOffset, NaiveDate};
use tracing::debug;

use crate::types::{
    Candidate, EnrichmentSignals, Game, InjuryReport, QualityNote, TeamSlot,
};

// ---------------------------------------------------------------------------
// Schedule situation
// ---------------------------------------------------------------------------

/// Rest and back-to-back status of one team, with whatever had to be
/// assumed to get there.
#[derive(Debug, Clone, PartialEq)]
struct Situation {
    rest_days: Option<u32>,
    back_to_back: bool,
    notes: Vec<QualityNote>,
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Derives situational signals from already-fetched game and injury data.
#[derive(Debug, Clone)]
pub struct Enricher {
    schedule_offset: FixedOffset,
}

impl Enricher {
    /// `schedule_offset` fixes which calendar day a tip-off belongs to.
    pub fn new(schedule_offset: FixedOffset) -> Self {
        Self { schedule_offset }
    }

    /// Compute signals for a candidate. `injuries` may be absent.
    pub fn enrich(
        &self,
        candidate: &Candidate,
        game: &Game,
        injuries: Option<&InjuryReport>,
    ) -> EnrichmentSignals {
        let game_day = game.tipoff.with_timezone(&self.schedule_offset).date_naive();

        let dog_side = candidate.underdog;
        let fav_side = dog_side.opposite();
        let dog = Self::situation(game.team(dog_side), game_day);
        let fav = Self::situation(game.team(fav_side), game_day);

        let mut notes = Vec::new();
        notes.extend(dog.notes.iter().cloned());
        notes.extend(fav.notes.iter().cloned());

        let rest_differential = match (fav.rest_days, dog.rest_days) {
            (Some(f), Some(d)) => f as i32 - d as i32,
            _ => 0,
        };

        let (favorite_injury_impact, underdog_injury_impact) = match injuries {
            Some(report) => (
                report.team(fav_side).impact_score(),
                report.team(dog_side).impact_score(),
            ),
            None => {
                notes.push(QualityNote::MissingInjuryReport);
                (0.0, 0.0)
            }
        };

        let signals = EnrichmentSignals {
            underdog_back_to_back: dog.back_to_back,
            favorite_back_to_back: fav.back_to_back,
            underdog_rest_days: dog.rest_days,
            favorite_rest_days: fav.rest_days,
            rest_differential,
            favorite_injury_impact,
            underdog_injury_impact,
            notes,
        };

        debug!(
            candidate = %candidate.id,
            signals = %signals,
            notes = signals.notes.len(),
            "Candidate enriched"
        );

        signals
    }

    /// Resolve rest days and back-to-back for one team.
    ///
    /// Explicit fields win; otherwise both are derived from the last game
    /// date. A back-to-back is a previous-calendar-day game, i.e. one rest day.
    fn situation(team: &TeamSlot, game_day: NaiveDate) -> Situation {
        let mut notes = Vec::new();

        let derived_rest = team.last_played.and_then(|last| {
            let days = (game_day - last).num_days();
            u32::try_from(days).ok().filter(|d| *d > 0)
        });

        let rest_days = team.rest_days.or(derived_rest);
        if rest_days.is_none() {
            notes.push(QualityNote::MissingRestDays {
                team: team.abbreviation.clone(),
            });
        }

        let back_to_back = match (team.back_to_back, team.last_played, rest_days) {
            (Some(flag), _, _) => flag,
            (None, Some(last), _) => last == game_day - Duration::days(1),
            (None, None, Some(rest)) => rest == 1,
            (None, None, None) => {
                notes.push(QualityNote::MissingBackToBack {
                    team: team.abbreviation.clone(),
                });
                false
            }
        };

        Situation {
            rest_days,
            back_to_back,
            notes,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
