//! Underdog filter.
//!
//! Picks the underdog side of each quoted game and keeps it as a
//! `Candidate` when its spread or moneyline lands inside the configured
//! ranges. Pure function of its inputs: no clock, no I/O.

use tracing::{debug, warn};

use crate::config::StakingConfig;
use crate::types::{BetType, Candidate, CandidateId, Game, OddsQuote, Price, Side, UnderdogError};

/// Inclusive range checks on the underdog's line.
#[derive(Debug, Clone)]
pub struct UnderdogFilter {
    spread_min: f64,
    spread_max: f64,
    moneyline_min: f64,
    moneyline_max: f64,
}

impl UnderdogFilter {
    pub fn new(config: &StakingConfig) -> Self {
        Self {
            spread_min: config.spread_range.0,
            spread_max: config.spread_range.1,
            moneyline_min: config.moneyline_range.0,
            moneyline_max: config.moneyline_range.1,
        }
    }

    /// Filter a slate, keeping input order. Games with malformed odds are
    /// logged and dropped here; `engine::compute_recommendations` reports
    /// them as failures instead.
    pub fn filter(&self, slate: &[(Game, OddsQuote)]) -> Vec<Candidate> {
        slate
            .iter()
            .filter_map(|(game, quote)| match self.find_candidate(game, quote) {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!(game_id = %game.id, error = %e, "Malformed odds, game skipped");
                    None
                }
            })
            .collect()
    }

    /// Zero or one candidate for a game.
    ///
    /// `Ok(None)` covers both "not an underdog spot" and "no usable odds".
    /// `Err` means a price needed for the decision was malformed.
    pub fn find_candidate(
        &self,
        game: &Game,
        quote: &OddsQuote,
    ) -> Result<Option<Candidate>, UnderdogError> {
        if quote.is_empty() {
            debug!(game_id = %game.id, "No odds quoted, skipping");
            return Ok(None);
        }

        let Some(underdog) = underdog_side(quote)? else {
            debug!(game_id = %game.id, "No clear underdog (pick'em or one-sided quote)");
            return Ok(None);
        };

        let dog = quote.side(underdog);
        let fav = quote.side(underdog.opposite());

        // Spread first, then moneyline.
        if let Some(spread) = dog.spread {
            if self.spread_in_range(spread.points) {
                spread.price.to_decimal()?;
                return Ok(Some(self.build(
                    game,
                    underdog,
                    BetType::Spread,
                    spread.points,
                    spread.price,
                    fav.spread.map(|s| s.price),
                )));
            }
        }

        if let Some(price) = dog.moneyline {
            let american = price.to_american()?;
            if self.moneyline_in_range(american) {
                return Ok(Some(self.build(
                    game,
                    underdog,
                    BetType::Moneyline,
                    american,
                    price,
                    fav.moneyline,
                )));
            }
        }

        debug!(game_id = %game.id, side = %underdog, "Underdog line outside filter ranges");
        Ok(None)
    }

    fn spread_in_range(&self, points: f64) -> bool {
        points >= self.spread_min && points <= self.spread_max
    }

    fn moneyline_in_range(&self, american: f64) -> bool {
        american >= self.moneyline_min && american <= self.moneyline_max
    }

    fn build(
        &self,
        game: &Game,
        underdog: Side,
        bet_type: BetType,
        line: f64,
        price: Price,
        opposing_price: Option<Price>,
    ) -> Candidate {
        let candidate = Candidate {
            id: CandidateId::new(&game.id, underdog),
            game_id: game.id.clone(),
            tipoff: game.tipoff,
            matchup: game.matchup(),
            underdog,
            underdog_team: game.team(underdog).name.clone(),
            favorite_team: game.team(underdog.opposite()).name.clone(),
            bet_type,
            line,
            price,
            opposing_price,
        };
        debug!(
            candidate = %candidate.id,
            bet_type = %bet_type,
            line,
            price = %price,
            "Underdog candidate"
        );
        candidate
    }
}

/// Determine the underdog: positive spread first, otherwise the longer
/// moneyline price.
fn underdog_side(quote: &OddsQuote) -> Result<Option<Side>, UnderdogError> {
    let home_pts = quote.home.spread.map(|s| s.points);
    let away_pts = quote.away.spread.map(|s| s.points);

    match (home_pts, away_pts) {
        (Some(h), _) if h > 0.0 => return Ok(Some(Side::Home)),
        (_, Some(a)) if a > 0.0 => return Ok(Some(Side::Away)),
        (Some(h), _) if h < 0.0 => return Ok(Some(Side::Away)),
        (_, Some(a)) if a < 0.0 => return Ok(Some(Side::Home)),
        _ => {}
    }

    match (quote.home.moneyline, quote.away.moneyline) {
        (Some(h), Some(a)) => {
            let (h, a) = (h.to_decimal()?, a.to_decimal()?);
            if h > a {
                Ok(Some(Side::Home))
            } else if a > h {
                Ok(Some(Side::Away))
            } else {
                Ok(None)
            }
        }
        // A lone plus-money price is the underdog by definition.
        (Some(h), None) if h.to_decimal()? > 2.0 => Ok(Some(Side::Home)),
        (None, Some(a)) if a.to_decimal()? > 2.0 => Ok(Some(Side::Away)),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SideQuote, SpreadLine, TeamSlot};
    use chrono::{TimeZone, Utc};

    fn team(name: &str, abbr: &str) -> TeamSlot {
        TeamSlot {
            name: name.into(),
            abbreviation: abbr.into(),
            rest_days: None,
            back_to_back: None,
            last_played: None,
            recent_record: None,
        }
    }

    fn make_game(id: &str) -> Game {
        Game {
            id: id.into(),
            tipoff: Utc.with_ymd_and_hms(2025, 1, 15, 0, 30, 0).unwrap(),
            home: team("Boston Celtics", "BOS"),
            away: team("Charlotte Hornets", "CHA"),
        }
    }

    fn spread_quote(id: &str, away_points: f64) -> OddsQuote {
        OddsQuote {
            game_id: id.into(),
            bookmaker: "fanduel".into(),
            home: SideQuote {
                spread: Some(SpreadLine { points: -away_points, price: Price::American(-110) }),
                moneyline: None,
            },
            away: SideQuote {
                spread: Some(SpreadLine { points: away_points, price: Price::American(-110) }),
                moneyline: None,
            },
            timestamp: Utc::now(),
        }
    }

    fn ml_quote(id: &str, home: Price, away: Price) -> OddsQuote {
        OddsQuote {
            game_id: id.into(),
            bookmaker: "fanduel".into(),
            home: SideQuote { spread: None, moneyline: Some(home) },
            away: SideQuote { spread: None, moneyline: Some(away) },
            timestamp: Utc::now(),
        }
    }

    fn filter() -> UnderdogFilter {
        UnderdogFilter::new(&StakingConfig::default())
    }

    #[test]
    fn test_spread_boundaries_inclusive() {
        let f = filter();
        let game = make_game("g1");
        for pts in [3.5, 5.0, 7.5] {
            let c = f.find_candidate(&game, &spread_quote("g1", pts)).unwrap();
            let c = c.unwrap_or_else(|| panic!("+{pts} should qualify"));
            assert_eq!(c.bet_type, BetType::Spread);
            assert_eq!(c.line, pts);
            assert_eq!(c.underdog, Side::Away);
        }
    }

    #[test]
    fn test_spread_outside_range_excluded() {
        let f = filter();
        let game = make_game("g1");
        for pts in [3.4, 7.6, 1.5, 12.0] {
            let c = f.find_candidate(&game, &spread_quote("g1", pts)).unwrap();
            assert!(c.is_none(), "+{pts} should not qualify");
        }
    }

    #[test]
    fn test_home_underdog_detected() {
        let f = filter();
        let game = make_game("g1");
        let c = f.find_candidate(&game, &spread_quote("g1", -5.5)).unwrap().unwrap();
        assert_eq!(c.underdog, Side::Home);
        assert_eq!(c.underdog_team, "Boston Celtics");
        assert_eq!(c.favorite_team, "Charlotte Hornets");
        assert_eq!(c.id.as_str(), "g1:home");
    }

    #[test]
    fn test_moneyline_range() {
        let f = filter();
        let game = make_game("g2");
        let c = f
            .find_candidate(&game, &ml_quote("g2", Price::American(-250), Price::American(200)))
            .unwrap()
            .unwrap();
        assert_eq!(c.bet_type, BetType::Moneyline);
        assert_eq!(c.underdog, Side::Away);
        assert_eq!(c.line, 200.0);
        assert_eq!(c.opposing_price, Some(Price::American(-250)));

        for (fav, dog) in [(-600, 450), (-130, 110)] {
            let q = ml_quote("g2", Price::American(fav), Price::American(dog));
            assert!(f.find_candidate(&game, &q).unwrap().is_none());
        }
    }

    #[test]
    fn test_moneyline_boundaries_inclusive() {
        let f = filter();
        let game = make_game("g2");
        for dog in [150, 300] {
            let q = ml_quote("g2", Price::American(-200), Price::American(dog));
            assert!(f.find_candidate(&game, &q).unwrap().is_some());
        }
    }

    #[test]
    fn test_decimal_moneyline_normalised() {
        let f = filter();
        let game = make_game("g3");
        let q = ml_quote("g3", Price::Decimal(3.0), Price::Decimal(1.4));
        let c = f.find_candidate(&game, &q).unwrap().unwrap();
        assert_eq!(c.underdog, Side::Home);
        assert_eq!(c.line, 200.0);
        assert_eq!(c.price, Price::Decimal(3.0));
    }

    #[test]
    fn test_spread_out_of_range_falls_back_to_moneyline() {
        let f = filter();
        let game = make_game("g4");
        let mut q = spread_quote("g4", 9.5);
        q.away.moneyline = Some(Price::American(280));
        q.home.moneyline = Some(Price::American(-350));
        let c = f.find_candidate(&game, &q).unwrap().unwrap();
        assert_eq!(c.bet_type, BetType::Moneyline);
        assert_eq!(c.line, 280.0);
    }

    #[test]
    fn test_missing_odds_skipped_not_errored() {
        let f = filter();
        let game = make_game("g5");
        let q = OddsQuote {
            game_id: "g5".into(),
            bookmaker: String::new(),
            home: SideQuote::default(),
            away: SideQuote::default(),
            timestamp: Utc::now(),
        };
        assert!(f.find_candidate(&game, &q).unwrap().is_none());
    }

    #[test]
    fn test_pickem_yields_nothing() {
        let f = filter();
        let game = make_game("g6");
        let q = ml_quote("g6", Price::American(-110), Price::American(-110));
        assert!(f.find_candidate(&game, &q).unwrap().is_none());
    }

    #[test]
    fn test_malformed_price_is_error() {
        let f = filter();
        let game = make_game("g7");
        let q = ml_quote("g7", Price::Decimal(0.0), Price::American(200));
        assert!(matches!(
            f.find_candidate(&game, &q),
            Err(UnderdogError::InvalidOdds(_))
        ));
        // The batch filter drops it rather than failing.
        assert!(f.filter(&[(game, q)]).is_empty());
    }

    #[test]
    fn test_filter_is_deterministic() {
        let f = filter();
        let slate: Vec<_> = (0..5)
            .map(|i| {
                let id = format!("g{i}");
                (make_game(&id), spread_quote(&id, 3.0 + i as f64))
            })
            .collect();
        let first = f.filter(&slate);
        let second = f.filter(&slate);
        assert_eq!(first, second);
        // 3.0 excluded; 4.0..=7.0 included
        assert_eq!(first.len(), 4);
    }
}
