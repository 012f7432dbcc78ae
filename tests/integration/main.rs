//! Integration tests for the public engine API.

mod files;
mod pipeline;

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

use underdog::types::{Game, OddsQuote, Price, SideQuote, SpreadLine, TeamSlot};

pub fn tipoff(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap()
}

pub fn team(name: &str, abbr: &str, rest_days: Option<u32>) -> TeamSlot {
    TeamSlot {
        name: name.into(),
        abbreviation: abbr.into(),
        rest_days,
        back_to_back: None,
        last_played: None,
        recent_record: None,
    }
}

pub fn game(id: &str, hour: u32, home: (&str, &str), away: (&str, &str)) -> Game {
    Game {
        id: id.into(),
        tipoff: tipoff(hour),
        home: team(home.0, home.1, Some(2)),
        away: team(away.0, away.1, Some(2)),
    }
}

/// Home favored on the moneyline, away at `away_ml`.
pub fn moneyline_quote(game_id: &str, home_ml: i32, away_ml: i32) -> OddsQuote {
    OddsQuote {
        game_id: game_id.into(),
        bookmaker: "test".into(),
        home: SideQuote {
            spread: None,
            moneyline: Some(Price::American(home_ml)),
        },
        away: SideQuote {
            spread: None,
            moneyline: Some(Price::American(away_ml)),
        },
        timestamp: tipoff(0),
    }
}

/// Home favored by `points`, both sides at -110.
pub fn spread_quote(game_id: &str, points: f64) -> OddsQuote {
    OddsQuote {
        game_id: game_id.into(),
        bookmaker: "test".into(),
        home: SideQuote {
            spread: Some(SpreadLine {
                points: -points,
                price: Price::American(-110),
            }),
            moneyline: None,
        },
        away: SideQuote {
            spread: Some(SpreadLine {
                points,
                price: Price::American(-110),
            }),
            moneyline: None,
        },
        timestamp: tipoff(0),
    }
}

pub fn by_game(quotes: Vec<OddsQuote>) -> HashMap<String, OddsQuote> {
    quotes.into_iter().map(|q| (q.game_id.clone(), q)).collect()
}
