use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::MetricMap;

/// Sentinel slate score for games with no usable scoring component.
pub const UNSCORED: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Nfl,
    Nba,
    Mlb,
    Nhl,
    Ncaaf,
    Ncaab,
}

impl Sport {
    pub const ALL: [Sport; 6] = [
        Sport::Nfl,
        Sport::Nba,
        Sport::Mlb,
        Sport::Nhl,
        Sport::Ncaaf,
        Sport::Ncaab,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sport::Nfl => "nfl",
            Sport::Nba => "nba",
            Sport::Mlb => "mlb",
            Sport::Nhl => "nhl",
            Sport::Ncaaf => "ncaaf",
            Sport::Ncaab => "ncaab",
        }
    }

    /// College sports get the conference and poll-rank components.
    pub fn is_ncaa(self) -> bool {
        matches!(self, Sport::Ncaaf | Sport::Ncaab)
    }

    /// `(sport, league)` path segments used by the default feed urls.
    pub fn feed_path(self) -> (&'static str, &'static str) {
        match self {
            Sport::Nfl => ("football", "nfl"),
            Sport::Nba => ("basketball", "nba"),
            Sport::Mlb => ("baseball", "mlb"),
            Sport::Nhl => ("hockey", "nhl"),
            Sport::Ncaaf => ("football", "college-football"),
            Sport::Ncaab => ("basketball", "mens-college-basketball"),
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "nfl" => Ok(Sport::Nfl),
            "nba" => Ok(Sport::Nba),
            "mlb" => Ok(Sport::Mlb),
            "nhl" => Ok(Sport::Nhl),
            "ncaaf" | "cfb" => Ok(Sport::Ncaaf),
            "ncaab" | "ncaam" | "cbb" => Ok(Sport::Ncaab),
            other => Err(format!("unknown sport '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeasonPhase {
    PreSeason,
    RegularSeason,
    PostSeason,
}

impl SeasonPhase {
    /// Provider season-type code: 1 pre, 2 regular, 3 post.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(SeasonPhase::PreSeason),
            2 => Some(SeasonPhase::RegularSeason),
            3 => Some(SeasonPhase::PostSeason),
            _ => None,
        }
    }

    /// Multiplier applied to every component weight.
    pub fn weight_dampening(self) -> f64 {
        match self {
            SeasonPhase::PreSeason => 0.2,
            SeasonPhase::RegularSeason | SeasonPhase::PostSeason => 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub abbreviation: String,
    /// `wins-losses`, possibly with a trailing `-ties` segment.
    pub record: Option<String>,
    pub conference: Option<String>,
    pub division: Option<String>,
    /// Poll rank for this game. The provider reports unranked teams as 99.
    pub rank: Option<u32>,
    #[serde(default)]
    pub metrics: MetricMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "lowercase")]
pub enum GameTime {
    Scheduled(DateTime<Utc>),
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broadcast {
    pub market: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub sport: Sport,
    pub time: GameTime,
    pub season_phase: SeasonPhase,
    pub home: Team,
    pub away: Team,
    pub broadcasts: BTreeMap<String, Broadcast>,
    pub notes: Vec<String>,
    pub score: Option<GameScore>,
}

impl Game {
    /// Slate score, or the unscored sentinel when scoring has not run.
    pub fn slate_score(&self) -> f64 {
        self.score.as_ref().map(|s| s.slate_score).unwrap_or(UNSCORED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Component {
    MatchupQuality,
    WinProbability,
    Record,
    PowerIndex,
    Spread,
    Popularity,
    Conference,
    Rank,
}

impl Component {
    pub const ALL: [Component; 8] = [
        Component::MatchupQuality,
        Component::WinProbability,
        Component::Record,
        Component::PowerIndex,
        Component::Spread,
        Component::Popularity,
        Component::Conference,
        Component::Rank,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Component::MatchupQuality => "matchupQuality",
            Component::WinProbability => "winProbability",
            Component::Record => "record",
            Component::PowerIndex => "powerIndex",
            Component::Spread => "spread",
            Component::Popularity => "popularity",
            Component::Conference => "conference",
            Component::Rank => "rank",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub name: Component,
    pub value: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameScore {
    pub slate_score: f64,
    pub components: BTreeMap<Component, ScoreComponent>,
    pub unbaselined_slate_score: f64,
}

impl GameScore {
    pub fn unscored() -> Self {
        Self {
            slate_score: UNSCORED,
            components: BTreeMap::new(),
            unbaselined_slate_score: UNSCORED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sport_parses_aliases() {
        assert_eq!("NBA".parse::<Sport>().unwrap(), Sport::Nba);
        assert_eq!(" ncaam ".parse::<Sport>().unwrap(), Sport::Ncaab);
        assert!("curling".parse::<Sport>().is_err());
        assert!(Sport::Ncaaf.is_ncaa());
        assert!(!Sport::Nhl.is_ncaa());
    }

    #[test]
    fn score_serializes_with_camel_case_names() {
        let raw = serde_json::to_value(GameScore::unscored()).unwrap();
        assert_eq!(raw["slateScore"], -1.0);
        assert_eq!(raw["unbaselinedSlateScore"], -1.0);
        assert!(raw["components"].as_object().unwrap().is_empty());
    }
}
