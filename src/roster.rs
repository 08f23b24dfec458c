use std::collections::HashMap;

use serde_json::Value;
use tracing::error;

use crate::error::AdapterError;
use crate::model::{Sport, Team};

#[derive(Debug, Clone)]
pub struct Roster {
    pub sport: Sport,
    teams: HashMap<String, Team>,
    by_abbreviation: HashMap<String, String>,
}

impl Roster {
    pub fn new(sport: Sport, teams: impl IntoIterator<Item = Team>) -> Self {
        let mut roster = Self {
            sport,
            teams: HashMap::new(),
            by_abbreviation: HashMap::new(),
        };
        for team in teams {
            roster.insert(team);
        }
        roster
    }

    pub fn insert(&mut self, team: Team) {
        let key = normalize_abbreviation(&team.abbreviation);
        if !key.is_empty() {
            self.by_abbreviation.insert(key, team.id.clone());
        }
        self.teams.insert(team.id.clone(), team);
    }

    pub fn get(&self, id: &str) -> Option<&Team> {
        self.teams.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Team> {
        self.teams.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.teams.contains_key(id)
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn teams_mut(&mut self) -> impl Iterator<Item = &mut Team> {
        self.teams.values_mut()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    fn id_for_abbreviation(&self, abbreviation: &str) -> Option<&str> {
        self.by_abbreviation
            .get(&normalize_abbreviation(abbreviation))
            .map(String::as_str)
    }
}

/// Provider abbreviations known to differ from the canonical roster.
///
/// Keys are the provider variant, values the canonical abbreviation.
pub fn abbreviation_overrides(sport: Sport) -> &'static [(&'static str, &'static str)] {
    match sport {
        Sport::Nba => &[
            ("GS", "GSW"),
            ("GOS", "GSW"),
            ("NY", "NYK"),
            ("NO", "NOP"),
            ("NOR", "NOP"),
            ("SA", "SAS"),
            ("SAN", "SAS"),
            ("UTAH", "UTA"),
            ("UTH", "UTA"),
            ("WSH", "WAS"),
            ("BRK", "BKN"),
            ("PHO", "PHX"),
            ("CHO", "CHA"),
        ],
        Sport::Nfl => &[
            ("WSH", "WAS"),
            ("JAC", "JAX"),
            ("LA", "LAR"),
            ("GNB", "GB"),
            ("KAN", "KC"),
            ("NWE", "NE"),
            ("NOR", "NO"),
            ("SFO", "SF"),
            ("TAM", "TB"),
            ("LVR", "LV"),
            ("OAK", "LV"),
        ],
        Sport::Mlb => &[
            ("CHW", "CWS"),
            ("KCR", "KC"),
            ("SDP", "SD"),
            ("SFG", "SF"),
            ("TBR", "TB"),
            ("WSN", "WSH"),
            ("AZ", "ARI"),
            ("ATH", "OAK"),
        ],
        Sport::Nhl => &[
            ("NJD", "NJ"),
            ("SJS", "SJ"),
            ("TBL", "TB"),
            ("LAK", "LA"),
            ("MON", "MTL"),
            ("WAS", "WSH"),
            ("UTA", "UTAH"),
            ("ARI", "UTAH"),
        ],
        Sport::Ncaaf | Sport::Ncaab => &[("MIAMI", "MIA"), ("UCONN", "CONN"), ("OLEMISS", "MISS")],
    }
}

/// Maps provider abbreviations onto canonical team ids for one sport.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    sport: Sport,
    roster: &'a Roster,
    overrides: HashMap<String, String>,
}

impl<'a> Resolver<'a> {
    pub fn new(sport: Sport, roster: &'a Roster) -> Self {
        let overrides = abbreviation_overrides(sport)
            .iter()
            .map(|(from, to)| (normalize_abbreviation(from), normalize_abbreviation(to)))
            .collect();
        Self {
            sport,
            roster,
            overrides,
        }
    }

    pub fn roster(&self) -> &'a Roster {
        self.roster
    }

    /// Canonical id for `abbreviation`, or `None` (logged) when neither the
    /// roster nor the override table knows it.
    pub fn resolve(&self, abbreviation: &str, feed: &str) -> Option<String> {
        if let Some(id) = self.roster.id_for_abbreviation(abbreviation) {
            return Some(id.to_string());
        }
        let key = normalize_abbreviation(abbreviation);
        if let Some(id) = self
            .overrides
            .get(&key)
            .and_then(|canonical| self.roster.id_for_abbreviation(canonical))
        {
            return Some(id.to_string());
        }
        error!(
            sport = %self.sport,
            feed,
            abbreviation,
            "unresolvable team abbreviation, skipping row"
        );
        None
    }

    /// Accepts a provider id when it is already canonical, else falls back to
    /// abbreviation lookup.
    pub fn resolve_id_or_abbreviation(
        &self,
        id: Option<&str>,
        abbreviation: Option<&str>,
        feed: &str,
    ) -> Option<String> {
        if let Some(id) = id.filter(|id| self.roster.contains(id)) {
            return Some(id.to_string());
        }
        match abbreviation {
            Some(abbr) => self.resolve(abbr, feed),
            None => {
                error!(sport = %self.sport, feed, id, "row has no usable team identity, skipping");
                None
            }
        }
    }
}

fn normalize_abbreviation(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Parses the provider team list:
/// `sports[].leagues[].teams[].team{id, abbreviation, displayName, shortDisplayName, groups}`.
pub fn parse_roster_json(sport: Sport, raw: &str) -> Result<Roster, AdapterError> {
    const FEED: &str = "roster";
    let root: Value = serde_json::from_str(raw.trim()).map_err(|source| AdapterError::Json {
        feed: FEED.to_string(),
        source,
    })?;

    let leagues = root
        .get("sports")
        .and_then(Value::as_array)
        .ok_or_else(|| AdapterError::missing(FEED, "sports"))?;

    let mut roster = Roster::new(sport, Vec::new());
    for league in leagues
        .iter()
        .filter_map(|s| s.get("leagues").and_then(Value::as_array))
        .flatten()
    {
        let Some(entries) = league.get("teams").and_then(Value::as_array) else {
            continue;
        };
        for entry in entries {
            let team = entry.get("team").unwrap_or(entry);
            match parse_roster_team(team) {
                Some(team) => roster.insert(team),
                None => error!(sport = %sport, feed = FEED, "roster entry missing id, skipping"),
            }
        }
    }

    if roster.is_empty() {
        return Err(AdapterError::Empty {
            feed: FEED.to_string(),
        });
    }
    Ok(roster)
}

fn parse_roster_team(v: &Value) -> Option<Team> {
    let id = pick_id(v.get("id")?)?;
    let abbreviation = pick_string(v, &["abbreviation"]).unwrap_or_default();
    let name = pick_string(v, &["displayName", "name"]).unwrap_or_else(|| abbreviation.clone());
    let short_name = pick_string(v, &["shortDisplayName", "nickname"]).unwrap_or_else(|| name.clone());
    let groups = v.get("groups");
    let conference = groups.and_then(|g| pick_string(g, &["conference", "name"]));
    let division = groups.and_then(|g| pick_string(g, &["division"]));

    Some(Team {
        id,
        name,
        short_name,
        abbreviation,
        conference,
        division,
        ..Team::default()
    })
}

pub(crate) fn pick_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn pick_string(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| v.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
