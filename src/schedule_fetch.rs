use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AdapterError;
use crate::model::{Broadcast, Game, GameTime, SeasonPhase, Sport, Team};
use crate::roster::{Resolver, pick_id, pick_string};

const FEED: &str = "schedule";

/// Parses a scoreboard payload into fresh `Game` records.
///
/// A payload without `events` is unusable; an empty list is an empty slate.
pub fn parse_schedule_json(
    sport: Sport,
    raw: &str,
    resolver: &Resolver<'_>,
) -> Result<Vec<Game>, AdapterError> {
    let trimmed = raw.trim();
    let root: Value = serde_json::from_str(trimmed).map_err(|source| AdapterError::Json {
        feed: FEED.to_string(),
        source,
    })?;
    let events = root
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| AdapterError::missing(FEED, "events"))?;

    let mut games = Vec::with_capacity(events.len());
    for (idx, event) in events.iter().enumerate() {
        match parse_event(sport, event, resolver) {
            Ok(game) => games.push(game),
            Err(reason) => warn!(sport = %sport, feed = FEED, row = idx, reason, "skipping event"),
        }
    }
    Ok(games)
}

fn parse_event(sport: Sport, event: &Value, resolver: &Resolver<'_>) -> Result<Game, &'static str> {
    let id = event.get("id").and_then(pick_id).ok_or("event has no id")?;
    let competition = event
        .get("competitions")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or("event has no competition")?;
    let competitors = competition
        .get("competitors")
        .and_then(Value::as_array)
        .ok_or("competition has no competitors")?;

    let mut home = None;
    let mut away = None;
    for competitor in competitors {
        let side = competitor.get("homeAway").and_then(Value::as_str);
        let team = parse_competitor(competitor, resolver);
        match side {
            Some("home") => home = team,
            Some("away") => away = team,
            _ => {}
        }
    }
    let home = home.ok_or("home team unresolved")?;
    let away = away.ok_or("away team unresolved")?;

    let season_phase = event
        .get("season")
        .and_then(|s| s.get("type"))
        .and_then(Value::as_i64)
        .and_then(SeasonPhase::from_code)
        .unwrap_or_else(|| {
            debug!(sport = %sport, game = %id, "no season type, assuming regular season");
            SeasonPhase::RegularSeason
        });

    Ok(Game {
        time: game_time(event),
        broadcasts: parse_broadcasts(competition),
        notes: parse_notes(competition),
        id,
        sport,
        season_phase,
        home,
        away,
        score: None,
    })
}

/// Snapshot of the roster team with this game's record and rank applied.
fn parse_competitor(competitor: &Value, resolver: &Resolver<'_>) -> Option<Team> {
    let team = competitor.get("team")?;
    let provider_id = team.get("id").and_then(pick_id);
    let abbreviation = pick_string(team, &["abbreviation"]);
    let id =
        resolver.resolve_id_or_abbreviation(provider_id.as_deref(), abbreviation.as_deref(), FEED)?;

    let mut snapshot = resolver.roster().get(&id).cloned().unwrap_or_else(|| Team {
        id: id.clone(),
        ..Team::default()
    });
    if snapshot.name.is_empty() {
        snapshot.name = pick_string(team, &["displayName", "name"]).unwrap_or_default();
    }
    if snapshot.short_name.is_empty() {
        snapshot.short_name = pick_string(team, &["shortDisplayName"]).unwrap_or_default();
    }
    if snapshot.abbreviation.is_empty() {
        snapshot.abbreviation = abbreviation.unwrap_or_default();
    }
    snapshot.record = parse_record(competitor);
    snapshot.rank = competitor
        .get("curatedRank")
        .and_then(|r| r.get("current"))
        .and_then(Value::as_u64)
        .filter(|r| *r > 0)
        .and_then(|r| u32::try_from(r).ok());
    Some(snapshot)
}

fn parse_record(competitor: &Value) -> Option<String> {
    let records = competitor.get("records").and_then(Value::as_array)?;
    records
        .iter()
        .find(|r| r.get("type").and_then(Value::as_str) == Some("total"))
        .or_else(|| records.first())
        .and_then(|r| pick_string(r, &["summary"]))
}

fn game_time(event: &Value) -> GameTime {
    let tbd = event
        .get("status")
        .and_then(|s| s.get("type"))
        .and_then(|t| t.get("name"))
        .and_then(Value::as_str)
        .is_some_and(|name| name == "STATUS_TBD");
    let time_valid = event
        .get("timeValid")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    if tbd || !time_valid {
        return GameTime::Undetermined;
    }
    event
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_kickoff)
        .map(GameTime::Scheduled)
        .unwrap_or(GameTime::Undetermined)
}

/// Accepts RFC 3339 and the minute-precision `2025-01-15T00:30Z` form.
pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = trimmed.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|n| n.and_utc())
}

fn parse_broadcasts(competition: &Value) -> BTreeMap<String, Broadcast> {
    let mut out = BTreeMap::new();
    let Some(list) = competition.get("geoBroadcasts").and_then(Value::as_array) else {
        return out;
    };
    for entry in list {
        let Some(channel) = entry.get("media").and_then(|m| pick_string(m, &["shortName", "name"]))
        else {
            continue;
        };
        let market = entry
            .get("market")
            .and_then(|m| pick_string(m, &["type"]))
            .unwrap_or_default();
        let kind = entry
            .get("type")
            .and_then(|t| pick_string(t, &["shortName"]))
            .unwrap_or_default();
        out.insert(channel, Broadcast { market, kind });
    }
    out
}

fn parse_notes(competition: &Value) -> Vec<String> {
    competition
        .get("notes")
        .and_then(Value::as_array)
        .map(|notes| {
            notes
                .iter()
                .filter_map(|n| pick_string(n, &["headline", "text"]))
                .collect()
        })
        .unwrap_or_default()
}
